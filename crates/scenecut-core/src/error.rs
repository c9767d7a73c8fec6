use std::path::PathBuf;

use thiserror::Error;

/// Terminal failures of a scene detection or splitting operation.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("path does not exist: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{tool} is not available: {remediation}")]
    UnavailableTool {
        tool: &'static str,
        remediation: &'static str,
    },

    #[error("scene detection failed")]
    DetectionFailure(#[source] anyhow::Error),

    #[error("failed to decode frames")]
    Decode(#[source] anyhow::Error),

    #[error("failed to split video into scenes")]
    SegmentationFailed(#[source] anyhow::Error),

    #[error("failed to write debug frames")]
    DebugOutput(#[source] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SceneError>;
