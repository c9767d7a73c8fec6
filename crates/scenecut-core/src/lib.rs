//! Scene boundary detection over video files and in-memory frame batches,
//! plus splitting a video into one file per scene.

pub mod debug;
pub mod detect;
pub mod error;
pub mod pipeline;
pub mod scan;
pub mod scenes;
pub mod split;
pub mod video;

pub use error::{Result, SceneError};
