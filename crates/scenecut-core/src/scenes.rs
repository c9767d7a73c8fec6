use std::fmt;
use std::str::FromStr;

use crate::error::SceneError;
use crate::scan::SceneBoundary;

/// Ascending, duplicate-free scene start indices. Frame 0 is always first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneStarts(Vec<u32>);

impl SceneStarts {
    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    pub fn count(&self) -> usize {
        self.0.len()
    }

    pub fn into_vec(self) -> Vec<u32> {
        self.0
    }
}

/// Comma-joined form, e.g. `0,145,302`.
impl fmt::Display for SceneStarts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{index}")?;
        }
        Ok(())
    }
}

impl FromStr for SceneStarts {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let indices = s
            .split(',')
            .map(|part| {
                part.trim().parse::<u32>().map_err(|e| {
                    SceneError::InvalidInput(format!("bad scene start {part:?}: {e}"))
                })
            })
            .collect::<Result<Vec<u32>, _>>()?;
        Ok(normalize(indices))
    }
}

/// Canonical start indices for a boundary list.
///
/// Frame 0 is always included, even when the list is empty or does not begin
/// at 0.
pub fn extract_scene_starts(boundaries: &[SceneBoundary]) -> SceneStarts {
    normalize(boundaries.iter().map(SceneBoundary::start_frame).collect())
}

fn normalize(mut indices: Vec<u32>) -> SceneStarts {
    indices.push(0);
    indices.sort_unstable();
    indices.dedup();
    SceneStarts(indices)
}
