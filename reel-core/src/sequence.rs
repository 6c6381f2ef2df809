//! Frame sequence descriptions: how many frames and where each one lives

use crate::{Error, Result};

/// Default file extension of sequence frames
pub const DEFAULT_EXTENSION: &str = "jpg";

/// Describes one numbered still-image sequence
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameSequence {
    /// Sequence name, used as the asset directory
    pub name: String,
    /// Total number of frames (at least 1)
    pub frame_count: usize,
    /// File extension of each frame
    pub extension: String,
}

impl FrameSequence {
    /// Creates a new sequence of JPEG frames
    pub fn new(name: &str, frame_count: usize) -> Result<Self> {
        Self::with_extension(name, frame_count, DEFAULT_EXTENSION)
    }

    /// Creates a new sequence with a custom frame file extension
    pub fn with_extension(name: &str, frame_count: usize, extension: &str) -> Result<Self> {
        if frame_count == 0 {
            return Err(Error::EmptySequence(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            frame_count,
            extension: extension.trim_start_matches('.').to_string(),
        })
    }

    /// Asset path of a 1-based frame number, e.g. `showcase/frame_0208.jpg`
    pub fn uri(&self, number: usize) -> String {
        format!("{}/frame_{:04}.{}", self.name, number, self.extension)
    }

    /// Asset path of a 0-based frame index
    pub fn frame_uri(&self, index: usize) -> String {
        self.uri(index + 1)
    }

    /// Index of the last frame
    pub fn last_index(&self) -> usize {
        self.frame_count - 1
    }

    /// Maps a scroll progress in `[0, 1]` to a frame index.
    ///
    /// `floor(progress * (frame_count - 1))`, clamped to the valid range. NaN maps to 0.
    pub fn frame_index(&self, progress: f64) -> usize {
        let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
        let index = (progress * self.last_index() as f64).floor() as usize;
        index.min(self.last_index())
    }
}
