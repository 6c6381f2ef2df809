//! Reel Core Library
//!
//! This library provides the data structures shared by the reel playback engine:
//! frame sequences, chapter timelines that partition a sequence into labelled
//! segments, and the scroll distances a pinned region maps onto.

pub mod distance;
pub mod presets;
pub mod sequence;
pub mod timeline;

pub use distance::Distance;
pub use sequence::FrameSequence;
pub use timeline::{LabelResolutionError, SegmentationError, Timeline, TimelineSegment};

/// Result type for reel-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for reel-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Segmentation error: {0}")]
    Segmentation(#[from] SegmentationError),

    #[error("Label resolution error: {0}")]
    LabelResolution(#[from] LabelResolutionError),

    #[error("Frame sequence '{0}' has no frames")]
    EmptySequence(String),

    #[error("Invalid scroll distance: {0}")]
    InvalidDistance(String),
}
