//! Reel Player Library
//!
//! Runtime for scroll-synchronized frame-sequence playback: a frame store that
//! preloads every frame in parallel, a cover-fit compositor, a scroll-progress
//! driver for pinned regions, chapter navigation and the playback controller
//! that ties them together.

pub mod compositor;
pub mod controller;
pub mod ease;
pub mod frame_store;
pub mod navigator;
pub mod progress;
pub mod scroll_driver;

#[cfg(test)]
mod testing;

pub use compositor::{cover_fit, Compositor, CoverFit, Surface};
pub use controller::{PlaybackController, PlaybackState, SegmentChange, SequenceConfig, SurfaceSize};
pub use ease::Ease;
pub use frame_store::{
    DirSource, FrameSource, FrameStore, LoadCause, LoadFailure, LoadOptions, LoadStatus,
    MemorySource,
};
pub use scroll_driver::{
    Anchors, BindOptions, BindState, Region, ScrollDriver, ScrollHandle, ScrollObserver,
    SeekOptions, Viewport,
};

/// Result type for reel-player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for reel-player operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Reel core error: {0}")]
    Core(#[from] reel_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Load error: {0}")]
    Load(#[from] LoadFailure),

    #[error("Segment out of range: {0}")]
    SegmentOutOfRange(usize),

    #[error("Sequence has no timeline")]
    NoTimeline,

    #[error("Controller is not playing")]
    NotPlaying,

    #[error("Store holds {found} frames, sequence expects {expected}")]
    SequenceMismatch { expected: usize, found: usize },

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}
