//! Navigator: turns a chapter into an animated scroll

use crate::scroll_driver::{ScrollHandle, SeekOptions};
use reel_core::TimelineSegment;

/// Progress that lands on the middle of `segment`.
///
/// Targeting the midpoint keeps rounding from landing on a boundary frame that
/// belongs to the neighbouring segment.
pub fn target_progress(segment: &TimelineSegment, frame_count: usize) -> f64 {
    if frame_count == 0 {
        return 0.0;
    }
    (segment.midpoint() / frame_count as f64).clamp(0.0, 1.0)
}

/// Starts a seek to the middle of `segment`; returns the requested progress.
///
/// `None` when the handle cannot seek (deferred or destroyed binding).
pub fn seek_to_segment(
    handle: &ScrollHandle,
    segment: &TimelineSegment,
    frame_count: usize,
) -> Option<f64> {
    seek_to_segment_with(handle, segment, frame_count, SeekOptions::default())
}

/// Like [`seek_to_segment`] with a custom duration and ease
pub fn seek_to_segment_with(
    handle: &ScrollHandle,
    segment: &TimelineSegment,
    frame_count: usize,
    options: SeekOptions,
) -> Option<f64> {
    let progress = target_progress(segment, frame_count);
    handle.seek_to_with(progress, options).map(|_| progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scroll_driver::{BindOptions, Region, ScrollDriver, Viewport};
    use crate::testing::Recorder;
    use reel_core::{presets, Distance, FrameSequence};
    use std::rc::Rc;
    use std::time::Duration;

    #[test]
    fn test_target_progress_is_midpoint() {
        let segment = TimelineSegment::new(208, 718, "My Portal", "portal");
        assert_eq!(target_progress(&segment, 2424), 463.0 / 2424.0);
    }

    #[test]
    fn test_midpoint_frame_stays_inside_segment() {
        let timeline = presets::showcase_timeline().unwrap();
        let sequence = presets::showcase_sequence().unwrap();
        for (i, segment) in timeline.segments().iter().enumerate() {
            let frame = sequence.frame_index(target_progress(segment, sequence.frame_count));
            assert_eq!(timeline.segment_index_of(frame).unwrap(), i);
        }
    }

    #[test]
    fn test_seek_to_segment_moves_page() {
        let driver = ScrollDriver::new(Viewport::new(1000.0, 800.0));
        let handle = driver.bind(
            Region::new(0.0, 800.0),
            BindOptions {
                distance: Distance::Pixels(2424.0),
                scrub: None,
            },
            Rc::new(Recorder::default()),
        );
        let segment = TimelineSegment::new(0, 208, "Home", "welcome");
        let sequence = FrameSequence::new("s", 2424).unwrap();

        let progress = seek_to_segment(&handle, &segment, sequence.frame_count).unwrap();
        driver.tick(Duration::from_secs(1));
        assert!((driver.offset() - 104.0).abs() < 1e-9);
        assert!((handle.progress().unwrap() - progress).abs() < 1e-12);
    }
}
