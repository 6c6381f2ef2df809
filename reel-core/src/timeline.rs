//! Chapter timelines: an ordered partition of a frame range into labelled segments

use crate::Result;
use std::fmt;

/// A contiguous range of frames `[start_frame, end_frame)` with an optional chapter label
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimelineSegment {
    /// First frame index in this segment
    pub start_frame: usize,
    /// Index one past the last frame in this segment (exclusive)
    pub end_frame: usize,
    /// Chapter label; `None` inherits the nearest preceding label
    #[cfg_attr(feature = "serde", serde(default))]
    pub label: Option<String>,
    /// Caption unique to this segment
    pub detail: String,
}

impl TimelineSegment {
    /// Creates a new labelled segment
    pub fn new(start_frame: usize, end_frame: usize, label: &str, detail: &str) -> Self {
        Self {
            start_frame,
            end_frame,
            label: Some(label.to_string()),
            detail: detail.to_string(),
        }
    }

    /// Creates a segment that inherits the previous segment's label
    pub fn continuation(start_frame: usize, end_frame: usize, detail: &str) -> Self {
        Self {
            start_frame,
            end_frame,
            label: None,
            detail: detail.to_string(),
        }
    }

    /// Checks if this segment contains the given frame index
    pub fn contains(&self, frame: usize) -> bool {
        frame >= self.start_frame && frame < self.end_frame
    }

    /// Number of frames in this segment
    pub fn frame_count(&self) -> usize {
        self.end_frame.saturating_sub(self.start_frame)
    }

    /// Midpoint of the segment in frame units
    pub fn midpoint(&self) -> f64 {
        (self.start_frame + self.end_frame) as f64 / 2.0
    }
}

/// Static configuration defects in a timeline's ranges
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SegmentationError {
    #[error("timeline has no segments")]
    Empty,

    #[error("first segment starts at frame {0}, expected 0")]
    NotAnchored(usize),

    #[error("segment {index} is empty ({start}..{end})")]
    EmptySegment {
        index: usize,
        start: usize,
        end: usize,
    },

    #[error("gap between frames {expected} and {found} before segment {index}")]
    Gap {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("segment {index} overlaps its predecessor (starts at {found}, previous ends at {expected})")]
    Overlap {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("timeline ends at frame {end} but the sequence has {frame_count} frames")]
    Coverage { end: usize, frame_count: usize },

    #[error("frame {frame} is outside the timeline (0..{end})")]
    OutOfRange { frame: usize, end: usize },
}

/// Raised when no segment at or before an index carries a label
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no label at or before segment {segment}")]
pub struct LabelResolutionError {
    pub segment: usize,
}

/// Validated, immutable list of segments covering `[0, end_frame)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    segments: Vec<TimelineSegment>,
}

impl Timeline {
    /// Validates and wraps an ordered segment list.
    ///
    /// Ranges must start at frame 0, be non-empty and follow each other without
    /// gaps or overlaps. The first segment must carry a label so that every
    /// segment resolves to one.
    pub fn new(segments: Vec<TimelineSegment>) -> Result<Self> {
        let first = segments.first().ok_or(SegmentationError::Empty)?;
        if first.start_frame != 0 {
            return Err(SegmentationError::NotAnchored(first.start_frame).into());
        }

        let mut expected = 0;
        for (index, segment) in segments.iter().enumerate() {
            if segment.end_frame <= segment.start_frame {
                return Err(SegmentationError::EmptySegment {
                    index,
                    start: segment.start_frame,
                    end: segment.end_frame,
                }
                .into());
            }
            if segment.start_frame > expected {
                return Err(SegmentationError::Gap {
                    index,
                    expected,
                    found: segment.start_frame,
                }
                .into());
            }
            if segment.start_frame < expected {
                return Err(SegmentationError::Overlap {
                    index,
                    expected,
                    found: segment.start_frame,
                }
                .into());
            }
            expected = segment.end_frame;
        }

        if first.label.is_none() {
            return Err(LabelResolutionError { segment: 0 }.into());
        }

        Ok(Self { segments })
    }

    /// Validates the list and additionally requires it to cover exactly `frame_count` frames
    pub fn covering(segments: Vec<TimelineSegment>, frame_count: usize) -> Result<Self> {
        let timeline = Self::new(segments)?;
        timeline.check_covers(frame_count)?;
        Ok(timeline)
    }

    /// Loads a timeline from a JSON array of segments
    #[cfg(feature = "serde")]
    pub fn from_json<R: std::io::Read>(reader: R) -> Result<Self> {
        let segments: Vec<TimelineSegment> = serde_json::from_reader(reader)?;
        Self::new(segments)
    }

    /// Fails unless the timeline ends exactly at `frame_count`
    pub fn check_covers(&self, frame_count: usize) -> std::result::Result<(), SegmentationError> {
        let end = self.end_frame();
        if end != frame_count {
            return Err(SegmentationError::Coverage { end, frame_count });
        }
        Ok(())
    }

    /// One past the last frame covered by the timeline
    pub fn end_frame(&self) -> usize {
        // Non-empty by construction
        self.segments.last().map_or(0, |s| s.end_frame)
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false for a validated timeline
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// All segments in order
    pub fn segments(&self) -> &[TimelineSegment] {
        &self.segments
    }

    /// Gets a segment by index
    pub fn get(&self, index: usize) -> Option<&TimelineSegment> {
        self.segments.get(index)
    }

    /// Finds the unique segment whose range contains `frame`
    pub fn segment_index_of(&self, frame: usize) -> std::result::Result<usize, SegmentationError> {
        let end = self.end_frame();
        if frame >= end {
            return Err(SegmentationError::OutOfRange { frame, end });
        }
        Ok(self.segments.partition_point(|s| s.end_frame <= frame))
    }

    /// Resolves the label shown for a segment, inheriting from earlier segments
    pub fn resolve_label(&self, segment: usize) -> std::result::Result<&str, LabelResolutionError> {
        let last = segment.min(self.segments.len().saturating_sub(1));
        if segment != last {
            return Err(LabelResolutionError { segment });
        }
        self.segments[..=last]
            .iter()
            .rev()
            .find_map(|s| s.label.as_deref())
            .ok_or(LabelResolutionError { segment })
    }

    /// True iff `frame` lies in a different segment than `previous`
    pub fn changed_since(
        &self,
        previous: usize,
        frame: usize,
    ) -> std::result::Result<bool, SegmentationError> {
        Ok(self.segment_index_of(frame)? != previous)
    }
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            let label = self.resolve_label(i).unwrap_or("?");
            let marker = if segment.label.is_some() { ' ' } else { '^' };
            writeln!(
                f,
                "  [{:>2}] {:>5}..{:<5} {}{} - {}",
                i, segment.start_frame, segment.end_frame, marker, label, segment.detail
            )?;
        }
        Ok(())
    }
}
