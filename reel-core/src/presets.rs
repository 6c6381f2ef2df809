//! Built-in sequence configurations for the landing page

use crate::{Distance, FrameSequence, Result, Timeline, TimelineSegment};

/// Frames in the chaptered product showcase
pub const SHOWCASE_FRAME_COUNT: usize = 2424;

/// Backing resolution of the showcase surface (scaled visually, never re-rendered)
pub const SHOWCASE_SURFACE: (u32, u32) = (2000, 1400);

/// Scroll distance the showcase is pinned for
pub const SHOWCASE_DISTANCE: Distance = Distance::ViewportHeights(1200.0);

/// Scrub lag of the showcase, in seconds
pub const SHOWCASE_SCRUB_SECS: f64 = 0.3;

/// Frames in each vehicle hero sequence
pub const HERO_FRAME_COUNT: usize = 151;

/// Scroll distance a hero is pinned for
pub const HERO_DISTANCE: Distance = Distance::ViewportHeights(110.0);

/// Progress at which the hero title overlay fades in
pub const HERO_OVERLAY_THRESHOLD: f64 = 0.75;

/// Vehicles with a hero sequence, by asset directory
pub const HERO_VEHICLES: [&str; 4] = ["yacht", "heli", "jet", "car"];

/// The showcase frame sequence (`yacht_ui_frames/frame_NNNN.jpg`)
pub fn showcase_sequence() -> Result<FrameSequence> {
    FrameSequence::new("yacht_ui_frames", SHOWCASE_FRAME_COUNT)
}

/// A vehicle hero sequence (`frames/{vehicle}/frame_NNNN.jpg`)
pub fn hero_sequence(vehicle: &str) -> Result<FrameSequence> {
    FrameSequence::new(&format!("frames/{vehicle}"), HERO_FRAME_COUNT)
}

/// Chapters of the showcase sequence
pub fn showcase_timeline() -> Result<Timeline> {
    Timeline::covering(
        vec![
            TimelineSegment::new(0, 208, "Home", "Welcome to Zorah Fleet"),
            TimelineSegment::new(
                208,
                718,
                "My Portal",
                "Your centralized command center for tasks, yachts, and daily operations",
            ),
            TimelineSegment::continuation(
                718,
                869,
                "Integrated calendar for scheduling and availability tracking",
            ),
            TimelineSegment::new(
                869,
                1212,
                "Email Inbox",
                "AI-powered email parsing with automatic booking creation and yacht matching",
            ),
            TimelineSegment::new(
                1212,
                1628,
                "Booking Overview",
                "Auto-created bookings with all charter data in one place",
            ),
            TimelineSegment::new(
                1628,
                1939,
                "Operations",
                "Real-time booking pipeline with status tracking across all charters",
            ),
            TimelineSegment::continuation(
                1939,
                2089,
                "Contract generation and management linked directly to bookings",
            ),
            TimelineSegment::continuation(
                2089,
                2219,
                "Dynamic pricing engine with automated rate calculations",
            ),
            TimelineSegment::continuation(
                2219,
                2296,
                "Crew briefings and operational readiness per charter",
            ),
            TimelineSegment::continuation(
                2296,
                2363,
                "Post-charter workflows for close-out and reporting",
            ),
            TimelineSegment::continuation(
                2363,
                2424,
                "Automated workflows powering end-to-end operations",
            ),
        ],
        SHOWCASE_FRAME_COUNT,
    )
}
