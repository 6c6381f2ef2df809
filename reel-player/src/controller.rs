//! Playback controller: drives one frame sequence from a pinned scroll region
//!
//! The controller waits for its [`FrameStore`] to become ready, then draws
//! frame 0, binds its region on the page's [`ScrollDriver`] and from then on
//! redraws the frame that matches every progress update. Chapter changes and
//! overlay threshold crossings are edge-triggered and reported to listeners.
//!
//! State moves `Loading → Ready → (Playing ⇄ Idle) → Destroyed`. `Idle` is only
//! used by sequences without chapters, when progress rests at 0 or 1.

use crate::compositor::{Compositor, Surface};
use crate::frame_store::{FrameStore, LoadStatus};
use crate::navigator;
use crate::scroll_driver::{
    BindOptions, BindState, Region, ScrollDriver, ScrollHandle, ScrollObserver, SeekOptions,
    Viewport,
};
use crate::{Error, Result};
use image::RgbaImage;
use reel_core::{presets, Distance, FrameSequence, Timeline};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Loading,
    Ready,
    Playing,
    Idle,
    Destroyed,
}

impl PlaybackState {
    fn is_active(self) -> bool {
        matches!(self, Self::Ready | Self::Playing | Self::Idle)
    }
}

/// Backing resolution of the drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceSize {
    /// Fixed logical resolution, scaled visually by the embedder
    Fixed { width: u32, height: u32 },
    /// Tracks the viewport; reallocated on resize
    Viewport,
}

impl SurfaceSize {
    fn resolve(self, viewport: Viewport) -> (u32, u32) {
        match self {
            Self::Fixed { width, height } => (width, height),
            Self::Viewport => (
                viewport.width.round().max(1.0) as u32,
                viewport.height.round().max(1.0) as u32,
            ),
        }
    }
}

/// Everything a controller needs to know about its sequence
#[derive(Debug, Clone)]
pub struct SequenceConfig {
    pub sequence: FrameSequence,
    /// Chapters; must cover the whole sequence
    pub timeline: Option<Arc<Timeline>>,
    pub distance: Distance,
    pub scrub: Option<Duration>,
    pub surface: SurfaceSize,
    /// Progress at or above which the overlay is shown
    pub overlay_threshold: Option<f64>,
}

impl SequenceConfig {
    /// Plain sequence pinned for one viewport height
    pub fn new(sequence: FrameSequence) -> Self {
        Self {
            sequence,
            timeline: None,
            distance: Distance::ViewportHeights(100.0),
            scrub: None,
            surface: SurfaceSize::Viewport,
            overlay_threshold: None,
        }
    }

    /// The chaptered product showcase
    pub fn showcase() -> reel_core::Result<Self> {
        let (width, height) = presets::SHOWCASE_SURFACE;
        Ok(Self {
            sequence: presets::showcase_sequence()?,
            timeline: Some(Arc::new(presets::showcase_timeline()?)),
            distance: presets::SHOWCASE_DISTANCE,
            scrub: Some(Duration::from_secs_f64(presets::SHOWCASE_SCRUB_SECS)),
            surface: SurfaceSize::Fixed { width, height },
            overlay_threshold: None,
        })
    }

    /// A vehicle hero with its title overlay
    pub fn hero(vehicle: &str) -> reel_core::Result<Self> {
        Ok(Self {
            sequence: presets::hero_sequence(vehicle)?,
            timeline: None,
            distance: presets::HERO_DISTANCE,
            scrub: None,
            surface: SurfaceSize::Viewport,
            overlay_threshold: Some(presets::HERO_OVERLAY_THRESHOLD),
        })
    }
}

/// The active chapter changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentChange {
    pub index: usize,
    /// Resolved (possibly inherited) label
    pub label: String,
    pub detail: String,
}

#[derive(Default)]
struct Notifications {
    segment: Option<SegmentChange>,
    overlay: Option<bool>,
}

type SegmentListener = Box<dyn FnMut(&SegmentChange)>;
type OverlayListener = Box<dyn FnMut(bool)>;

#[derive(Default)]
struct Listeners {
    segment: RefCell<Vec<SegmentListener>>,
    overlay: RefCell<Vec<OverlayListener>>,
    closed: Cell<bool>,
}

impl Listeners {
    fn notify(&self, notifications: Notifications) {
        if let Some(change) = notifications.segment {
            self.dispatch(&self.segment, |listener| listener(&change));
        }
        if let Some(visible) = notifications.overlay {
            self.dispatch(&self.overlay, |listener| listener(visible));
        }
    }

    /// Calls every listener with the list released, so listeners may register
    /// more listeners or destroy the controller
    fn dispatch<L>(&self, slot: &RefCell<Vec<L>>, mut call: impl FnMut(&mut L)) {
        let mut taken = std::mem::take(&mut *slot.borrow_mut());
        for listener in &mut taken {
            if self.closed.get() {
                return;
            }
            call(listener);
        }
        if self.closed.get() {
            return;
        }
        let mut current = slot.borrow_mut();
        taken.append(&mut current);
        *current = taken;
    }

    fn close(&self) {
        self.closed.set(true);
        self.segment.borrow_mut().clear();
        self.overlay.borrow_mut().clear();
    }
}

struct Inner {
    config: SequenceConfig,
    driver: ScrollDriver,
    region: Region,
    state: PlaybackState,
    store: Option<Arc<FrameStore>>,
    surface: Option<Surface>,
    compositor: Compositor,
    handle: Option<ScrollHandle>,
    current_frame: usize,
    current_segment: Option<usize>,
    overlay_visible: bool,
    failure_reported: bool,
}

impl Inner {
    fn set_state(&mut self, next: PlaybackState) {
        if self.state != next {
            tracing::debug!(
                sequence = %self.config.sequence.name,
                from = ?self.state,
                to = ?next,
                "playback state changed"
            );
            self.state = next;
        }
    }

    /// Store is ready: draw frame 0 and bind the region
    fn activate(&mut self, observer: Rc<dyn ScrollObserver>) {
        self.set_state(PlaybackState::Ready);
        let (width, height) = self.config.surface.resolve(self.driver.viewport());
        self.surface = Some(Surface::new(width, height));
        self.current_frame = 0;
        self.current_segment = self.config.timeline.as_ref().map(|_| 0);
        self.redraw();

        let options = BindOptions {
            distance: self.config.distance,
            scrub: self.config.scrub,
        };
        self.handle = Some(self.driver.bind(self.region, options, observer));
        self.promote();
    }

    /// Ready becomes Playing once the binding has been measured
    fn promote(&mut self) {
        let bound = self
            .handle
            .as_ref()
            .is_some_and(|h| h.bind_state() == Some(BindState::Bound));
        if self.state == PlaybackState::Ready && bound {
            self.set_state(PlaybackState::Playing);
        }
    }

    /// Draws the cached current frame; a missing frame keeps the previous one
    fn redraw(&mut self) -> bool {
        let (Some(store), Some(surface)) = (self.store.as_ref(), self.surface.as_mut()) else {
            return false;
        };
        let drawn = self
            .compositor
            .draw(surface, store.get(self.current_frame))
            .is_some();
        if !drawn {
            tracing::trace!(frame = self.current_frame, "frame unavailable, keeping previous");
        }
        drawn
    }

    /// Matches the surface to the viewport for viewport-sized sequences
    fn fit_surface(&mut self, viewport: Viewport) -> bool {
        if !self.state.is_active() || self.config.surface != SurfaceSize::Viewport {
            return false;
        }
        let (width, height) = self.config.surface.resolve(viewport);
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        if (surface.width(), surface.height()) == (width, height) {
            return false;
        }
        surface.resize(width, height);
        self.redraw()
    }

    fn apply_progress(&mut self, progress: f64) -> Notifications {
        let mut notifications = Notifications::default();
        if !self.state.is_active() {
            return notifications;
        }

        let frame = self.config.sequence.frame_index(progress);
        self.current_frame = frame;
        self.redraw();

        if let Some(timeline) = self.config.timeline.clone() {
            let changed = match self.current_segment {
                Some(previous) => timeline.changed_since(previous, frame),
                None => Ok(true),
            };
            match changed.and_then(|changed| {
                changed
                    .then(|| timeline.segment_index_of(frame))
                    .transpose()
            }) {
                Ok(Some(index)) => {
                    self.current_segment = Some(index);
                    let label = timeline.resolve_label(index).unwrap_or_default().to_string();
                    let detail = timeline
                        .get(index)
                        .map(|s| s.detail.clone())
                        .unwrap_or_default();
                    tracing::debug!(
                        sequence = %self.config.sequence.name,
                        segment = index,
                        label = %label,
                        "segment changed"
                    );
                    notifications.segment = Some(SegmentChange {
                        index,
                        label,
                        detail,
                    });
                }
                Ok(None) => {}
                Err(err) => tracing::trace!(frame, "segment lookup failed: {err}"),
            }
        }

        if let Some(threshold) = self.config.overlay_threshold {
            let visible = progress >= threshold;
            if visible != self.overlay_visible {
                self.overlay_visible = visible;
                notifications.overlay = Some(visible);
            }
        }

        let seeking = self.handle.as_ref().is_some_and(ScrollHandle::is_seeking);
        let at_rest = self.config.timeline.is_none()
            && (progress <= 0.0 || progress >= 1.0)
            && !seeking;
        self.set_state(if at_rest {
            PlaybackState::Idle
        } else {
            PlaybackState::Playing
        });

        notifications
    }
}

/// Scroll observer registered on the driver; holds no strong reference
struct Observer {
    inner: Weak<RefCell<Inner>>,
    listeners: Weak<Listeners>,
}

impl Observer {
    fn remeasure(&self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut inner = inner.borrow_mut();
            let viewport = inner.driver.viewport();
            inner.fit_surface(viewport);
        }
    }
}

impl ScrollObserver for Observer {
    fn on_update(&self, progress: f64) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let notifications = inner.borrow_mut().apply_progress(progress);
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.notify(notifications);
        }
    }

    fn on_leave_forward(&self) {
        self.remeasure();
    }

    fn on_leave_backward(&self) {
        self.remeasure();
    }
}

/// Plays one frame sequence in a pinned region of the page
pub struct PlaybackController {
    inner: Rc<RefCell<Inner>>,
    listeners: Rc<Listeners>,
}

impl PlaybackController {
    /// Creates a controller in the `Loading` state.
    ///
    /// Fails fast when the timeline does not cover the sequence or the store
    /// holds a different number of frames.
    pub fn mount(
        driver: &ScrollDriver,
        region: Region,
        config: SequenceConfig,
        store: Arc<FrameStore>,
    ) -> Result<Self> {
        if store.frame_count() != config.sequence.frame_count {
            return Err(Error::SequenceMismatch {
                expected: config.sequence.frame_count,
                found: store.frame_count(),
            });
        }
        if let Some(timeline) = &config.timeline {
            timeline
                .check_covers(config.sequence.frame_count)
                .map_err(reel_core::Error::from)?;
        }

        tracing::info!(
            sequence = %config.sequence.name,
            frames = config.sequence.frame_count,
            "mounting playback controller"
        );

        let inner = Inner {
            config,
            driver: driver.clone(),
            region,
            state: PlaybackState::Loading,
            store: Some(store),
            surface: None,
            compositor: Compositor::new(),
            handle: None,
            current_frame: 0,
            current_segment: None,
            overlay_visible: false,
            failure_reported: false,
        };

        Ok(Self {
            inner: Rc::new(RefCell::new(inner)),
            listeners: Rc::new(Listeners::default()),
        })
    }

    /// Advances the lifecycle; call from the event loop until it leaves `Loading`.
    ///
    /// A failed load is returned once as [`Error::Load`]; the controller then
    /// stays in `Loading` for good.
    pub fn poll(&self) -> Result<PlaybackState> {
        let mut inner = self.inner.borrow_mut();
        let state = inner.state;
        match state {
            PlaybackState::Loading => {
                let Some(store) = inner.store.clone() else {
                    return Ok(state);
                };
                match store.status() {
                    LoadStatus::Ready => {
                        tracing::info!(sequence = %inner.config.sequence.name, "frames ready");
                        let observer: Rc<dyn ScrollObserver> = Rc::new(Observer {
                            inner: Rc::downgrade(&self.inner),
                            listeners: Rc::downgrade(&self.listeners),
                        });
                        inner.activate(observer);
                    }
                    LoadStatus::Failed if !inner.failure_reported => {
                        inner.failure_reported = true;
                        if let Some(failure) = store.failure() {
                            return Err(Error::Load(failure.clone()));
                        }
                    }
                    LoadStatus::Failed | LoadStatus::Loading | LoadStatus::Cancelled => {}
                }
            }
            PlaybackState::Ready => inner.promote(),
            _ => {}
        }
        Ok(inner.state)
    }

    /// Registers a listener for chapter changes
    pub fn on_segment_change(&self, listener: impl FnMut(&SegmentChange) + 'static) {
        if !self.listeners.closed.get() {
            self.listeners.segment.borrow_mut().push(Box::new(listener));
        }
    }

    /// Registers a listener for overlay visibility changes
    pub fn on_overlay_change(&self, listener: impl FnMut(bool) + 'static) {
        if !self.listeners.closed.get() {
            self.listeners.overlay.borrow_mut().push(Box::new(listener));
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.borrow().state
    }

    /// Index of the frame currently on the surface
    pub fn current_frame(&self) -> usize {
        self.inner.borrow().current_frame
    }

    pub fn current_segment(&self) -> Option<usize> {
        self.inner.borrow().current_segment
    }

    /// Label of the active chapter, inherited from earlier chapters if needed
    pub fn current_label(&self) -> Option<String> {
        let inner = self.inner.borrow();
        let timeline = inner.config.timeline.as_ref()?;
        let index = inner.current_segment?;
        timeline.resolve_label(index).ok().map(str::to_string)
    }

    /// Caption of the active chapter
    pub fn current_detail(&self) -> Option<String> {
        let inner = self.inner.borrow();
        let timeline = inner.config.timeline.as_ref()?;
        let index = inner.current_segment?;
        timeline.get(index).map(|s| s.detail.clone())
    }

    pub fn overlay_visible(&self) -> bool {
        self.inner.borrow().overlay_visible
    }

    /// Live progress of the bound region
    pub fn progress(&self) -> Option<f64> {
        self.inner.borrow().handle.as_ref().and_then(ScrollHandle::progress)
    }

    /// Total number of draws that reached the surface
    pub fn draw_count(&self) -> u64 {
        self.inner.borrow().compositor.draw_count()
    }

    /// Copy of the current surface content
    pub fn snapshot(&self) -> Option<RgbaImage> {
        self.inner
            .borrow()
            .surface
            .as_ref()
            .map(|s| s.pixels().clone())
    }

    /// Starts an animated scroll to the middle of chapter `index`
    pub fn seek_to_segment(&self, index: usize) -> Result<f64> {
        self.seek_to_segment_with(index, SeekOptions::default())
    }

    /// Like [`PlaybackController::seek_to_segment`] with a custom duration and ease
    pub fn seek_to_segment_with(&self, index: usize, options: SeekOptions) -> Result<f64> {
        let inner = self.inner.borrow();
        if !inner.state.is_active() {
            return Err(Error::NotPlaying);
        }
        let timeline = inner.config.timeline.as_ref().ok_or(Error::NoTimeline)?;
        let segment = timeline.get(index).ok_or(Error::SegmentOutOfRange(index))?;
        let handle = inner.handle.as_ref().ok_or(Error::NotPlaying)?;
        navigator::seek_to_segment_with(
            handle,
            segment,
            inner.config.sequence.frame_count,
            options,
        )
        .ok_or(Error::NotPlaying)
    }

    /// Moves the region after a layout change
    pub fn set_region(&self, region: Region) {
        let mut inner = self.inner.borrow_mut();
        inner.region = region;
        if let Some(handle) = inner.handle.as_ref() {
            handle.set_region(region);
        }
    }

    /// Window resize: reallocates a viewport-sized surface and redraws the
    /// current frame. Returns whether a redraw happened.
    pub fn resize(&self, viewport: Viewport) -> bool {
        self.inner.borrow_mut().fit_surface(viewport)
    }

    /// Unbinds the region and drops every frame; no draw happens afterwards.
    ///
    /// A load still in progress is cancelled.
    pub fn destroy(&self) {
        let handle = {
            let mut inner = self.inner.borrow_mut();
            if inner.state == PlaybackState::Destroyed {
                return;
            }
            inner.set_state(PlaybackState::Destroyed);
            if let Some(store) = inner.store.take() {
                store.cancel();
            }
            inner.surface = None;
            inner.current_segment = None;
            inner.handle.take()
        };
        drop(handle);
        self.listeners.close();
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_store::{FrameStore, LoadOptions};
    use crate::frame_store::LoadStatus;
    use crate::testing::{frame_of, loaded_store, sequence_source, SlowSource};
    use reel_core::TimelineSegment;
    use std::sync::OnceLock;
    use std::time::Instant;

    const FRAME: Duration = Duration::from_millis(16);
    const SHOWCASE_DISTANCE: f64 = 9600.0;

    fn showcase_sequence() -> FrameSequence {
        FrameSequence::with_extension("showcase", presets::SHOWCASE_FRAME_COUNT, "png").unwrap()
    }

    fn showcase_store() -> Arc<FrameStore> {
        static STORE: OnceLock<Arc<FrameStore>> = OnceLock::new();
        STORE
            .get_or_init(|| loaded_store(&showcase_sequence(), 20, 14))
            .clone()
    }

    fn showcase_config() -> SequenceConfig {
        SequenceConfig {
            sequence: showcase_sequence(),
            timeline: Some(Arc::new(presets::showcase_timeline().unwrap())),
            distance: Distance::Pixels(SHOWCASE_DISTANCE),
            scrub: None,
            surface: SurfaceSize::Fixed {
                width: 20,
                height: 14,
            },
            overlay_threshold: None,
        }
    }

    fn hero_config() -> SequenceConfig {
        SequenceConfig {
            sequence: FrameSequence::with_extension("hero", presets::HERO_FRAME_COUNT, "png")
                .unwrap(),
            timeline: None,
            distance: Distance::Pixels(1000.0),
            scrub: None,
            surface: SurfaceSize::Viewport,
            overlay_threshold: Some(presets::HERO_OVERLAY_THRESHOLD),
        }
    }

    fn mount_showcase(driver: &ScrollDriver) -> PlaybackController {
        let controller = PlaybackController::mount(
            driver,
            Region::new(0.0, 800.0),
            showcase_config(),
            showcase_store(),
        )
        .unwrap();
        assert_eq!(controller.poll().unwrap(), PlaybackState::Playing);
        controller
    }

    fn mount_hero(driver: &ScrollDriver) -> PlaybackController {
        let config = hero_config();
        let store = loaded_store(&config.sequence, 40, 30);
        let controller =
            PlaybackController::mount(driver, Region::new(0.0, 30.0), config, store).unwrap();
        assert_eq!(controller.poll().unwrap(), PlaybackState::Playing);
        controller
    }

    fn scroll(driver: &ScrollDriver, offset: f64) {
        driver.user_scroll_to(offset);
        driver.tick(FRAME);
    }

    /// Scroll offset whose progress maps onto `frame`
    fn offset_for_frame(frame: usize) -> f64 {
        SHOWCASE_DISTANCE * ((frame as f64 + 0.5) / (presets::SHOWCASE_FRAME_COUNT - 1) as f64)
    }

    fn center_frame(controller: &PlaybackController) -> usize {
        let snapshot = controller.snapshot().unwrap();
        frame_of(snapshot.get_pixel(snapshot.width() / 2, snapshot.height() / 2))
    }

    #[test]
    fn test_activation_draws_first_frame() {
        let driver = ScrollDriver::new(Viewport::new(1000.0, 800.0));
        let controller = PlaybackController::mount(
            &driver,
            Region::new(0.0, 800.0),
            showcase_config(),
            showcase_store(),
        )
        .unwrap();
        assert_eq!(controller.state(), PlaybackState::Loading);
        assert_eq!(controller.draw_count(), 0);

        assert_eq!(controller.poll().unwrap(), PlaybackState::Playing);
        assert_eq!(controller.draw_count(), 1);
        assert_eq!(center_frame(&controller), 0);
        assert_eq!(controller.current_label().as_deref(), Some("Home"));
        assert_eq!(
            controller.current_detail().as_deref(),
            Some("Welcome to Zorah Fleet")
        );
    }

    #[test]
    fn test_scroll_drives_frames_and_segments() {
        let driver = ScrollDriver::new(Viewport::new(1000.0, 800.0));
        let controller = mount_showcase(&driver);
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = changes.clone();
        controller.on_segment_change(move |change| sink.borrow_mut().push(change.clone()));

        scroll(&driver, offset_for_frame(800));
        assert_eq!(controller.current_frame(), 800);
        assert_eq!(center_frame(&controller), 800);
        assert_eq!(controller.current_segment(), Some(2));
        assert_eq!(controller.current_label().as_deref(), Some("My Portal"));
        assert_eq!(
            controller.current_detail().as_deref(),
            Some("Integrated calendar for scheduling and availability tracking")
        );

        // Ticks inside the same segment do not re-announce it
        scroll(&driver, offset_for_frame(810));
        scroll(&driver, offset_for_frame(820));

        let changes = changes.borrow();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].index, 2);
        assert_eq!(changes[0].label, "My Portal");
    }

    #[test]
    fn test_frames_never_go_backwards_while_scrolling_down() {
        let driver = ScrollDriver::new(Viewport::new(1000.0, 800.0));
        let controller = mount_showcase(&driver);

        let mut previous = 0;
        for step in 0..=120 {
            scroll(&driver, step as f64 * 83.0);
            let frame = controller.current_frame();
            assert!(frame >= previous);
            previous = frame;
        }
        assert_eq!(previous, presets::SHOWCASE_FRAME_COUNT - 1);
    }

    #[test]
    fn test_full_progress_lands_on_last_segment() {
        let driver = ScrollDriver::new(Viewport::new(1000.0, 800.0));
        let controller = mount_showcase(&driver);

        scroll(&driver, SHOWCASE_DISTANCE);
        assert_eq!(controller.progress(), Some(1.0));
        assert_eq!(controller.current_frame(), presets::SHOWCASE_FRAME_COUNT - 1);
        assert_eq!(controller.current_segment(), Some(10));
        assert_eq!(controller.current_label().as_deref(), Some("Operations"));
        // Chaptered sequences never idle
        assert_eq!(controller.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_seek_to_segment_round_trip() {
        let driver = ScrollDriver::new(Viewport::new(1000.0, 800.0));
        let controller = mount_showcase(&driver);
        let timeline = presets::showcase_timeline().unwrap();

        for k in (0..timeline.len()).chain((0..timeline.len()).rev()) {
            controller.seek_to_segment(k).unwrap();
            driver.tick(Duration::from_secs(1));
            assert_eq!(controller.current_segment(), Some(k));
            assert_eq!(
                controller.current_label().as_deref(),
                Some(timeline.resolve_label(k).unwrap())
            );
        }

        assert!(matches!(
            controller.seek_to_segment(11),
            Err(Error::SegmentOutOfRange(11))
        ));
    }

    #[test]
    fn test_destroy_mid_scroll_stops_drawing() {
        let driver = ScrollDriver::new(Viewport::new(1000.0, 800.0));
        let controller = mount_showcase(&driver);
        scroll(&driver, 2000.0);
        scroll(&driver, 2500.0);
        let draws = controller.draw_count();
        assert!(draws >= 3);

        controller.destroy();
        assert_eq!(controller.state(), PlaybackState::Destroyed);
        assert_eq!(driver.binding_count(), 0);

        for offset in [3000.0, 4000.0, 100.0] {
            scroll(&driver, offset);
        }
        assert_eq!(controller.draw_count(), draws);
        assert!(controller.snapshot().is_none());
        assert!(controller.current_label().is_none());
        assert!(matches!(controller.seek_to_segment(0), Err(Error::NotPlaying)));
    }

    #[test]
    fn test_destroy_from_listener() {
        let driver = ScrollDriver::new(Viewport::new(1000.0, 800.0));
        let controller = Rc::new(mount_showcase(&driver));
        let weak = Rc::downgrade(&controller);
        controller.on_segment_change(move |_| {
            if let Some(controller) = weak.upgrade() {
                controller.destroy();
            }
        });

        scroll(&driver, offset_for_frame(300));
        assert_eq!(controller.state(), PlaybackState::Destroyed);
        let draws = controller.draw_count();

        scroll(&driver, offset_for_frame(1000));
        assert_eq!(controller.draw_count(), draws);
    }

    #[test]
    fn test_hero_overlay_and_idle() {
        let driver = ScrollDriver::new(Viewport::new(40.0, 30.0));
        let controller = mount_hero(&driver);
        let shown = Rc::new(RefCell::new(Vec::new()));
        let sink = shown.clone();
        controller.on_overlay_change(move |visible| sink.borrow_mut().push(visible));

        driver.tick(FRAME);
        assert_eq!(controller.state(), PlaybackState::Idle);

        scroll(&driver, 500.0);
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(controller.current_frame(), 75);
        assert!(!controller.overlay_visible());

        scroll(&driver, 800.0);
        scroll(&driver, 900.0);
        assert!(controller.overlay_visible());

        scroll(&driver, 1000.0);
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(controller.current_frame(), 150);

        scroll(&driver, 500.0);
        scroll(&driver, 0.0);
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(*shown.borrow(), vec![true, false]);
    }

    #[test]
    fn test_resize_redraws_current_frame() {
        let driver = ScrollDriver::new(Viewport::new(40.0, 30.0));
        let controller = mount_hero(&driver);
        scroll(&driver, 500.0);
        let draws = controller.draw_count();
        let frame = controller.current_frame();

        let viewport = Viewport::new(80.0, 60.0);
        driver.set_viewport(viewport);
        assert!(controller.resize(viewport));

        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.dimensions(), (80, 60));
        assert_eq!(frame_of(snapshot.get_pixel(40, 30)), frame);
        assert_eq!(controller.current_frame(), frame);
        assert_eq!(controller.draw_count(), draws + 1);

        // Fixed surfaces ignore the viewport
        let showcase = mount_showcase(&driver);
        assert!(!showcase.resize(Viewport::new(10.0, 10.0)));
        assert_eq!(showcase.snapshot().unwrap().dimensions(), (20, 14));
    }

    #[test]
    fn test_load_failure_keeps_loading() {
        let config = hero_config();
        let mut source = sequence_source(&config.sequence, 4, 3);
        source.remove(&config.sequence.frame_uri(42));
        let options = LoadOptions {
            threads: Some(2),
            report_interval: 0,
        };
        let store = FrameStore::load(config.sequence.clone(), Arc::new(source), &options).unwrap();

        let driver = ScrollDriver::new(Viewport::new(40.0, 30.0));
        let controller =
            PlaybackController::mount(&driver, Region::new(0.0, 30.0), config, store).unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        let failure = loop {
            match controller.poll() {
                Err(Error::Load(failure)) => break failure,
                Ok(PlaybackState::Loading) if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(5));
                }
                other => panic!("unexpected poll result: {other:?}"),
            }
        };
        assert_eq!(failure.index, 42);

        assert_eq!(controller.poll().unwrap(), PlaybackState::Loading);
        assert_eq!(driver.binding_count(), 0);
        scroll(&driver, 500.0);
        assert_eq!(controller.draw_count(), 0);
        assert!(matches!(controller.seek_to_segment(0), Err(Error::NotPlaying)));
    }

    #[test]
    fn test_deferred_region_waits_for_layout() {
        let driver = ScrollDriver::new(Viewport::new(40.0, 30.0));
        let config = hero_config();
        let store = loaded_store(&config.sequence, 40, 30);
        let controller =
            PlaybackController::mount(&driver, Region::new(0.0, 0.0), config, store).unwrap();

        assert_eq!(controller.poll().unwrap(), PlaybackState::Ready);
        assert_eq!(controller.draw_count(), 1);

        controller.set_region(Region::new(0.0, 30.0));
        driver.tick(FRAME);
        assert_eq!(controller.poll().unwrap(), PlaybackState::Idle);

        scroll(&driver, 250.0);
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(controller.current_frame(), 37);
    }

    #[test]
    fn test_controllers_on_one_page_are_independent() {
        let driver = ScrollDriver::new(Viewport::new(40.0, 30.0));
        let hero = mount_hero(&driver);
        let showcase = PlaybackController::mount(
            &driver,
            Region::new(30.0, 30.0),
            showcase_config(),
            showcase_store(),
        )
        .unwrap();
        showcase.poll().unwrap();

        // Hero pins 0..1000, the showcase starts after the hero's pin spacing
        scroll(&driver, 500.0);
        assert_eq!(hero.current_frame(), 75);
        assert_eq!(showcase.current_frame(), 0);

        scroll(&driver, 1030.0 + SHOWCASE_DISTANCE / 2.0);
        assert_eq!(hero.current_frame(), 150);
        assert_eq!(showcase.current_frame(), 1211);

        hero.destroy();
        let hero_draws = hero.draw_count();
        scroll(&driver, 1030.0 + SHOWCASE_DISTANCE);
        assert_eq!(hero.draw_count(), hero_draws);
        assert_eq!(showcase.current_frame(), presets::SHOWCASE_FRAME_COUNT - 1);
    }

    #[test]
    fn test_leaving_forward_refits_viewport_surface() {
        let driver = ScrollDriver::new(Viewport::new(40.0, 30.0));
        let controller = mount_hero(&driver);
        scroll(&driver, 500.0);

        // Viewport changes without an explicit resize
        driver.set_viewport(Viewport::new(80.0, 60.0));
        assert_eq!(controller.snapshot().unwrap().dimensions(), (40, 30));
        let draws = controller.draw_count();

        scroll(&driver, 1500.0);
        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.dimensions(), (80, 60));
        assert_eq!(controller.current_frame(), 150);
        assert_eq!(frame_of(snapshot.get_pixel(40, 30)), 150);
        // The update draw plus the redraw after the refit
        assert_eq!(controller.draw_count(), draws + 2);
    }

    #[test]
    fn test_leaving_backward_refits_viewport_surface() {
        let driver = ScrollDriver::new(Viewport::new(40.0, 30.0));
        let controller = mount_hero(&driver);
        scroll(&driver, 600.0);

        driver.set_viewport(Viewport::new(60.0, 45.0));
        let draws = controller.draw_count();

        scroll(&driver, 0.0);
        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.dimensions(), (60, 45));
        assert_eq!(controller.current_frame(), 0);
        assert_eq!(frame_of(snapshot.get_pixel(30, 22)), 0);
        assert_eq!(controller.draw_count(), draws + 2);

        // Inside the pin the surface keeps its size
        driver.set_viewport(Viewport::new(40.0, 30.0));
        scroll(&driver, 300.0);
        assert_eq!(controller.snapshot().unwrap().dimensions(), (60, 45));
    }

    #[test]
    fn test_destroy_while_loading_cancels_decoding() {
        let config = hero_config();
        let source = Arc::new(SlowSource::new(
            sequence_source(&config.sequence, 4, 3),
            Duration::from_millis(20),
        ));
        let options = LoadOptions {
            threads: Some(2),
            report_interval: 0,
        };
        let store =
            FrameStore::load(config.sequence.clone(), source.clone(), &options).unwrap();

        let driver = ScrollDriver::new(Viewport::new(40.0, 30.0));
        let controller = PlaybackController::mount(
            &driver,
            Region::new(0.0, 30.0),
            config,
            Arc::clone(&store),
        )
        .unwrap();
        assert_eq!(controller.poll().unwrap(), PlaybackState::Loading);

        std::thread::sleep(Duration::from_millis(100));
        controller.destroy();
        let at_destroy = source.fetched();

        let deadline = Instant::now() + Duration::from_secs(10);
        while store.status() == LoadStatus::Loading && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        std::thread::sleep(Duration::from_millis(100));

        assert_eq!(store.status(), LoadStatus::Cancelled);
        assert!(source.fetched() <= at_destroy + 2);
        assert!(source.fetched() < presets::HERO_FRAME_COUNT);
        assert_eq!(controller.draw_count(), 0);
        assert_eq!(controller.poll().unwrap(), PlaybackState::Destroyed);
    }

    #[test]
    fn test_seek_with_custom_options() {
        let driver = ScrollDriver::new(Viewport::new(1000.0, 800.0));
        let controller = mount_showcase(&driver);
        let options = SeekOptions {
            duration: Duration::from_millis(100),
            ease: crate::ease::Ease::Linear,
        };

        controller.seek_to_segment_with(3, options).unwrap();
        driver.tick(Duration::from_millis(50));
        assert!(driver.is_seeking());
        driver.tick(Duration::from_millis(60));
        assert!(!driver.is_seeking());
        assert_eq!(controller.current_label().as_deref(), Some("Email Inbox"));
    }

    #[test]
    fn test_mount_rejects_uncovered_timeline() {
        let driver = ScrollDriver::new(Viewport::new(1000.0, 800.0));
        let mut config = showcase_config();
        config.timeline = Some(Arc::new(
            Timeline::new(vec![TimelineSegment::new(0, 1212, "Half", "only half")]).unwrap(),
        ));

        let result = PlaybackController::mount(
            &driver,
            Region::new(0.0, 800.0),
            config,
            showcase_store(),
        );
        assert!(matches!(
            result,
            Err(Error::Core(reel_core::Error::Segmentation(
                reel_core::SegmentationError::Coverage { .. }
            )))
        ));
    }
}
