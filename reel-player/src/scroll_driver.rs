//! Scroll-progress driver: binds pinned regions of a scrolling document to a
//! normalized progress value.
//!
//! The driver models the document scroll position of one page. Each bound
//! region is pinned from `start` to `end = start + distance`; while the scroll
//! offset is inside that window, scrolling moves the region's progress instead
//! of the page. Regions further down are pushed by the distances of the pinned
//! regions above them.
//!
//! Input is coalesced: scroll input only records the newest offset, and
//! [`ScrollDriver::tick`] delivers at most one update per binding, always the
//! newest value. Observers are invoked after the driver's own state is released,
//! so they may seek, destroy handles or bind new regions from inside a callback.

use crate::ease::Ease;
use reel_core::Distance;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

/// Progress deltas below this snap to the scrub target
const SCRUB_EPSILON: f64 = 1e-4;

/// Visible area of the page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Natural (unpinned) layout box of a region in document coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub top: f64,
    pub height: f64,
}

impl Region {
    pub fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    /// A region without layout cannot be pinned yet
    pub fn is_measurable(&self) -> bool {
        self.top.is_finite() && self.height > 0.0
    }
}

/// Receives progress changes of one binding
pub trait ScrollObserver {
    /// Progress moved; called with the newest value only
    fn on_update(&self, progress: f64);

    /// Progress reached 1 while scrolling down
    fn on_leave_forward(&self) {}

    /// Progress returned to 0 while scrolling up
    fn on_leave_backward(&self) {}
}

/// Options for [`ScrollDriver::bind`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindOptions {
    /// Scroll length mapped onto the full `[0, 1]` range
    pub distance: Distance,
    /// Lag with which delivered progress follows the scroll position
    pub scrub: Option<Duration>,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            distance: Distance::ViewportHeights(100.0),
            scrub: None,
        }
    }
}

/// Options for an animated programmatic scroll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekOptions {
    pub duration: Duration,
    pub ease: Ease,
}

impl Default for SeekOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(800),
            ease: Ease::InOutCubic,
        }
    }
}

/// Whether a binding has been measured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindState {
    /// Region has no layout yet; retried on every re-measure
    Deferred,
    Bound,
}

/// Scroll offsets where a binding's pin starts and ends
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchors {
    pub start: f64,
    pub end: f64,
}

impl Anchors {
    /// Progress at a document scroll offset
    pub fn progress(&self, offset: f64) -> f64 {
        let span = self.end - self.start;
        if span <= 0.0 {
            return if offset >= self.start { 1.0 } else { 0.0 };
        }
        ((offset - self.start) / span).clamp(0.0, 1.0)
    }

    /// Scroll offset that lands on `progress`
    pub fn offset_at(&self, progress: f64) -> f64 {
        self.start + (self.end - self.start) * progress.clamp(0.0, 1.0)
    }

    /// True while the region is pinned at `offset`
    pub fn is_pinned(&self, offset: f64) -> bool {
        offset > self.start && offset < self.end
    }
}

type BindingId = u64;

struct Binding {
    id: BindingId,
    region: Region,
    options: BindOptions,
    observer: Rc<dyn ScrollObserver>,
    anchors: Option<Anchors>,
    delivered: Option<f64>,
}

struct Seek {
    binding: BindingId,
    from: f64,
    to: f64,
    elapsed: Duration,
    options: SeekOptions,
}

enum Notice {
    Update(f64),
    LeaveForward,
    LeaveBackward,
}

type Pending = Vec<(BindingId, Rc<dyn ScrollObserver>, Vec<Notice>)>;

struct DriverState {
    viewport: Viewport,
    offset: f64,
    bindings: Vec<Binding>,
    next_id: BindingId,
    seek: Option<Seek>,
    needs_refresh: bool,
}

impl DriverState {
    /// Recomputes every binding's anchors in document order
    fn measure(&mut self) {
        let viewport_height = self.viewport.height;
        let mut order: Vec<usize> = (0..self.bindings.len()).collect();
        order.sort_by(|&a, &b| {
            self.bindings[a]
                .region
                .top
                .total_cmp(&self.bindings[b].region.top)
        });

        let mut spacing = 0.0;
        for index in order {
            let binding = &mut self.bindings[index];
            if !binding.region.is_measurable() {
                if binding.anchors.take().is_some() {
                    tracing::debug!(binding = binding.id, "region lost its layout, binding deferred");
                }
                continue;
            }

            let start = binding.region.top + spacing;
            let distance = binding.options.distance.to_pixels(viewport_height).max(0.0);
            let anchors = Anchors {
                start,
                end: start + distance,
            };
            if binding.anchors.is_none() {
                tracing::debug!(binding = binding.id, start, end = anchors.end, "binding measured");
            }
            binding.anchors = Some(anchors);
            spacing += distance;
        }
        self.needs_refresh = false;
    }

    fn advance_seek(&mut self, dt: Duration) {
        let Some(seek) = self.seek.as_mut() else {
            return;
        };
        seek.elapsed += dt;
        let total = seek.options.duration.as_secs_f64();
        let t = if total <= 0.0 {
            1.0
        } else {
            (seek.elapsed.as_secs_f64() / total).min(1.0)
        };

        if t >= 1.0 {
            self.offset = seek.to;
            self.seek = None;
        } else {
            self.offset = seek.from + (seek.to - seek.from) * seek.options.ease.apply(t);
        }
    }

    fn collect(&mut self, dt: Duration) -> Pending {
        let offset = self.offset;
        let mut pending = Vec::new();
        let mut remeasure = false;

        for binding in &mut self.bindings {
            let Some(anchors) = binding.anchors else {
                continue;
            };
            let target = anchors.progress(offset);
            let next = match (binding.delivered, binding.options.scrub) {
                (Some(previous), Some(scrub)) if !scrub.is_zero() => {
                    let k = (dt.as_secs_f64() / scrub.as_secs_f64()).min(1.0);
                    let eased = previous + (target - previous) * k;
                    if (target - eased).abs() < SCRUB_EPSILON {
                        target
                    } else {
                        eased
                    }
                }
                _ => target,
            };
            if binding.delivered == Some(next) {
                continue;
            }

            let mut notices = vec![Notice::Update(next)];
            if let Some(previous) = binding.delivered {
                if previous < 1.0 && next >= 1.0 {
                    notices.push(Notice::LeaveForward);
                    remeasure = true;
                }
                if previous > 0.0 && next <= 0.0 {
                    notices.push(Notice::LeaveBackward);
                    remeasure = true;
                }
            }
            binding.delivered = Some(next);
            pending.push((binding.id, Rc::clone(&binding.observer), notices));
        }

        if remeasure {
            self.needs_refresh = true;
        }
        pending
    }

    fn binding(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.id == id)
    }
}

/// Scroll state of one page, shared by every region bound on it
#[derive(Clone)]
pub struct ScrollDriver {
    state: Rc<RefCell<DriverState>>,
}

impl ScrollDriver {
    /// Creates a driver scrolled to the top
    pub fn new(viewport: Viewport) -> Self {
        Self {
            state: Rc::new(RefCell::new(DriverState {
                viewport,
                offset: 0.0,
                bindings: Vec::new(),
                next_id: 0,
                seek: None,
                needs_refresh: false,
            })),
        }
    }

    /// Pins `region` and reports its progress to `observer`.
    ///
    /// A region without layout is accepted in the [`BindState::Deferred`] state
    /// and measured again on the next layout pass.
    pub fn bind(
        &self,
        region: Region,
        options: BindOptions,
        observer: Rc<dyn ScrollObserver>,
    ) -> ScrollHandle {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.bindings.push(Binding {
            id,
            region,
            options,
            observer,
            anchors: None,
            delivered: None,
        });
        state.measure();

        if state.binding(id).and_then(|b| b.anchors).is_none() {
            tracing::debug!(binding = id, "region not measurable yet, bind deferred");
        }

        ScrollHandle {
            state: Rc::downgrade(&self.state),
            id,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.state.borrow().viewport
    }

    /// Updates the viewport; distances in viewport heights are re-measured on the next tick
    pub fn set_viewport(&self, viewport: Viewport) {
        let mut state = self.state.borrow_mut();
        state.viewport = viewport;
        state.needs_refresh = true;
    }

    /// Current document scroll offset
    pub fn offset(&self) -> f64 {
        self.state.borrow().offset
    }

    /// User scroll input; cancels any programmatic seek
    pub fn user_scroll_to(&self, offset: f64) {
        let mut state = self.state.borrow_mut();
        if state.seek.take().is_some() {
            tracing::debug!("user scroll cancelled seek");
        }
        state.offset = offset.max(0.0);
    }

    /// Relative user scroll input
    pub fn user_scroll_by(&self, delta: f64) {
        let offset = self.offset();
        self.user_scroll_to(offset + delta);
    }

    /// Re-measures every binding immediately
    pub fn refresh(&self) {
        self.state.borrow_mut().measure();
    }

    /// True while a programmatic seek is animating
    pub fn is_seeking(&self) -> bool {
        self.state.borrow().seek.is_some()
    }

    /// Number of live bindings
    pub fn binding_count(&self) -> usize {
        self.state.borrow().bindings.len()
    }

    /// Advances animations by `dt` and delivers pending progress changes
    pub fn tick(&self, dt: Duration) {
        let pending = {
            let mut state = self.state.borrow_mut();
            if state.needs_refresh {
                state.measure();
            }
            state.advance_seek(dt);
            state.collect(dt)
        };

        for (id, observer, notices) in pending {
            for notice in notices {
                // A callback earlier in this tick may have destroyed the binding
                if !self.is_bound(id) {
                    break;
                }
                match notice {
                    Notice::Update(progress) => observer.on_update(progress),
                    Notice::LeaveForward => observer.on_leave_forward(),
                    Notice::LeaveBackward => observer.on_leave_backward(),
                }
            }
        }
    }

    fn is_bound(&self, id: BindingId) -> bool {
        self.state.borrow().binding(id).is_some()
    }
}

/// Owner of one binding; dropping it unpins the region
pub struct ScrollHandle {
    state: Weak<RefCell<DriverState>>,
    id: BindingId,
}

impl ScrollHandle {
    fn with_binding<R>(&self, f: impl FnOnce(&DriverState, &Binding) -> R) -> Option<R> {
        let state = self.state.upgrade()?;
        let state = state.borrow();
        let binding = state.binding(self.id)?;
        Some(f(&state, binding))
    }

    pub fn bind_state(&self) -> Option<BindState> {
        self.with_binding(|_, b| match b.anchors {
            Some(_) => BindState::Bound,
            None => BindState::Deferred,
        })
    }

    pub fn anchors(&self) -> Option<Anchors> {
        self.with_binding(|_, b| b.anchors).flatten()
    }

    /// Live progress at the current scroll offset
    pub fn progress(&self) -> Option<f64> {
        self.with_binding(|s, b| b.anchors.map(|a| a.progress(s.offset)))
            .flatten()
    }

    pub fn is_pinned(&self) -> bool {
        self.with_binding(|s, b| b.anchors.is_some_and(|a| a.is_pinned(s.offset)))
            .unwrap_or(false)
    }

    /// True while a seek started by this handle is animating
    pub fn is_seeking(&self) -> bool {
        self.with_binding(|s, _| s.seek.as_ref().is_some_and(|seek| seek.binding == self.id))
            .unwrap_or(false)
    }

    /// Replaces the region's layout box; measured on the next tick
    pub fn set_region(&self, region: Region) {
        if let Some(state) = self.state.upgrade() {
            let mut state = state.borrow_mut();
            if let Some(binding) = state.bindings.iter_mut().find(|b| b.id == self.id) {
                binding.region = region;
                state.needs_refresh = true;
            }
        }
    }

    /// Animates the page so the region lands at `progress`
    pub fn seek_to(&self, progress: f64) -> Option<f64> {
        self.seek_to_with(progress, SeekOptions::default())
    }

    /// Like [`ScrollHandle::seek_to`]; replaces any seek in flight.
    ///
    /// Returns the target scroll offset, or `None` while the binding is deferred
    /// or destroyed.
    pub fn seek_to_with(&self, progress: f64, options: SeekOptions) -> Option<f64> {
        let state = self.state.upgrade()?;
        let mut state = state.borrow_mut();
        if state.needs_refresh {
            state.measure();
        }
        let anchors = state.binding(self.id)?.anchors?;
        let to = anchors.offset_at(progress);
        let from = state.offset;

        if state.seek.is_some() {
            tracing::debug!(binding = self.id, "seek replaced");
        }
        tracing::debug!(binding = self.id, progress, from, to, "seek started");
        state.seek = Some(Seek {
            binding: self.id,
            from,
            to,
            elapsed: Duration::ZERO,
            options,
        });
        Some(to)
    }

    /// Unpins the region and releases its observer
    pub fn destroy(self) {}
}

impl Drop for ScrollHandle {
    fn drop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut state = state.borrow_mut();
        state.bindings.retain(|b| b.id != self.id);
        if state.seek.as_ref().is_some_and(|seek| seek.binding == self.id) {
            state.seek = None;
        }
        state.needs_refresh = true;
        tracing::debug!(binding = self.id, "binding destroyed");
    }
}

impl std::fmt::Debug for ScrollHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollHandle")
            .field("id", &self.id)
            .field("state", &self.bind_state())
            .finish()
    }
}
