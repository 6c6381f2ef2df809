//! Fixtures shared by the unit tests

use crate::frame_store::{FrameSource, FrameStore, LoadOptions, MemorySource};
use crate::scroll_driver::ScrollObserver;
use image::{ImageFormat, Rgba, RgbaImage};
use reel_core::FrameSequence;
use std::cell::RefCell;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Encodes a solid-color PNG
pub fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

/// Color that identifies frame `index`
pub fn frame_color(index: usize) -> [u8; 4] {
    [(index % 256) as u8, (index / 256 % 256) as u8, 0, 255]
}

/// Decodes a frame index back from a surface pixel
pub fn frame_of(pixel: &Rgba<u8>) -> usize {
    pixel[0] as usize + pixel[1] as usize * 256
}

/// In-memory source holding every frame of `sequence` as a solid PNG
pub fn sequence_source(sequence: &FrameSequence, width: u32, height: u32) -> MemorySource {
    let mut source = MemorySource::new();
    for index in 0..sequence.frame_count {
        source.insert(
            sequence.frame_uri(index),
            png_bytes(width, height, frame_color(index)),
        );
    }
    source
}

/// A fully decoded store
pub fn loaded_store(sequence: &FrameSequence, width: u32, height: u32) -> Arc<FrameStore> {
    let source = sequence_source(sequence, width, height);
    let options = LoadOptions {
        threads: Some(2),
        report_interval: 0,
    };
    FrameStore::load_blocking(sequence.clone(), Arc::new(source), &options).unwrap()
}

/// Source that sleeps before every fetch and counts completed fetches
pub struct SlowSource {
    inner: MemorySource,
    delay: Duration,
    fetched: AtomicUsize,
}

impl SlowSource {
    pub fn new(inner: MemorySource, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            fetched: AtomicUsize::new(0),
        }
    }

    pub fn fetched(&self) -> usize {
        self.fetched.load(Ordering::SeqCst)
    }
}

impl FrameSource for SlowSource {
    fn fetch(&self, uri: &str) -> std::io::Result<Vec<u8>> {
        std::thread::sleep(self.delay);
        self.fetched.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(uri)
    }
}

/// Scroll callbacks as received by an observer
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Update(f64),
    LeaveForward,
    LeaveBackward,
}

/// Records every callback it receives
#[derive(Default)]
pub struct Recorder {
    pub events: RefCell<Vec<Observed>>,
}

impl Recorder {
    pub fn take(&self) -> Vec<Observed> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn updates(&self) -> Vec<f64> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Observed::Update(p) => Some(*p),
                _ => None,
            })
            .collect()
    }
}

impl ScrollObserver for Recorder {
    fn on_update(&self, progress: f64) {
        self.events.borrow_mut().push(Observed::Update(progress));
    }

    fn on_leave_forward(&self) {
        self.events.borrow_mut().push(Observed::LeaveForward);
    }

    fn on_leave_backward(&self) {
        self.events.borrow_mut().push(Observed::LeaveBackward);
    }
}
