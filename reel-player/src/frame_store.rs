//! Frame store: preloads and owns every decoded frame of one sequence
//!
//! Decoding runs on a dedicated rayon pool so the caller's event loop keeps
//! running. Each slot is written exactly once by the worker that decoded it.
//! The store only reports frames once *all* of them decoded; a single failure
//! makes the whole sequence unavailable. A cancelled load skips the remaining
//! frames and never becomes ready.

use crate::progress::LoadProgress;
use crate::{Error, Result};
use image::RgbaImage;
use rayon::prelude::*;
use reel_core::FrameSequence;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

/// Provides the encoded bytes of a frame asset
pub trait FrameSource: Send + Sync {
    /// Fetches the asset at `uri` (as built by [`FrameSequence::uri`])
    fn fetch(&self, uri: &str) -> std::io::Result<Vec<u8>>;
}

/// Reads frames from a directory on disk
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Creates a source rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FrameSource for DirSource {
    fn fetch(&self, uri: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.root.join(uri))
    }
}

/// Serves frames from memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    assets: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the encoded bytes of one asset
    pub fn insert(&mut self, uri: impl Into<String>, bytes: Vec<u8>) {
        self.assets.insert(uri.into(), bytes);
    }

    /// Removes an asset, returning its bytes
    pub fn remove(&mut self, uri: &str) -> Option<Vec<u8>> {
        self.assets.remove(uri)
    }
}

impl FrameSource for MemorySource {
    fn fetch(&self, uri: &str) -> std::io::Result<Vec<u8>> {
        self.assets.get(uri).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, uri.to_string())
        })
    }
}

/// Why a frame failed to load
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadCause {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("decode failed: {0}")]
    Decode(String),
}

/// The sequence could not be loaded; `index` is the lowest failing frame
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("frame {index} ({uri}) failed to load: {cause}")]
pub struct LoadFailure {
    pub index: usize,
    pub uri: String,
    pub cause: LoadCause,
}

/// Readiness of a frame store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Ready,
    Failed,
    /// Loading stopped by [`FrameStore::cancel`]
    Cancelled,
}

const STATUS_LOADING: u8 = 0;
const STATUS_READY: u8 = 1;
const STATUS_FAILED: u8 = 2;
const STATUS_CANCELLED: u8 = 3;

/// Options for loading a sequence
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Decoder threads (None = one per CPU)
    pub threads: Option<usize>,
    /// Log progress every N frames (0 = only start and finish)
    pub report_interval: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            threads: None,
            report_interval: 200,
        }
    }
}

/// Decoded frames of one sequence
pub struct FrameStore {
    sequence: FrameSequence,
    slots: Vec<OnceLock<RgbaImage>>,
    status: AtomicU8,
    cancelled: AtomicBool,
    failure: OnceLock<LoadFailure>,
}

impl FrameStore {
    fn empty(sequence: FrameSequence) -> Self {
        let slots = (0..sequence.frame_count).map(|_| OnceLock::new()).collect();
        Self {
            sequence,
            slots,
            status: AtomicU8::new(STATUS_LOADING),
            cancelled: AtomicBool::new(false),
            failure: OnceLock::new(),
        }
    }

    /// Starts decoding every frame in the background and returns immediately.
    ///
    /// Poll [`FrameStore::status`] to learn when the sequence becomes ready.
    pub fn load(
        sequence: FrameSequence,
        source: Arc<dyn FrameSource>,
        options: &LoadOptions,
    ) -> Result<Arc<Self>> {
        let pool = build_thread_pool(options.threads)?;
        let store = Arc::new(Self::empty(sequence));
        let worker = Arc::clone(&store);
        let report_interval = options.report_interval;

        std::thread::Builder::new()
            .name(format!("reel-load-{}", store.sequence.name))
            .spawn(move || {
                pool.install(|| worker.decode_all(source.as_ref(), report_interval));
            })?;

        Ok(store)
    }

    /// Decodes every frame on the calling thread's behalf and waits for the join
    pub fn load_blocking(
        sequence: FrameSequence,
        source: Arc<dyn FrameSource>,
        options: &LoadOptions,
    ) -> Result<Arc<Self>> {
        let pool = build_thread_pool(options.threads)?;
        let store = Arc::new(Self::empty(sequence));
        pool.install(|| store.decode_all(source.as_ref(), options.report_interval));

        match store.failure() {
            Some(failure) => Err(Error::Load(failure.clone())),
            None => Ok(store),
        }
    }

    fn decode_all(&self, source: &dyn FrameSource, report_interval: u64) {
        let total = self.sequence.frame_count;
        let progress = LoadProgress::new(total as u64, &self.sequence.name, report_interval);
        tracing::info!(sequence = %self.sequence.name, frames = total, "loading frames");

        let first_failure = (0..total)
            .into_par_iter()
            .filter_map(|index| {
                if self.is_cancelled() {
                    return None;
                }
                let result = self.decode_slot(index, source);
                progress.increment();
                result.err()
            })
            .min_by_key(|failure| failure.index);

        if self.is_cancelled() {
            tracing::info!(
                sequence = %self.sequence.name,
                decoded = progress.processed(),
                frames = total,
                "loading cancelled"
            );
            self.status.store(STATUS_CANCELLED, Ordering::Release);
            return;
        }

        match first_failure {
            Some(failure) => {
                tracing::warn!(
                    sequence = %self.sequence.name,
                    index = failure.index,
                    "sequence unavailable: {failure}"
                );
                let _ = self.failure.set(failure);
                self.status.store(STATUS_FAILED, Ordering::Release);
            }
            None => {
                tracing::info!(
                    sequence = %self.sequence.name,
                    frames = total,
                    "all frames decoded in {}",
                    crate::progress::format_duration(progress.elapsed_secs())
                );
                self.status.store(STATUS_READY, Ordering::Release);
            }
        }
    }

    fn decode_slot(&self, index: usize, source: &dyn FrameSource) -> std::result::Result<(), LoadFailure> {
        let uri = self.sequence.frame_uri(index);
        let bytes = source.fetch(&uri).map_err(|e| LoadFailure {
            index,
            uri: uri.clone(),
            cause: LoadCause::Fetch(e.to_string()),
        })?;
        let image = image::load_from_memory(&bytes).map_err(|e| LoadFailure {
            index,
            uri: uri.clone(),
            cause: LoadCause::Decode(e.to_string()),
        })?;

        let _ = self.slots[index].set(image.to_rgba8());
        Ok(())
    }

    /// Stops a running load: frames not yet started are skipped and the store
    /// ends `Cancelled`. No effect once the load has finished.
    pub fn cancel(&self) {
        if self.status() == LoadStatus::Loading && !self.cancelled.swap(true, Ordering::AcqRel) {
            tracing::debug!(sequence = %self.sequence.name, "cancelling load");
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// The sequence this store holds
    pub fn sequence(&self) -> &FrameSequence {
        &self.sequence
    }

    /// Number of frames in the sequence
    pub fn frame_count(&self) -> usize {
        self.sequence.frame_count
    }

    /// Current readiness; never leaves `Ready` or `Failed` once reached
    pub fn status(&self) -> LoadStatus {
        match self.status.load(Ordering::Acquire) {
            STATUS_READY => LoadStatus::Ready,
            STATUS_FAILED => LoadStatus::Failed,
            STATUS_CANCELLED => LoadStatus::Cancelled,
            _ => LoadStatus::Loading,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status() == LoadStatus::Ready
    }

    /// The load failure, once the store has failed
    pub fn failure(&self) -> Option<&LoadFailure> {
        self.failure.get()
    }

    /// Number of slots decoded so far
    pub fn loaded_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.get().is_some()).count()
    }

    /// Gets a decoded frame; always `None` before the whole sequence is ready
    pub fn get(&self, index: usize) -> Option<&RgbaImage> {
        if !self.is_ready() {
            return None;
        }
        self.slots.get(index).and_then(OnceLock::get)
    }
}

impl std::fmt::Debug for FrameStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStore")
            .field("sequence", &self.sequence.name)
            .field("frame_count", &self.sequence.frame_count)
            .field("status", &self.status())
            .finish()
    }
}

fn build_thread_pool(threads: Option<usize>) -> Result<rayon::ThreadPool> {
    let threads = threads.unwrap_or_else(num_cpus::get).max(1);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("reel-decode-{i}"))
        .build()
        .map_err(|e| Error::ThreadPool(e.to_string()))
}
