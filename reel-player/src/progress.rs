//! Load progress tracking with ETA estimation

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Thread-safe frame load counter that logs progress with an ETA
pub struct LoadProgress {
    total: u64,
    processed: AtomicU64,
    start_time: Instant,
    label: String,
    report_interval: u64,
}

impl LoadProgress {
    /// Creates a new tracker; `report_interval` of 0 disables intermediate reports
    pub fn new(total: u64, label: &str, report_interval: u64) -> Self {
        Self {
            total,
            processed: AtomicU64::new(0),
            start_time: Instant::now(),
            label: label.to_string(),
            report_interval,
        }
    }

    /// Number of frames processed so far
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Increments the processed count by one and reports on interval boundaries
    pub fn increment(&self) -> u64 {
        let current = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if self.report_interval > 0 && current % self.report_interval == 0 && current < self.total
        {
            self.report(current);
        }
        current
    }

    /// Seconds since the tracker was created
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    fn report(&self, current: u64) {
        let elapsed_secs = self.elapsed_secs();
        let percent = if self.total > 0 {
            (current as f64 / self.total as f64) * 100.0
        } else {
            0.0
        };
        let rate = current as f64 / elapsed_secs.max(f64::EPSILON);
        let remaining = (self.total - current) as f64 / rate;

        tracing::info!(
            sequence = %self.label,
            "decoded {}/{} frames ({:.1}%) - elapsed: {} - ETA: {}",
            current,
            self.total,
            percent,
            format_duration(elapsed_secs),
            format_duration(remaining),
        );
    }
}

/// Formats seconds into a human-readable duration string
pub fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        return format!("{secs:.1}s");
    }

    let total = secs.round() as u64;
    let (hours, mins, secs) = (total / 3600, total % 3600 / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {mins}m {secs}s")
    } else {
        format!("{mins}m {secs}s")
    }
}
