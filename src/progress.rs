//! Progress reporting for decompression.
//!
//! Tools receive a plain `&mut dyn FnMut(f64)` callback taking a percentage
//! in `0.0..=100.0`. There is no return value and no cancellation channel.
//! [`ProgressTracker`] wraps the callback and guarantees the values it emits
//! are clamped and never decrease; [`ProgressReader`] turns bytes read from an
//! entry stream into percentage updates for single-file extraction.
//!
//! # Example
//!
//! ```
//! use arcwalk::progress::ProgressTracker;
//!
//! let mut seen = Vec::new();
//! let mut callback = |p: f64| seen.push(p);
//! let mut tracker = ProgressTracker::new(&mut callback);
//! tracker.report_fraction(1, 4);
//! tracker.report(10.0); // ignored: would go backwards
//! tracker.finish();
//! assert_eq!(seen, vec![25.0, 100.0]);
//! ```

use std::io::{self, Read};

/// IEC byte unit: 1 KiB = 1024 bytes.
const BYTES_KB: f64 = 1024.0;
const BYTES_MB: f64 = BYTES_KB * 1024.0;
const BYTES_GB: f64 = BYTES_MB * 1024.0;

/// Minimum percentage step between byte-level updates.
const BYTE_STEP: f64 = 1.0;

/// Clamping, monotonic wrapper around a progress callback.
pub struct ProgressTracker<'a> {
    callback: &'a mut dyn FnMut(f64),
    last: Option<f64>,
}

impl<'a> ProgressTracker<'a> {
    /// Wraps a percentage callback.
    pub fn new(callback: &'a mut dyn FnMut(f64)) -> Self {
        Self {
            callback,
            last: None,
        }
    }

    /// Reports a percentage; values below the last reported one are dropped.
    pub fn report(&mut self, percent: f64) {
        if percent.is_nan() {
            return;
        }
        let percent = percent.clamp(0.0, 100.0);
        if self.last.is_some_and(|last| percent <= last) {
            return;
        }
        self.last = Some(percent);
        (self.callback)(percent);
    }

    /// Reports `done / total` as a percentage. A zero total counts as done.
    pub fn report_fraction(&mut self, done: u64, total: u64) {
        if total == 0 {
            self.report(100.0);
        } else {
            self.report(done as f64 * 100.0 / total as f64);
        }
    }

    /// Reports completion.
    pub fn finish(&mut self) {
        self.report(100.0);
    }

    /// Returns the last emitted percentage.
    pub fn last(&self) -> Option<f64> {
        self.last
    }
}

impl std::fmt::Debug for ProgressTracker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

/// Reader adapter reporting byte progress through a [`ProgressTracker`].
///
/// Updates are emitted in steps of at least one percent.
pub struct ProgressReader<'t, 'a, R> {
    inner: R,
    read: u64,
    total: u64,
    next_report: f64,
    tracker: &'t mut ProgressTracker<'a>,
}

impl<'t, 'a, R: Read> ProgressReader<'t, 'a, R> {
    /// Wraps `inner`, whose expected length is `total` bytes.
    pub fn new(inner: R, total: u64, tracker: &'t mut ProgressTracker<'a>) -> Self {
        Self {
            inner,
            read: 0,
            total,
            next_report: BYTE_STEP,
            tracker,
        }
    }

    /// Returns the number of bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.read
    }
}

impl<R: Read> Read for ProgressReader<'_, '_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.read += n as u64;
        if self.total > 0 {
            let percent = self.read as f64 * 100.0 / self.total as f64;
            if percent >= self.next_report {
                self.tracker.report(percent);
                self.next_report = percent + BYTE_STEP;
            }
        }
        Ok(n)
    }
}

/// Formats bytes as a human-readable string using IEC units (KiB, MiB, GiB).
///
/// # Examples
///
/// ```rust
/// use arcwalk::progress::format_bytes_iec;
///
/// assert_eq!(format_bytes_iec(512), "512 B");
/// assert_eq!(format_bytes_iec(1536), "1.5 KiB");
/// assert_eq!(format_bytes_iec(1048576), "1.0 MiB");
/// ```
pub fn format_bytes_iec(bytes: u64) -> String {
    let bytes_f64 = bytes as f64;
    if bytes_f64 < BYTES_KB {
        format!("{} B", bytes)
    } else if bytes_f64 < BYTES_MB {
        format!("{:.1} KiB", bytes_f64 / BYTES_KB)
    } else if bytes_f64 < BYTES_GB {
        format!("{:.1} MiB", bytes_f64 / BYTES_MB)
    } else {
        format!("{:.1} GiB", bytes_f64 / BYTES_GB)
    }
}
