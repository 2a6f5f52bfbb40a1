//! Transfer speed, ETA and percentage estimation from byte samples.
//!
//! `estimate` is pure; `SampleWindow` carries the previous sample between
//! calls for one task.

use std::time::Instant;

/// Bytes per megabyte used for all MB/s figures.
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Lower bound on the divisor when computing an ETA.
pub const ETA_EPSILON: f64 = 1e-6;

/// Result of one byte sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Estimate {
    /// Transfer rate since the previous sample, in MB/s.
    pub speed_mbps: Option<f64>,
    /// Seconds remaining at the current rate.
    pub eta_sec: Option<f64>,
    /// `loaded / total` as a rounded percentage, when `total` is known.
    pub percent: Option<u8>,
}

/// Estimate speed, ETA and percentage from one sample.
///
/// `elapsed_secs <= 0` (or a non-finite value) leaves both speed and ETA
/// unset. A non-positive speed yields no ETA. Unknown or zero `total` leaves
/// the percentage unset.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn estimate(loaded: u64, total: u64, previous_loaded: u64, elapsed_secs: f64) -> Estimate {
    let speed_mbps = (elapsed_secs.is_finite() && elapsed_secs > 0.0)
        .then(|| (loaded.saturating_sub(previous_loaded) as f64 / BYTES_PER_MB) / elapsed_secs);

    let eta_sec = speed_mbps.filter(|s| *s > 0.0).map(|speed| {
        let remaining_mb = total.saturating_sub(loaded) as f64 / BYTES_PER_MB;
        remaining_mb / speed.max(ETA_EPSILON)
    });

    let percent = (total > 0).then(|| {
        let pct = (loaded as f64 / total as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    });

    Estimate {
        speed_mbps,
        eta_sec,
        percent,
    }
}

/// Per-task memory of the previous sample.
#[derive(Debug, Clone, Copy)]
pub struct SampleWindow {
    previous_loaded: u64,
    previous_at: Instant,
}

impl SampleWindow {
    /// Start a window at `started_at` with nothing loaded.
    #[must_use]
    pub const fn new(started_at: Instant) -> Self {
        Self {
            previous_loaded: 0,
            previous_at: started_at,
        }
    }

    /// Feed one sample observed at `now` and advance the window.
    pub fn observe(&mut self, loaded: u64, total: u64, now: Instant) -> Estimate {
        let elapsed = now
            .checked_duration_since(self.previous_at)
            .map_or(0.0, |d| d.as_secs_f64());
        let result = estimate(loaded, total, self.previous_loaded, elapsed);
        self.previous_loaded = loaded;
        self.previous_at = now;
        result
    }

    /// Restart the window (used between retry attempts).
    pub fn reset(&mut self, now: Instant) {
        self.previous_loaded = 0;
        self.previous_at = now;
    }
}
