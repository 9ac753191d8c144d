//! Client-side arithmetic of the measurement protocol.
//!
//! The server never computes these numbers itself; clients time the endpoints
//! and submit the results. Throughput is expressed in mebibits per second
//! (bits / 2^20), matching what the browser page reports.

// Copyright (c) 2025 Jak Bracegirdle
//
// This file is part of the speedscan crate.
//
// Licensed under the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <http://opensource.org/licenses/MIT>, at your option.
// This file may not be copied, modified, or distributed except according to those terms.

use std::time::Duration;

const BITS_PER_MEGABIT: f64 = 1024.0 * 1024.0;

/// Throughput in Mbps for `bytes` moved in `elapsed`.
///
/// A zero duration yields zero rather than infinity.
///
/// ```
/// # use std::time::Duration;
/// # use speedscan::measurement::throughput_mbps;
/// // 50 MiB in 4 seconds.
/// assert_eq!(throughput_mbps(50 * 1024 * 1024, Duration::from_secs(4)), 100.0);
/// ```
pub fn throughput_mbps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    (bytes as f64 * 8.0) / secs / BITS_PER_MEGABIT
}

/// Average round trip and jitter of a batch of pings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyStats {
    pub avg_ms: f64,
    /// Spread between the slowest and fastest sample.
    pub jitter_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl LatencyStats {
    /// Summarises round-trip samples; `None` for an empty batch.
    pub fn from_samples(samples: &[Duration]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let ms: Vec<f64> = samples.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        let min_ms = ms.iter().copied().fold(f64::INFINITY, f64::min);
        let max_ms = ms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg_ms = ms.iter().sum::<f64>() / ms.len() as f64;

        Some(Self {
            avg_ms,
            jitter_ms: max_ms - min_ms,
            min_ms,
            max_ms,
        })
    }
}

/// Percentage of `lost` probes out of `sent`; zero when nothing was sent.
pub fn loss_percent(lost: u32, sent: u32) -> f64 {
    if sent == 0 {
        return 0.0;
    }
    f64::from(lost) / f64::from(sent) * 100.0
}
