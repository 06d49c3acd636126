//! # Latency Harness
//!
//! Append-only series of elapsed-time samples (seconds) with summary
//! statistics. Two independent harnesses exist per run:
//!
//! - [`HarnessKind::Publish`]: start of encode+publish until the transport
//!   acknowledges delivery
//! - [`HarnessKind::Receive`]: transport arrival time minus the timestamp
//!   embedded in the record
//!
//! Receive-side samples compare two wall clocks and may be negative when
//! they are not synchronized. Samples are stored and summarized as-is.
//!
//! The sample vector is behind a `parking_lot::Mutex` so a harness can be
//! shared with a transport callback thread through an `Arc`.

use std::fmt;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::info;

use crate::error::HarnessError;

/// Which leg of the pipeline a harness measures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessKind {
    Publish,
    Receive,
}

impl HarnessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HarnessKind::Publish => "publish",
            HarnessKind::Receive => "receive",
        }
    }
}

impl fmt::Display for HarnessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a harness's samples, all values in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct LatencySummary {
    pub count: usize,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl LatencySummary {
    fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let count = samples.len();
        let total: f64 = samples.iter().sum();
        let average = total / count as f64;

        let mut sorted = samples.to_vec();
        sorted.sort_unstable_by(f64::total_cmp);

        let percentile = |p: usize| sorted[((count - 1) * p) / 100];

        Some(Self {
            count,
            average,
            min: sorted[0],
            max: sorted[count - 1],
            p50: percentile(50),
            p95: percentile(95),
            p99: percentile(99),
        })
    }
}

/// Accumulates latency samples for one leg of the pipeline
#[derive(Debug)]
pub struct LatencyHarness {
    kind: HarnessKind,
    samples: Mutex<Vec<f64>>,
}

impl LatencyHarness {
    pub fn new(kind: HarnessKind) -> Self {
        Self {
            kind,
            samples: Mutex::new(Vec::new()),
        }
    }

    pub fn publish() -> Self {
        Self::new(HarnessKind::Publish)
    }

    pub fn receive() -> Self {
        Self::new(HarnessKind::Receive)
    }

    pub fn kind(&self) -> HarnessKind {
        self.kind
    }

    /// Append one sample in seconds
    pub fn record(&self, sample: f64) {
        self.samples.lock().push(sample);
    }

    /// Append the time elapsed since `start`
    pub fn record_since(&self, start: Instant) -> f64 {
        let sample = start.elapsed().as_secs_f64();
        self.record(sample);
        sample
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    /// Copy of the samples in recording order
    pub fn samples(&self) -> Vec<f64> {
        self.samples.lock().clone()
    }

    /// Count, average and spread of the recorded samples
    ///
    /// Fails with [`HarnessError::NoSamples`] instead of returning NaN when
    /// nothing has been recorded.
    pub fn summary(&self) -> Result<LatencySummary, HarnessError> {
        let samples = self.samples.lock();
        LatencySummary::from_samples(&samples).ok_or_else(|| HarnessError::NoSamples {
            label: self.kind.as_str().to_string(),
        })
    }

    /// Log the summary at info level
    pub fn log_report(&self) {
        match self.summary() {
            Ok(summary) => info!(
                harness = self.kind.as_str(),
                count = summary.count,
                average_ms = summary.average * 1000.0,
                min_ms = summary.min * 1000.0,
                max_ms = summary.max * 1000.0,
                p50_ms = summary.p50 * 1000.0,
                p95_ms = summary.p95 * 1000.0,
                p99_ms = summary.p99 * 1000.0,
                "{} latency: {} samples, average {:.3} ms",
                self.kind,
                summary.count,
                summary.average * 1000.0
            ),
            Err(err) => info!(harness = self.kind.as_str(), "{}", err),
        }
    }
}
