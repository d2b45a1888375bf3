//! Shared telemetry state between acquisition and render.
//!
//! One writer role (acquisition) and one reader role (render) share a table of
//! metric cells. Each cell stores the `f64` bit pattern in an [`AtomicU64`], so
//! a reader always sees a whole value that some writer stored, never a mix of
//! two. There is deliberately nothing stronger: a [`Snapshot`] loads each cell
//! on its own, so RPM and coolant temperature in the same frame may come from
//! different moments. For a dashboard that is fine.
//!
//! The state is created once, wrapped in an `Arc`, and handed to both sides.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::metric::Metric;

/// A single metric cell.
struct Cell {
    /// `f64::to_bits` of the latest magnitude.
    bits: AtomicU64,
    /// Milliseconds since state creation at the last publish, plus one. Zero means never.
    stamp_ms: AtomicU64,
    /// Number of successful publishes.
    updates: AtomicU64,
}

impl Cell {
    const fn new() -> Self {
        Self {
            bits: AtomicU64::new(0),
            stamp_ms: AtomicU64::new(0),
            updates: AtomicU64::new(0),
        }
    }
}

/// Latest magnitude of one metric with its age.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    pub metric: Metric,
    pub value: f64,
    /// Time since the last publish, `None` while the metric still holds its initial zero.
    pub age: Option<Duration>,
}

/// Values of every metric, each loaded independently.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Snapshot {
    values: [f64; Metric::COUNT],
}

impl Snapshot {
    /// Snapshot with explicit values, mostly for rendering tests.
    pub fn from_values(values: &[(Metric, f64)]) -> Self {
        let mut snapshot = Self::default();
        for &(metric, value) in values {
            snapshot.values[metric.index()] = value;
        }
        snapshot
    }

    #[inline]
    pub const fn get(
        &self,
        metric: Metric,
    ) -> f64 {
        self.values[metric.index()]
    }
}

/// Lock-free per-metric store shared by acquisition and render.
pub struct TelemetryState {
    cells: [Cell; Metric::COUNT],
    epoch: Instant,
}

impl TelemetryState {
    /// Every metric starts at zero.
    pub fn new() -> Self {
        Self {
            cells: [const { Cell::new() }; Metric::COUNT],
            epoch: Instant::now(),
        }
    }

    /// Overwrite one metric with a fresh sample.
    pub fn publish(
        &self,
        metric: Metric,
        value: f64,
    ) {
        let cell = &self.cells[metric.index()];
        let stamp = self.epoch.elapsed().as_millis() as u64 + 1;
        cell.bits.store(value.to_bits(), Ordering::Release);
        cell.stamp_ms.store(stamp, Ordering::Release);
        cell.updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Latest magnitude of one metric.
    #[inline]
    pub fn value(
        &self,
        metric: Metric,
    ) -> f64 {
        f64::from_bits(self.cells[metric.index()].bits.load(Ordering::Acquire))
    }

    /// Latest magnitude plus how long ago it was published.
    pub fn reading(
        &self,
        metric: Metric,
    ) -> Reading {
        let cell = &self.cells[metric.index()];
        let value = f64::from_bits(cell.bits.load(Ordering::Acquire));
        let stamp = cell.stamp_ms.load(Ordering::Acquire);
        let age = (stamp != 0).then(|| {
            let published = Duration::from_millis(stamp - 1);
            self.epoch.elapsed().saturating_sub(published)
        });
        Reading { metric, value, age }
    }

    /// Load every metric. No consistency across metrics is implied.
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for metric in Metric::ALL {
            snapshot.values[metric.index()] = self.value(metric);
        }
        snapshot
    }

    /// How many times a metric has been published.
    #[inline]
    pub fn update_count(
        &self,
        metric: Metric,
    ) -> u64 {
        self.cells[metric.index()].updates.load(Ordering::Relaxed)
    }
}

impl Default for TelemetryState {
    fn default() -> Self { Self::new() }
}
