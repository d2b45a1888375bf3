//! Randomized telemetry source.
//!
//! Each metric does a bounded random walk inside a realistic range, so the
//! gauge moves like a car being driven rather than jumping between unrelated
//! values. A configurable dropout probability makes some queries return no
//! reading, which exercises the "keep the previous value" path.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::TelemetrySource;
use crate::metric::Metric;

/// Walk parameters for one metric: (min, max, start, max step per query).
const fn walk(metric: Metric) -> (f64, f64, f64, f64) {
    match metric {
        Metric::Rpm => (0.0, 8700.0, 850.0, 150.0),
        Metric::Speed => (0.0, 260.0, 0.0, 2.0),
        Metric::OilPressure => (0.0, 100.0, 40.0, 1.5),
        Metric::OilTemperature => (60.0, 130.0, 90.0, 0.5),
        Metric::CoolantTemperature => (60.0, 110.0, 85.0, 0.5),
    }
}

/// Simulated vehicle producing random but continuous readings.
pub struct SimulatedSource {
    rng: StdRng,
    values: [f64; Metric::COUNT],
    dropout: f64,
    speed: Option<u32>,
    connected: bool,
}

impl SimulatedSource {
    pub fn new() -> Self { Self::with_rng(StdRng::from_entropy()) }

    /// Deterministic sequence for tests.
    pub fn seeded(seed: u64) -> Self { Self::with_rng(StdRng::seed_from_u64(seed)) }

    fn with_rng(rng: StdRng) -> Self {
        let mut values = [0.0; Metric::COUNT];
        for metric in Metric::ALL {
            values[metric.index()] = walk(metric).2;
        }
        Self {
            rng,
            values,
            dropout: 0.0,
            speed: None,
            connected: true,
        }
    }

    /// Probability in `0.0..=1.0` that a query yields no reading.
    pub fn with_dropout(
        mut self,
        dropout: f64,
    ) -> Self {
        self.dropout = if dropout.is_nan() { 0.0 } else { dropout.clamp(0.0, 1.0) };
        self
    }

    pub fn with_speed(
        mut self,
        speed: Option<u32>,
    ) -> Self {
        self.speed = speed;
        self
    }
}

impl Default for SimulatedSource {
    fn default() -> Self { Self::new() }
}

impl TelemetrySource for SimulatedSource {
    fn query(
        &mut self,
        metric: Metric,
    ) -> Option<f64> {
        if !self.connected {
            return None;
        }
        if self.dropout > 0.0 && self.rng.gen_bool(self.dropout) {
            return None;
        }

        let (min, max, _, step) = walk(metric);
        let slot = &mut self.values[metric.index()];
        *slot = (*slot + self.rng.gen_range(-step..=step)).clamp(min, max);
        Some(*slot)
    }

    fn close(&mut self) { self.connected = false; }

    fn is_connected(&self) -> bool { self.connected }

    fn speed(&self) -> Option<u32> { self.speed }
}
