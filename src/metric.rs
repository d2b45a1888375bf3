//! Vehicle metrics shown on the panel.
//!
//! Each metric has a fixed slot in [`TelemetryState`](crate::telemetry::TelemetryState)
//! and a fixed text position on the gauge background. The positions are part of
//! the artwork: the background image leaves a hole for each value at exactly
//! these coordinates.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                                    RPM       │  (620, 90)
//! │                                              │
//! │ OIL T (40, 257)                 OIL P        │  (670, 250)
//! │                    SPEED                     │  (300, 330)
//! │ COOL  (40, 350)                              │
//! └──────────────────────────────────────────────┘
//! ```

use core::fmt;

use embedded_graphics::prelude::Point;

/// A single named vehicle measurement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Rpm,
    Speed,
    OilPressure,
    OilTemperature,
    CoolantTemperature,
}

impl Metric {
    /// Every metric, in slot order.
    pub const ALL: [Self; 5] = [
        Self::Rpm,
        Self::Speed,
        Self::OilPressure,
        Self::OilTemperature,
        Self::CoolantTemperature,
    ];

    /// Number of metrics (size of the telemetry slot table).
    pub const COUNT: usize = Self::ALL.len();

    /// Slot index into per-metric tables.
    #[inline]
    pub const fn index(self) -> usize { self as usize }

    /// Short lowercase name used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rpm => "rpm",
            Self::Speed => "speed",
            Self::OilPressure => "oil_pressure",
            Self::OilTemperature => "oil_temperature",
            Self::CoolantTemperature => "coolant_temperature",
        }
    }

    /// Top-left corner of this metric's value text.
    pub const fn text_position(self) -> Point {
        match self {
            Self::Rpm => Point::new(620, 90),
            Self::Speed => Point::new(300, 330),
            Self::OilPressure => Point::new(670, 250),
            Self::OilTemperature => Point::new(40, 257),
            Self::CoolantTemperature => Point::new(40, 350),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_indices_match_order() {
        for (i, metric) in Metric::ALL.iter().enumerate() {
            assert_eq!(metric.index(), i, "{metric} should live in slot {i}");
        }
        assert_eq!(Metric::COUNT, 5);
    }

    #[test]
    fn test_text_positions_match_legend() {
        assert_eq!(Metric::Rpm.text_position(), Point::new(620, 90));
        assert_eq!(Metric::Speed.text_position(), Point::new(300, 330));
        assert_eq!(Metric::OilPressure.text_position(), Point::new(670, 250));
        assert_eq!(Metric::OilTemperature.text_position(), Point::new(40, 257));
        assert_eq!(Metric::CoolantTemperature.text_position(), Point::new(40, 350));
    }

    #[test]
    fn test_text_positions_are_distinct() {
        for a in Metric::ALL {
            for b in Metric::ALL {
                if a != b {
                    assert_ne!(a.text_position(), b.text_position(), "{a} and {b} overlap");
                }
            }
        }
    }

    #[test]
    fn test_display_uses_name() {
        assert_eq!(Metric::CoolantTemperature.to_string(), "coolant_temperature");
    }
}
