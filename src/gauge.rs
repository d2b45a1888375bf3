//! Gauge frame composition.
//!
//! A frame is built back to front:
//!
//! 1. Clear to black
//! 2. Background image at the origin
//! 3. The first [`fill_count`] overlay layers, in order, at the origin
//! 4. One integer text per tracked metric at its legend position
//!
//! The whole frame is redrawn every time. Layers are full-screen images with a
//! transparent key, so partial redraws would need per-layer dirty regions for
//! no visible gain at these frame rates.

use core::fmt::Write;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::text::Text;
use heapless::String;

use crate::assets::GaugeAssets;
use crate::colors::BLACK;
use crate::config::RPM_PER_LAYER;
use crate::metric::Metric;
use crate::styles::{TOP_LEFT, VALUE_STYLE};
use crate::telemetry::Snapshot;

/// Number of RPM bar layers to draw, capped at `max_layers`.
///
/// Every started block of 348 RPM lights one more layer, so idle (0 RPM)
/// already shows the first segment. Negative values light nothing.
pub fn fill_count(
    rpm: f64,
    max_layers: usize,
) -> usize {
    let rpm = if rpm.is_nan() { 0.0 } else { rpm };
    let layers = (rpm / RPM_PER_LAYER).floor() + 1.0;
    if layers <= 0.0 {
        return 0;
    }
    (layers as usize).min(max_layers)
}

/// Integer text for a value, truncated toward zero.
pub fn format_magnitude(value: f64) -> String<24> {
    let mut text = String::new();
    let whole = if value.is_finite() { value.trunc() as i64 } else { 0 };
    // i64::MIN is 20 chars, always fits
    let _ = write!(text, "{whole}");
    text
}

/// What a composed frame contained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSummary {
    pub layers: usize,
    pub texts: usize,
}

/// Draw one complete gauge frame for `snapshot` onto `target`.
pub fn compose_frame<D>(
    target: &mut D,
    assets: &GaugeAssets,
    snapshot: &Snapshot,
    metrics: &[Metric],
) -> Result<FrameSummary, D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    target.clear(BLACK)?;
    assets.background.draw_at(target, Point::zero())?;

    let fill = fill_count(snapshot.get(Metric::Rpm), assets.layer_count());
    for layer in &assets.layers[..fill] {
        layer.draw_at(target, Point::zero())?;
    }

    for &metric in metrics {
        let text = format_magnitude(snapshot.get(metric));
        Text::with_text_style(&text, metric.text_position(), VALUE_STYLE, TOP_LEFT).draw(target)?;
    }

    Ok(FrameSummary {
        layers: fill,
        texts: metrics.len(),
    })
}
