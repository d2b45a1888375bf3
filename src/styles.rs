//! Pre-computed text styles.
//!
//! `MonoTextStyle::new` and `TextStyleBuilder::build` are const fn in
//! embedded-graphics 0.8, so the styles below are built at compile time instead
//! of once per value per frame.

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::text::{Alignment, Baseline, TextStyle, TextStyleBuilder};
use profont::PROFONT_24_POINT;

use crate::colors::WHITE;

/// Large white text for metric values (`ProFont` 24pt).
pub const VALUE_STYLE: MonoTextStyle<'static, Rgb565> = MonoTextStyle::new(&PROFONT_24_POINT, WHITE);

/// Values are anchored at their top-left corner, matching the legend coordinates.
pub const TOP_LEFT: TextStyle = TextStyleBuilder::new()
    .alignment(Alignment::Left)
    .baseline(Baseline::Top)
    .build();
