//! Color constants for the gauge panel.
//!
//! The panel works in `Rgb565`, the native format of the simulator display and of
//! the small SPI panels this layout is meant for. Built-in `RgbColor` constants are
//! used wherever one exists.

use embedded_graphics::pixelcolor::{Rgb565, RgbColor};

/// Frame clear color behind the gauge background.
pub const BLACK: Rgb565 = Rgb565::BLACK;

/// Value text color.
pub const WHITE: Rgb565 = Rgb565::WHITE;

/// Key color for overlay layers. BMP has no alpha channel, so layer pixels in
/// pure magenta (31, 0, 31) are skipped when the layer is drawn.
pub const TRANSPARENT_KEY: Rgb565 = Rgb565::MAGENTA;
