//! Gauge image set.
//!
//! The panel artwork is one full-screen background plus 25 full-screen overlay
//! layers, each adding one more segment of the RPM bar. Everything is loaded
//! once at startup and decoded into owned pixel lists, so drawing a frame never
//! touches the filesystem or re-parses a BMP.
//!
//! Files are looked up in the asset directory:
//!
//! ```text
//! images/
//! ├── GAUGE_BG.bmp
//! ├── RECTANGLE_1.bmp
//! ├── ...
//! └── RECTANGLE_25.bmp
//! ```
//!
//! # Preparing the Artwork
//!
//! BMP has no alpha channel, so overlay layers mark see-through pixels with
//! pure magenta ([`TRANSPARENT_KEY`]) instead. Layer artwork drawn as PNG with
//! per-pixel alpha has to be converted once before use:
//!
//! - alpha is thresholded: pixels at least half opaque keep their color, the
//!   rest become `#FF00FF`
//! - the result is saved as an uncompressed 24-bit BMP
//!
//! With ImageMagick:
//!
//! ```text
//! magick RECTANGLE_1.png -channel A -threshold 50% +channel \
//!     -background "#FF00FF" -flatten -type TrueColor BMP3:RECTANGLE_1.bmp
//! ```
//!
//! Soft (partially transparent) edges do not survive the conversion; every
//! layer pixel is either fully drawn or skipped. The background is opaque and
//! converts without the key.

use std::fs;
use std::path::Path;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PointsIter, Rectangle};
use tinybmp::Bmp;
use tracing::{debug, info};

use crate::colors::TRANSPARENT_KEY;
use crate::config::LAYER_COUNT;
use crate::error::AssetError;

/// A decoded image: the pixels to draw, relative to its top-left corner.
#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    size: Size,
    pixels: Vec<Pixel<Rgb565>>,
}

impl Sprite {
    /// Decode a BMP. Pixels equal to `transparent` are dropped.
    pub fn from_bmp(
        data: &[u8],
        transparent: Option<Rgb565>,
    ) -> Result<Self, String> {
        let bmp = Bmp::<Rgb565>::from_slice(data).map_err(|e| format!("{e:?}"))?;
        let pixels = bmp
            .pixels()
            .filter(|Pixel(_, color)| Some(*color) != transparent)
            .collect();
        Ok(Self {
            size: bmp.size(),
            pixels,
        })
    }

    /// A filled rectangle, mostly for headless rendering.
    pub fn solid(
        area: Rectangle,
        color: Rgb565,
    ) -> Self {
        Self {
            size: area.size,
            pixels: area.points().map(|p| Pixel(p - area.top_left, color)).collect(),
        }
    }

    /// Fully transparent sprite of the given size.
    pub const fn empty(size: Size) -> Self {
        Self {
            size,
            pixels: Vec::new(),
        }
    }

    #[inline]
    pub const fn size(&self) -> Size { self.size }

    /// Number of opaque pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize { self.pixels.len() }

    /// Draw with the sprite's top-left corner at `offset`.
    pub fn draw_at<D>(
        &self,
        target: &mut D,
        offset: Point,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        target.draw_iter(self.pixels.iter().map(|Pixel(p, c)| Pixel(*p + offset, *c)))
    }
}

/// Background and ordered overlay layers.
#[derive(Clone, Debug)]
pub struct GaugeAssets {
    pub background: Sprite,
    /// Layer `i` is the `i + 1`-th bar segment.
    pub layers: Vec<Sprite>,
}

impl GaugeAssets {
    pub const fn new(
        background: Sprite,
        layers: Vec<Sprite>,
    ) -> Self {
        Self { background, layers }
    }

    /// Load `GAUGE_BG.bmp` and `RECTANGLE_1.bmp` ..= `RECTANGLE_25.bmp` from `dir`.
    pub fn load(dir: &Path) -> Result<Self, AssetError> {
        let background = load_sprite(&dir.join("GAUGE_BG.bmp"), None)?;
        let layers = (1..=LAYER_COUNT)
            .map(|i| load_sprite(&dir.join(format!("RECTANGLE_{i}.bmp")), Some(TRANSPARENT_KEY)))
            .collect::<Result<Vec<_>, _>>()?;

        info!(dir = %dir.display(), layers = layers.len(), "Loaded gauge assets");
        Ok(Self { background, layers })
    }

    #[inline]
    pub fn layer_count(&self) -> usize { self.layers.len() }
}

fn load_sprite(
    path: &Path,
    transparent: Option<Rgb565>,
) -> Result<Sprite, AssetError> {
    let data = fs::read(path).map_err(|source| AssetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let sprite = Sprite::from_bmp(&data, transparent).map_err(|reason| AssetError::Decode {
        path: path.to_path_buf(),
        reason,
    })?;
    debug!(path = %path.display(), size = ?sprite.size(), pixels = sprite.pixel_count(), "Decoded sprite");
    Ok(sprite)
}

#[cfg(test)]
mod tests {
    use embedded_graphics_simulator::SimulatorDisplay;

    use super::*;
    use crate::colors::{BLACK, WHITE};

    /// Minimal 24-bit bottom-up BMP, `width` × `height`, rows given top to bottom.
    fn bmp_24(
        width: u32,
        height: u32,
        rows: &[&[[u8; 3]]],
    ) -> Vec<u8> {
        let row_size = (width * 3).div_ceil(4) * 4;
        let image_size = row_size * height;
        let mut data = Vec::new();
        data.extend_from_slice(b"BM");
        data.extend_from_slice(&(54 + image_size).to_le_bytes());
        data.extend_from_slice(&[0; 4]);
        data.extend_from_slice(&54u32.to_le_bytes());
        data.extend_from_slice(&40u32.to_le_bytes());
        data.extend_from_slice(&(width as i32).to_le_bytes());
        data.extend_from_slice(&(height as i32).to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&24u16.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&image_size.to_le_bytes());
        data.extend_from_slice(&[0; 16]);
        for row in rows.iter().rev() {
            let mut written = 0;
            for [r, g, b] in row.iter() {
                data.extend_from_slice(&[*b, *g, *r]);
                written += 3;
            }
            data.extend(std::iter::repeat_n(0u8, (row_size - written) as usize));
        }
        data
    }

    #[test]
    fn test_from_bmp_decodes_pixels() {
        let white = [255, 255, 255];
        let black = [0, 0, 0];
        let data = bmp_24(2, 2, &[&[white, black], &[black, white]]);
        let sprite = Sprite::from_bmp(&data, None).unwrap();

        assert_eq!(sprite.size(), Size::new(2, 2));
        assert_eq!(sprite.pixel_count(), 4);
    }

    #[test]
    fn test_from_bmp_drops_transparent_key() {
        let magenta = [255, 0, 255];
        let white = [255, 255, 255];
        let data = bmp_24(3, 1, &[&[magenta, white, magenta]]);
        let sprite = Sprite::from_bmp(&data, Some(TRANSPARENT_KEY)).unwrap();

        assert_eq!(sprite.size(), Size::new(3, 1), "Size keeps the full image");
        assert_eq!(sprite.pixel_count(), 1, "Only the white pixel is opaque");
    }

    #[test]
    fn test_keyed_layer_leaves_background_visible() {
        let magenta = [255, 0, 255];
        let red = [255, 0, 0];
        let layer = Sprite::from_bmp(&bmp_24(2, 1, &[&[red, magenta]]), Some(TRANSPARENT_KEY)).unwrap();
        let mut display: SimulatorDisplay<Rgb565> = SimulatorDisplay::new(Size::new(2, 1));
        display.clear(WHITE).ok();

        layer.draw_at(&mut display, Point::zero()).unwrap();

        assert_eq!(display.get_pixel(Point::new(0, 0)), Rgb565::RED);
        assert_eq!(display.get_pixel(Point::new(1, 0)), WHITE, "Keyed pixel is not drawn");
    }

    #[test]
    fn test_from_bmp_rejects_garbage() {
        assert!(Sprite::from_bmp(b"not a bitmap", None).is_err());
    }

    #[test]
    fn test_draw_at_offsets_pixels() {
        let sprite = Sprite::solid(Rectangle::new(Point::new(5, 5), Size::new(2, 2)), WHITE);
        let mut display: SimulatorDisplay<Rgb565> = SimulatorDisplay::new(Size::new(10, 10));
        display.clear(BLACK).ok();

        sprite.draw_at(&mut display, Point::new(3, 4)).unwrap();

        assert_eq!(display.get_pixel(Point::new(3, 4)), WHITE);
        assert_eq!(display.get_pixel(Point::new(4, 5)), WHITE);
        assert_eq!(display.get_pixel(Point::new(5, 5)), BLACK, "Solid area is relative to the sprite");
    }

    #[test]
    fn test_empty_sprite_draws_nothing() {
        let sprite = Sprite::empty(Size::new(4, 4));
        let mut display: SimulatorDisplay<Rgb565> = SimulatorDisplay::new(Size::new(4, 4));
        display.clear(BLACK).ok();
        sprite.draw_at(&mut display, Point::zero()).unwrap();

        assert_eq!(sprite.pixel_count(), 0);
        assert_eq!(display.get_pixel(Point::new(1, 1)), BLACK);
    }

    #[test]
    fn test_load_missing_directory_fails() {
        let err = GaugeAssets::load(Path::new("/nonexistent/gauge-assets")).unwrap_err();
        assert!(matches!(err, AssetError::Read { .. }), "Missing background is a read error");
    }
}
