use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use image::{ImageReader, RgbaImage};
use tiny_skia::{Color, IntRect, IntSize, Pixmap, PremultipliedColorU8};
use tracing::{debug, warn};

use crate::glyphs;
use crate::scroll::tier::{TILE_HEIGHT, TILE_WIDTH};

pub const STARS: &str = "rep_stars.png";
pub const LOGO: &str = "rep_ik+_logo.png";
pub const SCROLL_RASTER: &str = "rep_ik+_rast1.png";
pub const BACK_RASTER: &str = "rep_ik+_rast2.png";
pub const FONT: &str = "rep_ik+_font0.png";

/// Largest edge accepted before an image is cropped or replaced.
pub const MAX_IMAGE_EDGE: u32 = 4096;

pub const STAR_TILE_WIDTH: u32 = 64;
pub const STAR_TILE_HEIGHT: u32 = 46;
pub const STAR_FRAMES: u32 = 10;

const PLACEHOLDER_EDGE: u32 = 100;

/// Source of decoded images by logical name.
pub trait ImageProvider {
    fn load(&self, name: &str) -> Result<Pixmap>;
}

/// PNG files under one directory.
#[derive(Debug, Clone)]
pub struct AssetDir {
    root: PathBuf,
}

impl AssetDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImageProvider for AssetDir {
    fn load(&self, name: &str) -> Result<Pixmap> {
        let path = self.root.join(name);
        let image = ImageReader::open(&path)
            .with_context(|| format!("failed to open asset {}", path.display()))?
            .with_guessed_format()
            .with_context(|| format!("failed to read asset {}", path.display()))?
            .decode()
            .with_context(|| format!("failed to decode asset {}", path.display()))?
            .into_rgba8();
        rgba_to_pixmap(image)
    }
}

/// Converts straight-alpha RGBA into a premultiplied pixmap.
pub fn rgba_to_pixmap(image: RgbaImage) -> Result<Pixmap> {
    let (width, height) = (image.width(), image.height());
    let size = IntSize::from_wh(width, height)
        .ok_or_else(|| anyhow!("image has an empty dimension ({}x{})", width, height))?;
    let mut data = image.into_raw();
    for pixel in data.chunks_exact_mut(4) {
        let alpha = u16::from(pixel[3]);
        for channel in &mut pixel[..3] {
            *channel = ((u16::from(*channel) * alpha + 127) / 255) as u8;
        }
    }
    Pixmap::from_vec(data, size).ok_or_else(|| anyhow!("invalid pixmap {}x{}", width, height))
}

/// Wraps a provider so every request yields a usable image.
#[derive(Debug, Clone)]
pub struct FallbackImages<P> {
    inner: P,
}

impl<P: ImageProvider> FallbackImages<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    /// Loads `name`, substituting a red placeholder on failure. Oversized
    /// fonts keep their top rows; other oversized images become gray.
    pub fn image(&self, name: &str) -> Pixmap {
        let pixmap = match self.inner.load(name) {
            Ok(pixmap) => pixmap,
            Err(error) => {
                warn!(asset = name, "asset unavailable, using placeholder: {error:#}");
                return solid(PLACEHOLDER_EDGE, PLACEHOLDER_EDGE, Color::from_rgba8(255, 0, 0, 255));
            }
        };

        let (width, height) = (pixmap.width(), pixmap.height());
        if width <= MAX_IMAGE_EDGE && height <= MAX_IMAGE_EDGE {
            debug!(asset = name, width, height, "loaded asset");
            return pixmap;
        }

        warn!(asset = name, width, height, "asset too large");
        let clamped_height = height.min(MAX_IMAGE_EDGE);
        if name.contains("font") {
            let cropped = IntRect::from_xywh(0, 0, width, clamped_height)
                .and_then(|rect| pixmap.clone_rect(rect));
            if let Some(cropped) = cropped {
                warn!(asset = name, width, height = clamped_height, "cropped font");
                return cropped;
            }
        }
        solid(
            width.min(MAX_IMAGE_EDGE),
            clamped_height,
            Color::from_rgba8(128, 128, 128, 255),
        )
    }
}

fn solid(width: u32, height: u32, color: Color) -> Pixmap {
    // sizes come from constants or an already decoded image, never zero
    let mut pixmap = Pixmap::new(width.max(1), height.max(1)).expect("non-zero placeholder size");
    pixmap.fill(color);
    pixmap
}

/// Procedurally drawn stand-ins for the intro's art, so it runs with no
/// files on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinArt;

impl ImageProvider for BuiltinArt {
    fn load(&self, name: &str) -> Result<Pixmap> {
        match name {
            FONT => font_strip(),
            SCROLL_RASTER => vertical_gradient(2, 200, &SCROLL_RASTER_STOPS),
            BACK_RASTER => vertical_gradient(1, 736, &BACK_RASTER_STOPS),
            STARS => star_sheet(),
            LOGO => logo(),
            other => bail!("no built-in art named '{}'", other),
        }
    }
}

const SCROLL_RASTER_STOPS: [[u8; 3]; 5] = [
    [255, 64, 0],
    [255, 224, 32],
    [64, 255, 96],
    [32, 128, 255],
    [255, 64, 0],
];

const BACK_RASTER_STOPS: [[u8; 3]; 3] = [[8, 0, 48], [96, 32, 160], [8, 0, 48]];

fn new_pixmap(width: u32, height: u32) -> Result<Pixmap> {
    Pixmap::new(width, height).ok_or_else(|| anyhow!("failed to allocate {}x{} pixmap", width, height))
}

fn put(pixmap: &mut Pixmap, x: u32, y: u32, rgb: [u8; 3]) {
    let width = pixmap.width();
    if x >= width || y >= pixmap.height() {
        return;
    }
    if let Some(color) = PremultipliedColorU8::from_rgba(rgb[0], rgb[1], rgb[2], 255) {
        pixmap.pixels_mut()[(y * width + x) as usize] = color;
    }
}

fn lerp_stops(stops: &[[u8; 3]], t: f64) -> [u8; 3] {
    let segments = (stops.len() - 1) as f64;
    let scaled = t.clamp(0.0, 1.0) * segments;
    let index = (scaled.floor() as usize).min(stops.len() - 2);
    let local = scaled - index as f64;
    let (a, b) = (stops[index], stops[index + 1]);
    std::array::from_fn(|c| (a[c] as f64 + (b[c] as f64 - a[c] as f64) * local).round() as u8)
}

/// Copper-style bands: the gradient repeats every 36 rows.
fn vertical_gradient(width: u32, height: u32, stops: &[[u8; 3]]) -> Result<Pixmap> {
    const BAND: u32 = 36;
    let mut pixmap = new_pixmap(width, height)?;
    for y in 0..height {
        let t = if height <= BAND {
            y as f64 / height as f64
        } else {
            (y % BAND) as f64 / BAND as f64
        };
        let rgb = lerp_stops(stops, t);
        for x in 0..width {
            put(&mut pixmap, x, y, rgb);
        }
    }
    Ok(pixmap)
}

/// Vertical strip of 40x32 tiles, one per character from `' '` to `'Z'`.
fn font_strip() -> Result<Pixmap> {
    let count = glyphs::GLYPH_COUNT as u32;
    let mut pixmap = new_pixmap(TILE_WIDTH, TILE_HEIGHT * count)?;
    let cell_w = TILE_WIDTH / glyphs::GLYPH_SIZE;
    let cell_h = TILE_HEIGHT / glyphs::GLYPH_SIZE;

    for id in 0..count {
        let character = glyphs::FIRST_GLYPH + id as u8;
        for y in 0..TILE_HEIGHT {
            for x in 0..TILE_WIDTH {
                if glyphs::sample(character, x / cell_w, y / cell_h) {
                    put(&mut pixmap, x, id * TILE_HEIGHT + y, [255, 255, 255]);
                }
            }
        }
    }
    Ok(pixmap)
}

/// One row of twinkle frames that grow then shrink.
fn star_sheet() -> Result<Pixmap> {
    const ARMS: [u32; STAR_FRAMES as usize] = [1, 3, 5, 8, 11, 14, 11, 8, 5, 3];
    let mut pixmap = new_pixmap(STAR_TILE_WIDTH * STAR_FRAMES, STAR_TILE_HEIGHT)?;
    let (cx, cy) = (STAR_TILE_WIDTH / 2, STAR_TILE_HEIGHT / 2);

    for (frame, arm) in ARMS.iter().copied().enumerate() {
        let left = frame as u32 * STAR_TILE_WIDTH;
        for d in 0..=arm {
            let fade = 255 - (d * 200 / arm.max(1)) as u8;
            let rgb = [fade, fade, 255];
            put(&mut pixmap, left + cx + d, cy, rgb);
            put(&mut pixmap, left + cx - d.min(cx), cy, rgb);
            put(&mut pixmap, left + cx, cy + d.min(STAR_TILE_HEIGHT - cy - 1), rgb);
            put(&mut pixmap, left + cx, cy - d.min(cy), rgb);
        }
    }
    Ok(pixmap)
}

/// "IK+" set in the built-in font at 16x with a warm gradient.
fn logo() -> Result<Pixmap> {
    const TEXT: &[u8] = b"IK+";
    const SCALE: u32 = 16;
    let glyph_px = glyphs::GLYPH_SIZE * SCALE;
    let mut pixmap = new_pixmap(glyph_px * TEXT.len() as u32, glyph_px)?;

    for (slot, &character) in TEXT.iter().enumerate() {
        for y in 0..glyph_px {
            let rgb = lerp_stops(&[[255, 240, 96], [224, 64, 0]], y as f64 / glyph_px as f64);
            for x in 0..glyph_px {
                if glyphs::sample(character, x / SCALE, y / SCALE) {
                    put(&mut pixmap, slot as u32 * glyph_px + x, y, rgb);
                }
            }
        }
    }
    Ok(pixmap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeProvider {
        images: HashMap<&'static str, (u32, u32)>,
    }

    impl ImageProvider for FakeProvider {
        fn load(&self, name: &str) -> Result<Pixmap> {
            let (width, height) = self
                .images
                .get(name)
                .copied()
                .ok_or_else(|| anyhow!("missing {}", name))?;
            let mut pixmap = new_pixmap(width, height)?;
            pixmap.fill(Color::WHITE);
            Ok(pixmap)
        }
    }

    fn color_at(pixmap: &Pixmap, x: u32, y: u32) -> (u8, u8, u8, u8) {
        let pixel = pixmap.pixel(x, y).expect("pixel in bounds");
        (pixel.red(), pixel.green(), pixel.blue(), pixel.alpha())
    }

    #[test]
    fn missing_asset_becomes_red_placeholder() {
        let images = FallbackImages::new(FakeProvider::default());
        let pixmap = images.image(LOGO);
        assert_eq!((pixmap.width(), pixmap.height()), (100, 100));
        assert_eq!(color_at(&pixmap, 50, 50), (255, 0, 0, 255));
    }

    #[test]
    fn oversized_font_is_cropped_to_top_rows() {
        let mut provider = FakeProvider::default();
        provider.images.insert(FONT, (40, 5000));
        let pixmap = FallbackImages::new(provider).image(FONT);
        assert_eq!((pixmap.width(), pixmap.height()), (40, MAX_IMAGE_EDGE));
        assert_eq!(color_at(&pixmap, 0, 0), (255, 255, 255, 255));
    }

    #[test]
    fn oversized_art_becomes_gray() {
        let mut provider = FakeProvider::default();
        provider.images.insert(BACK_RASTER, (5000, 20));
        let pixmap = FallbackImages::new(provider).image(BACK_RASTER);
        assert_eq!((pixmap.width(), pixmap.height()), (MAX_IMAGE_EDGE, 20));
        assert_eq!(color_at(&pixmap, 10, 10), (128, 128, 128, 255));
    }

    #[test]
    fn builtin_art_covers_every_asset() {
        let art = BuiltinArt;
        for name in [STARS, LOGO, SCROLL_RASTER, BACK_RASTER, FONT] {
            art.load(name).expect("builtin art should exist");
        }
        assert!(art.load("nope.png").is_err());

        let font = art.load(FONT).expect("font");
        assert_eq!(font.width(), TILE_WIDTH);
        assert_eq!(font.height(), TILE_HEIGHT * glyphs::GLYPH_COUNT as u32);
    }

    #[test]
    fn builtin_back_raster_is_tall_enough_for_every_band() {
        let raster = BuiltinArt.load(BACK_RASTER).expect("raster");
        // largest sample: scroll 652 plus 10 bands of 4 plus a 36-row band
        assert!(raster.height() >= 652 + 40 + 36);
    }

    #[test]
    fn asset_dir_decodes_png_and_premultiplies() {
        let dir = tempdir().expect("tempdir should create");
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, image::Rgba([200, 100, 50, 255]));
        image.put_pixel(1, 0, image::Rgba([200, 100, 50, 0]));
        image.save(dir.path().join(LOGO)).expect("png should write");

        let pixmap = AssetDir::new(dir.path()).load(LOGO).expect("decode");
        assert_eq!(color_at(&pixmap, 0, 0), (200, 100, 50, 255));
        assert_eq!(color_at(&pixmap, 1, 0), (0, 0, 0, 0));
    }

    #[test]
    fn asset_dir_reports_missing_files() {
        let dir = tempdir().expect("tempdir should create");
        let error = AssetDir::new(dir.path()).load(STARS).expect_err("missing file");
        assert!(format!("{error:#}").contains("failed to open asset"));
    }
}
