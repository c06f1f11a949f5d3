//! Frame painter: raster bars, the masked scroller, logo and stars.

use anyhow::{anyhow, Result};
use tiny_skia::{
    BlendMode, Color, FilterQuality, IntRect, Paint, Pattern, Pixmap, PixmapPaint, Rect,
    SpreadMode, Transform,
};

use crate::assets::{self, FallbackImages, ImageProvider, STAR_TILE_HEIGHT, STAR_TILE_WIDTH};
use crate::effects::Effects;
use crate::scroll::animator::GlyphSheet;
use crate::scroll::tier::{Tier, CANVAS_WIDTH, TILE_HEIGHT, TILE_WIDTH};

pub const SCREEN_WIDTH: u32 = 768;
pub const SCREEN_HEIGHT: u32 = 540;

/// Top-left of the 640x400 scroll window on screen.
pub const WINDOW_X: i32 = 64;
pub const WINDOW_Y: i32 = 60;
pub const WINDOW_HEIGHT: u32 = 400;

const LOGO_Y: i32 = WINDOW_Y + 36;
const BACK_BANDS: i32 = 11;
const BACK_BAND_HEIGHT: u32 = 36;
const BACK_BAND_STEP: i32 = 4;
const SCROLL_RASTER_HEIGHT: i32 = 200;
const MASK_SHIFT: i32 = 2;

/// Decoded art, with the font already cut into tiles.
pub struct Art {
    pub stars: Pixmap,
    pub logo: Pixmap,
    pub scroll_raster: Pixmap,
    pub back_raster: Pixmap,
    pub glyphs: GlyphSheet,
}

impl Art {
    pub fn load<P: ImageProvider>(images: &FallbackImages<P>) -> Self {
        let font = images.image(assets::FONT);
        Self {
            stars: images.image(assets::STARS),
            logo: images.image(assets::LOGO),
            scroll_raster: images.image(assets::SCROLL_RASTER),
            back_raster: images.image(assets::BACK_RASTER),
            glyphs: GlyphSheet::from_strip(&font, TILE_WIDTH, TILE_HEIGHT),
        }
    }
}

/// Offscreen targets reused every frame.
pub struct Canvases {
    pub tiers: [Pixmap; 4],
    merge: Pixmap,
    off_scroll: Pixmap,
}

impl Canvases {
    pub fn new() -> Result<Self> {
        let window = || {
            Pixmap::new(CANVAS_WIDTH, WINDOW_HEIGHT)
                .ok_or_else(|| anyhow!("failed to allocate scroll window"))
        };
        let tier_canvas = |tier: Tier| {
            let geometry = tier.geometry();
            Pixmap::new(geometry.canvas_width, geometry.canvas_height)
                .ok_or_else(|| anyhow!("failed to allocate {} tier canvas", tier))
        };
        Ok(Self {
            tiers: [
                tier_canvas(Tier::Small)?,
                tier_canvas(Tier::Normal)?,
                tier_canvas(Tier::Medium)?,
                tier_canvas(Tier::Big)?,
            ],
            merge: window()?,
            off_scroll: window()?,
        })
    }

    pub fn tier(&self, tier: Tier) -> &Pixmap {
        &self.tiers[tier.index()]
    }
}

/// Paints one frame onto `screen`. Tier canvases must already hold the
/// current scroll text.
pub fn compose(
    screen: &mut Pixmap,
    art: &Art,
    canvases: &mut Canvases,
    effects: &Effects,
    active: Tier,
) {
    screen.fill(Color::BLACK);

    let back_y = effects.back_raster_y() as i32;
    for band in 0..BACK_BANDS {
        tile_strip(
            screen,
            &art.back_raster,
            IntRect::from_xywh(0, back_y + band * BACK_BAND_STEP, 1, BACK_BAND_HEIGHT),
            (0, WINDOW_Y + 2 + band * BACK_BAND_HEIGHT as i32),
            SCREEN_WIDTH,
        );
    }

    // the scroll raster, masked by the text
    canvases.merge.fill(Color::TRANSPARENT);
    let raster_y = effects.scroll_raster_y() as i32;
    for shift in [-SCROLL_RASTER_HEIGHT, 0, SCROLL_RASTER_HEIGHT] {
        tile_strip(
            &mut canvases.merge,
            &art.scroll_raster,
            IntRect::from_xywh(0, 0, 2, SCROLL_RASTER_HEIGHT as u32),
            (0, raster_y + shift),
            CANVAS_WIDTH,
        );
    }

    canvases.off_scroll.fill(Color::TRANSPARENT);
    let lane = &canvases.tiers[active.index()];
    for &row in active.stamp_rows() {
        canvases.off_scroll.draw_pixmap(
            0,
            row,
            lane.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }

    let mask_paint = PixmapPaint {
        blend_mode: BlendMode::DestinationIn,
        ..PixmapPaint::default()
    };
    canvases.merge.draw_pixmap(
        0,
        MASK_SHIFT,
        canvases.off_scroll.as_ref(),
        &mask_paint,
        Transform::identity(),
        None,
    );
    clear_rows(&mut canvases.merge, 0, MASK_SHIFT as u32);

    screen.draw_pixmap(
        WINDOW_X,
        WINDOW_Y,
        canvases.merge.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    screen.draw_pixmap(
        WINDOW_X,
        LOGO_Y,
        art.logo.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );

    for star in effects.stars() {
        draw_tile(
            screen,
            &art.stars,
            star.frame(),
            (WINDOW_X + star.x as i32, WINDOW_Y + star.y as i32),
        );
    }
}

/// Repeats the `source` sub-rectangle of `src` horizontally across `width`
/// pixels starting at `at`. Rectangles outside `src` draw nothing.
fn tile_strip(dest: &mut Pixmap, src: &Pixmap, source: Option<IntRect>, at: (i32, i32), width: u32) {
    let Some(strip) = source.and_then(|rect| crop(src, rect)) else {
        return;
    };
    let Some(area) = Rect::from_xywh(at.0 as f32, at.1 as f32, width as f32, strip.height() as f32)
    else {
        return;
    };

    let paint = Paint {
        shader: Pattern::new(
            strip.as_ref(),
            SpreadMode::Repeat,
            FilterQuality::Nearest,
            1.0,
            Transform::from_translate(at.0 as f32, at.1 as f32),
        ),
        anti_alias: false,
        ..Paint::default()
    };
    dest.fill_rect(area, &paint, Transform::identity(), None);
}

/// Draws cell `tile` of a row-major sprite sheet.
fn draw_tile(dest: &mut Pixmap, sheet: &Pixmap, tile: u32, at: (i32, i32)) {
    let columns = sheet.width() / STAR_TILE_WIDTH;
    if columns == 0 {
        return;
    }
    let (row, column) = (tile / columns, tile % columns);
    let rect = IntRect::from_xywh(
        (column * STAR_TILE_WIDTH) as i32,
        (row * STAR_TILE_HEIGHT) as i32,
        STAR_TILE_WIDTH,
        STAR_TILE_HEIGHT,
    );
    let Some(sprite) = rect.and_then(|rect| crop(sheet, rect)) else {
        return;
    };
    dest.draw_pixmap(
        at.0,
        at.1,
        sprite.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
}

fn crop(src: &Pixmap, rect: IntRect) -> Option<Pixmap> {
    if rect.x() < 0
        || rect.y() < 0
        || rect.right() as u32 > src.width()
        || rect.bottom() as u32 > src.height()
    {
        return None;
    }
    src.clone_rect(rect)
}

fn clear_rows(pixmap: &mut Pixmap, top: u32, rows: u32) {
    let Some(area) = Rect::from_xywh(0.0, top as f32, pixmap.width() as f32, rows as f32) else {
        return;
    };
    let paint = Paint {
        blend_mode: BlendMode::Clear,
        anti_alias: false,
        ..Paint::default()
    };
    pixmap.fill_rect(area, &paint, Transform::identity(), None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::BuiltinArt;

    fn rgba(pixmap: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let pixel = pixmap.pixel(x, y).expect("pixel in bounds");
        [pixel.red(), pixel.green(), pixel.blue(), pixel.alpha()]
    }

    #[test]
    fn crop_rejects_out_of_bounds_rects() {
        let src = Pixmap::new(10, 10).expect("pixmap");
        assert!(crop(&src, IntRect::from_xywh(0, 0, 10, 10).expect("rect")).is_some());
        assert!(crop(&src, IntRect::from_xywh(5, 0, 6, 10).expect("rect")).is_none());
        assert!(crop(&src, IntRect::from_xywh(0, -1, 2, 2).expect("rect")).is_none());
    }

    #[test]
    fn tile_strip_repeats_source_columns() {
        let mut src = Pixmap::new(2, 1).expect("pixmap");
        src.pixels_mut()[0] =
            tiny_skia::PremultipliedColorU8::from_rgba(255, 0, 0, 255).expect("color");
        src.pixels_mut()[1] =
            tiny_skia::PremultipliedColorU8::from_rgba(0, 0, 255, 255).expect("color");
        let mut dest = Pixmap::new(8, 1).expect("pixmap");
        tile_strip(&mut dest, &src, IntRect::from_xywh(0, 0, 2, 1), (0, 0), 8);

        assert_eq!(rgba(&dest, 0, 0), [255, 0, 0, 255]);
        assert_eq!(rgba(&dest, 1, 0), [0, 0, 255, 255]);
        assert_eq!(rgba(&dest, 6, 0), [255, 0, 0, 255]);
        assert_eq!(rgba(&dest, 7, 0), [0, 0, 255, 255]);
    }

    #[test]
    fn clear_rows_only_touches_requested_rows() {
        let mut pixmap = Pixmap::new(4, 4).expect("pixmap");
        pixmap.fill(Color::WHITE);
        clear_rows(&mut pixmap, 0, 2);
        assert_eq!(rgba(&pixmap, 2, 1)[3], 0);
        assert_eq!(rgba(&pixmap, 2, 2)[3], 255);
    }

    #[test]
    fn text_masks_the_scroll_raster() {
        let art = Art::load(&FallbackImages::new(BuiltinArt));
        let mut canvases = Canvases::new().expect("canvases");
        let effects = Effects::new(1);
        let mut screen = Pixmap::new(SCREEN_WIDTH, SCREEN_HEIGHT).expect("screen");

        // empty lane: the window shows only the back raster
        compose(&mut screen, &art, &mut canvases, &effects, Tier::Small);
        let empty = screen.clone();

        // solid lane: every stamped row lets the scroll raster through
        canvases.tiers[Tier::Small.index()].fill(Color::WHITE);
        compose(&mut screen, &art, &mut canvases, &effects, Tier::Small);

        // first stamp covers window rows 4..36 (stamp row 2, mask shift 2)
        let probe = (WINDOW_X as u32 + 300, WINDOW_Y as u32 + 10);
        assert_ne!(rgba(&empty, probe.0, probe.1), rgba(&screen, probe.0, probe.1));
        let gap = (WINDOW_X as u32 + 300, WINDOW_Y as u32 + 37);
        assert_eq!(rgba(&empty, gap.0, gap.1), rgba(&screen, gap.0, gap.1));
    }
}
