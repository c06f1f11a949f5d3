use tiny_skia::{Color, FilterQuality, IntRect, Pixmap, PixmapPaint, Transform};

use super::markup::{count_visible_chars, tokens, Token};
use super::tier::{Tier, TierGeometry};

const FIRST_TILE_CHAR: u8 = b' ';
const LAST_TILE_CHAR: u8 = b'Z';

/// Font strip tile for a text byte. Bytes outside `' '..='Z'` use tile 0.
pub fn tile_index(byte: u8) -> u32 {
    if byte < FIRST_TILE_CHAR || byte > LAST_TILE_CHAR {
        return 0;
    }
    u32::from(byte - FIRST_TILE_CHAR)
}

/// Font tiles cut from a vertical strip, one `tile_width x tile_height`
/// cell per character. Cells that fall outside the strip are absent.
#[derive(Debug, Clone)]
pub struct GlyphSheet {
    tiles: Vec<Pixmap>,
}

impl GlyphSheet {
    pub fn from_strip(strip: &Pixmap, tile_width: u32, tile_height: u32) -> Self {
        let mut tiles = Vec::new();
        if tile_width == 0 || tile_height == 0 || tile_width > strip.width() {
            return Self { tiles };
        }

        let count = strip.height() / tile_height;
        for id in 0..count {
            let rect = IntRect::from_xywh(0, (id * tile_height) as i32, tile_width, tile_height);
            match rect.and_then(|rect| strip.clone_rect(rect)) {
                Some(tile) => tiles.push(tile),
                None => break,
            }
        }
        Self { tiles }
    }

    pub fn tile(&self, id: u32) -> Option<&Pixmap> {
        self.tiles.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphPlacement {
    pub tile: u32,
    pub x: f64,
}

/// Horizontal scroller state for one tier.
#[derive(Debug, Clone)]
pub struct ScrollAnimator {
    tier: Tier,
    geometry: TierGeometry,
    text: Vec<u8>,
    visible_chars: usize,
    offset: f64,
    speed: f64,
}

impl ScrollAnimator {
    /// Starts with the text just off the right edge of the canvas.
    pub fn new(tier: Tier, geometry: TierGeometry, text: Vec<u8>) -> Self {
        let visible_chars = count_visible_chars(&text);
        Self {
            tier,
            geometry,
            text,
            visible_chars,
            offset: geometry.canvas_width as f64,
            speed: 0.0,
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn geometry(&self) -> &TierGeometry {
        &self.geometry
    }

    pub fn text(&self) -> &[u8] {
        &self.text
    }

    pub fn visible_chars(&self) -> usize {
        self.visible_chars
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    /// Full width of one pass of the text.
    pub fn total_width(&self) -> f64 {
        self.visible_chars as f64 * self.geometry.scaled_tile_width()
    }

    /// Moves the text left by one tick. Once the whole text has left the
    /// canvas it re-enters from the right edge.
    pub fn advance(&mut self) {
        self.offset -= self.speed;
        if self.visible_chars == 0 {
            return;
        }

        let total_width = self.total_width();
        if total_width > 0.0 && self.offset <= -total_width {
            self.offset += total_width + self.geometry.canvas_width as f64;
        }
    }

    /// Places a follower at an offset derived from the master lane. No wrap
    /// check: wrapping is the master's job.
    pub fn follow_offset(&mut self, offset: f64) {
        self.offset = offset;
    }

    /// Glyphs that start left of the canvas' right edge, in text order.
    /// Blanks are included; directives occupy no space.
    pub fn glyph_placements(&self) -> impl Iterator<Item = GlyphPlacement> + '_ {
        let step = self.geometry.scaled_tile_width();
        let limit = self.geometry.canvas_width as f64;
        let mut x = self.offset;

        tokens(&self.text)
            .filter_map(|token| match token {
                Token::Glyph { byte, .. } => Some(byte),
                Token::Directive { .. } => None,
            })
            .map_while(move |byte| {
                if x >= limit {
                    return None;
                }
                let placement = GlyphPlacement {
                    tile: tile_index(byte),
                    x,
                };
                x += step;
                Some(placement)
            })
    }

    /// Clears `canvas` and draws the visible window of text into it.
    pub fn render(&self, canvas: &mut Pixmap, sheet: &GlyphSheet) {
        canvas.fill(Color::TRANSPARENT);
        if self.visible_chars == 0 {
            return;
        }

        let paint = PixmapPaint {
            quality: FilterQuality::Nearest,
            ..PixmapPaint::default()
        };
        let step = self.geometry.scaled_tile_width();
        for placement in self.glyph_placements() {
            if placement.x + step <= 0.0 {
                continue;
            }
            let Some(tile) = sheet.tile(placement.tile) else {
                continue;
            };
            let transform = Transform::from_row(
                self.geometry.scale_x as f32,
                0.0,
                0.0,
                self.geometry.scale_y as f32,
                placement.x as f32,
                0.0,
            );
            canvas.draw_pixmap(0, 0, tile.as_ref(), &paint, transform, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scroll::tier::CANVAS_WIDTH;

    fn animator_with(glyphs: usize) -> ScrollAnimator {
        let text = vec![b'A'; glyphs];
        ScrollAnimator::new(Tier::Small, Tier::Small.geometry(), text)
    }

    #[test]
    fn tile_index_clamps_outside_font_range() {
        assert_eq!(tile_index(b' '), 0);
        assert_eq!(tile_index(b'A'), 33);
        assert_eq!(tile_index(b'Z'), 58);
        assert_eq!(tile_index(b'a'), 0);
        assert_eq!(tile_index(b'\n'), 0);
    }

    #[test]
    fn wraps_back_to_start_after_full_cycle() {
        let mut animator = animator_with(10);
        animator.set_speed(8.0);
        assert_eq!(animator.total_width(), 400.0);
        assert_eq!(animator.offset(), 640.0);

        for _ in 0..129 {
            animator.advance();
        }
        assert_eq!(animator.offset(), 640.0 - 8.0 * 129.0);

        animator.advance();
        assert_eq!(animator.offset(), 640.0);
    }

    #[test]
    fn full_cycle_returns_within_one_step() {
        let mut animator = animator_with(37);
        animator.set_speed(3.0);
        let start = animator.offset();
        let cycle = animator.total_width() + CANVAS_WIDTH as f64;
        let ticks = (cycle / animator.speed()).round() as usize;
        for _ in 0..ticks {
            animator.advance();
        }
        assert!((animator.offset() - start).abs() <= animator.speed());
    }

    #[test]
    fn empty_text_never_wraps() {
        let mut animator = animator_with(0);
        animator.set_speed(8.0);
        for _ in 0..1000 {
            animator.advance();
        }
        assert_eq!(animator.offset(), 640.0 - 8000.0);
        assert_eq!(animator.glyph_placements().count(), 0);
    }

    #[test]
    fn follow_offset_skips_wrap_check() {
        let mut animator = animator_with(10);
        animator.follow_offset(-5000.0);
        assert_eq!(animator.offset(), -5000.0);
    }

    #[test]
    fn placements_skip_directives_and_stop_past_canvas() {
        let text = b"AB^Cs1;  CD".to_vec();
        let mut animator = ScrollAnimator::new(Tier::Small, Tier::Small.geometry(), text);
        animator.follow_offset(560.0);
        let placements = animator.glyph_placements().collect::<Vec<_>>();
        assert_eq!(
            placements,
            vec![
                GlyphPlacement { tile: 33, x: 560.0 },
                GlyphPlacement { tile: 34, x: 600.0 },
            ]
        );
    }

    #[test]
    fn placements_advance_over_blanks() {
        let geometry = Tier::Normal.geometry();
        let mut animator = ScrollAnimator::new(Tier::Normal, geometry, b" ^Cs2;X".to_vec());
        animator.follow_offset(0.0);
        let xs = animator
            .glyph_placements()
            .map(|placement| placement.x)
            .collect::<Vec<_>>();
        assert_eq!(xs, vec![0.0, 80.0]);
    }

    #[test]
    fn render_paints_only_inside_glyph_cells() {
        let mut strip = Pixmap::new(40, 32 * 59).expect("strip");
        strip.fill(Color::WHITE);
        let sheet = GlyphSheet::from_strip(&strip, 40, 32);
        assert_eq!(sheet.len(), 59);

        let mut animator = animator_with(1);
        animator.follow_offset(100.0);
        let mut canvas = Pixmap::new(640, 32).expect("canvas");
        animator.render(&mut canvas, &sheet);

        let alpha_at = |x: u32| canvas.pixel(x, 10).map(|p| p.alpha()).unwrap_or(0);
        assert_eq!(alpha_at(99), 0);
        assert_eq!(alpha_at(100), 255);
        assert_eq!(alpha_at(139), 255);
        assert_eq!(alpha_at(140), 0);
    }

    #[test]
    fn sheet_ignores_partial_cells() {
        let strip = Pixmap::new(40, 32 * 3 + 10).expect("strip");
        assert_eq!(GlyphSheet::from_strip(&strip, 40, 32).len(), 3);
        let narrow = Pixmap::new(20, 320).expect("strip");
        assert!(GlyphSheet::from_strip(&narrow, 40, 32).is_empty());
    }
}
