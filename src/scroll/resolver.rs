use super::animator::ScrollAnimator;
use super::font_changes::FontChangeIndex;
use super::tier::Tier;

/// Glyph position just past the right edge of `animator`'s visible window,
/// clamped to the last glyph. `None` when there is nothing to look at.
pub fn lookahead_glyph(animator: &ScrollAnimator, total_glyphs: usize) -> Option<usize> {
    if total_glyphs == 0 {
        return None;
    }
    let tile_width = animator.geometry().scaled_tile_width();
    if tile_width <= 0.0 {
        return None;
    }

    let left_glyph = (-animator.offset() / tile_width).floor().max(0.0) as usize;
    let visible_glyphs =
        (animator.geometry().canvas_width as f64 / tile_width).ceil() as usize + 1;
    Some((left_glyph + visible_glyphs).min(total_glyphs - 1))
}

/// Tier whose text is about to scroll in at the trailing edge of `animator`.
pub fn resolve_tier(animator: &ScrollAnimator, index: &FontChangeIndex) -> Option<Tier> {
    lookahead_glyph(animator, index.total_glyphs()).map(|position| index.tier_at(position))
}
