use serde::Serialize;

use super::markup::{tokens, Token};
use super::tier::Tier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FontChange {
    pub position: usize,
    pub tier: Tier,
}

/// Glyph position to active tier transitions of a master message, built once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontChangeIndex {
    changes: Vec<FontChange>,
    total_glyphs: usize,
    default_tier: Tier,
}

impl FontChangeIndex {
    pub fn build(master: &[u8]) -> Self {
        Self::build_with_default(master, Tier::Small)
    }

    pub fn build_with_default(master: &[u8], default_tier: Tier) -> Self {
        let mut changes: Vec<FontChange> = Vec::new();
        let mut glyph_pos = 0;

        for token in tokens(master) {
            match token {
                Token::Directive { tier, .. } => match changes.last_mut() {
                    // Back-to-back directives: the later one wins.
                    Some(last) if last.position == glyph_pos => last.tier = tier,
                    _ => changes.push(FontChange {
                        position: glyph_pos,
                        tier,
                    }),
                },
                Token::Glyph { .. } => glyph_pos += 1,
            }
        }

        Self {
            changes,
            total_glyphs: glyph_pos,
            default_tier,
        }
    }

    pub fn changes(&self) -> &[FontChange] {
        &self.changes
    }

    pub fn total_glyphs(&self) -> usize {
        self.total_glyphs
    }

    pub fn default_tier(&self) -> Tier {
        self.default_tier
    }

    /// Tier of the last change at or before `position`.
    pub fn tier_at(&self, position: usize) -> Tier {
        let after = self
            .changes
            .partition_point(|change| change.position <= position);
        match after {
            0 => self.default_tier,
            n => self.changes[n - 1].tier,
        }
    }
}
