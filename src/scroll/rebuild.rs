use super::markup::{tokens, Token, DIRECTIVE_WIDTH};
use super::tier::Tier;

pub const BLANK: u8 = b' ';

/// Derives the display text for one tier from the master message.
///
/// The result has the same length and directive positions as `master`;
/// glyphs are kept only while the last directive seen selected `tier`
/// (or, before the first directive, when `default_active` is set).
pub fn rebuild_text(master: &[u8], tier: Tier, default_active: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(master.len());
    let mut active = default_active;

    for token in tokens(master) {
        match token {
            Token::Directive { at, tier: selected } => {
                active = selected == tier;
                out.extend_from_slice(&master[at..at + DIRECTIVE_WIDTH]);
            }
            Token::Glyph { byte, .. } => out.push(if active { byte } else { BLANK }),
        }
    }

    out
}
