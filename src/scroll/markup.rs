//! In-band size directives for scroll text.
//!
//! A directive is the five byte token `^Cs<d>;` where `<d>` is a tier digit
//! `0..=3`. Anything else starting with `^` is ordinary text.

use super::tier::Tier;

pub const DIRECTIVE_SENTINEL: u8 = b'^';
pub const DIRECTIVE_WIDTH: usize = 5;

const DIRECTIVE_TAG: &[u8; 2] = b"Cs";
const DIRECTIVE_TERMINATOR: u8 = b';';

/// Returns the tier selected by a directive starting at byte `index`, or
/// `None` when the bytes there are literal text.
pub fn parse_control_code(text: &[u8], index: usize) -> Option<Tier> {
    let token = text.get(index..index.checked_add(DIRECTIVE_WIDTH)?)?;
    if token[0] != DIRECTIVE_SENTINEL
        || &token[1..3] != DIRECTIVE_TAG
        || token[4] != DIRECTIVE_TERMINATOR
    {
        return None;
    }
    Tier::from_digit(token[3])
}

pub fn directive(tier: Tier) -> String {
    format!("^Cs{};", tier.index())
}

/// Number of glyphs in `text` once directives are removed.
pub fn count_visible_chars(text: &[u8]) -> usize {
    tokens(text)
        .filter(|token| matches!(token, Token::Glyph { .. }))
        .count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Directive { at: usize, tier: Tier },
    Glyph { at: usize, byte: u8 },
}

pub fn tokens(text: &[u8]) -> Tokens<'_> {
    Tokens { text, index: 0 }
}

#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    text: &'a [u8],
    index: usize,
}

impl Iterator for Tokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let at = self.index;
        let byte = *self.text.get(at)?;
        if let Some(tier) = parse_control_code(self.text, at) {
            self.index += DIRECTIVE_WIDTH;
            return Some(Token::Directive { at, tier });
        }
        self.index += 1;
        Some(Token::Glyph { at, byte })
    }
}
