//! Multi-size scroll text engine.
//!
//! One annotated message is split into four tier texts that scroll in
//! phase-lock. The small tier is the master: it is the only lane that
//! advances and wraps; the others are placed at an offset derived from it.
//! Which tier is being read, and therefore how fast everything moves, is
//! worked out from scroll position alone.

pub mod animator;
pub mod font_changes;
pub mod markup;
pub mod rebuild;
pub mod resolver;
pub mod speed;
pub mod tier;

use anyhow::{bail, Result};
use tracing::debug;

use self::animator::ScrollAnimator;
use self::font_changes::FontChangeIndex;
use self::rebuild::rebuild_text;
use self::speed::tier_speeds;
use self::tier::Tier;

pub const MASTER_TIER: Tier = Tier::Small;

/// Scroll state for all four tiers plus the timing that drives them.
#[derive(Debug, Clone)]
pub struct ScrollEngine {
    message: Vec<u8>,
    index: FontChangeIndex,
    animators: [ScrollAnimator; 4],
    active: Tier,
    multiplier: f64,
}

impl ScrollEngine {
    /// Builds the tier texts and index once. `default_tier` is the tier that
    /// shows text appearing before the first directive.
    pub fn new(message: &str, default_tier: Tier, multiplier: f64) -> Result<Self> {
        if !message.is_ascii() {
            bail!("scroll message must be ASCII");
        }
        let message = message.as_bytes().to_vec();
        let index = FontChangeIndex::build_with_default(&message, default_tier);
        let animators = Tier::ALL.map(|tier| {
            let text = rebuild_text(&message, tier, tier == default_tier);
            ScrollAnimator::new(tier, tier.geometry(), text)
        });

        let mut engine = Self {
            message,
            index,
            animators,
            active: MASTER_TIER,
            multiplier,
        };
        engine.apply_speeds();
        Ok(engine)
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    pub fn index(&self) -> &FontChangeIndex {
        &self.index
    }

    pub fn animator(&self, tier: Tier) -> &ScrollAnimator {
        &self.animators[tier.index()]
    }

    pub fn animators(&self) -> &[ScrollAnimator; 4] {
        &self.animators
    }

    pub fn active_tier(&self) -> Tier {
        self.active
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Changes the tempo multiplier and re-derives lane speeds.
    pub fn set_multiplier(&mut self, multiplier: f64) {
        self.multiplier = multiplier;
        self.apply_speeds();
    }

    /// One animation tick: advance the master, lock the followers to it,
    /// then re-resolve the active tier.
    pub fn tick(&mut self) {
        let master = &mut self.animators[MASTER_TIER.index()];
        master.advance();
        let master_offset = master.offset();
        let master_width = master.geometry().canvas_width;

        for animator in &mut self.animators {
            if animator.tier() == MASTER_TIER {
                continue;
            }
            let offset = animator.geometry().follow(master_offset, master_width);
            animator.follow_offset(offset);
        }

        self.update_active_tier();
    }

    fn update_active_tier(&mut self) {
        let Some(resolved) = resolver::resolve_tier(self.animator(self.active), &self.index) else {
            return;
        };
        if resolved != self.active {
            debug!(from = %self.active, to = %resolved, "active scroll tier changed");
            self.active = resolved;
            self.apply_speeds();
        }
    }

    fn apply_speeds(&mut self) {
        let speeds = tier_speeds(self.multiplier, self.active);
        for animator in &mut self.animators {
            animator.set_speed(speeds.of(animator.tier()));
        }
    }
}
