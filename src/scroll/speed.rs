use super::tier::Tier;

/// Scroll speeds in pixels per tick for every tier, indexed by `Tier::index`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierSpeeds(pub [f64; 4]);

impl TierSpeeds {
    pub fn of(&self, tier: Tier) -> f64 {
        self.0[tier.index()]
    }
}

/// Speed of the small tier when `active` is the tier being read. Bigger
/// active tiers slow the whole scroller down so their text stays readable.
fn small_tier_base(active: Tier) -> f64 {
    match active {
        Tier::Small => 8.0,
        Tier::Normal => 4.0,
        Tier::Medium => 2.0,
        Tier::Big => 1.0,
    }
}

/// Lane speeds for a tempo multiplier and active tier. The ratios between
/// lanes are always 1:2:4:8.
pub fn tier_speeds(multiplier: f64, active: Tier) -> TierSpeeds {
    let base = small_tier_base(active) * multiplier;
    TierSpeeds([base, base * 2.0, base * 4.0, base * 8.0])
}
