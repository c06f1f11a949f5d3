use anyhow::{bail, Result};

/// Allowed tempo multipliers, slowest first.
pub const TEMPO_LADDER: [f64; 6] = [0.25, 0.5, 1.0, 2.0, 3.0, 4.0];

const DEFAULT_STEP: usize = 2;

/// Global scroll tempo, one rung of [`TEMPO_LADDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tempo {
    step: usize,
}

impl Default for Tempo {
    fn default() -> Self {
        Self { step: DEFAULT_STEP }
    }
}

impl Tempo {
    pub fn from_multiplier(multiplier: f64) -> Result<Self> {
        match TEMPO_LADDER.iter().position(|&rung| rung == multiplier) {
            Some(step) => Ok(Self { step }),
            None => bail!(
                "tempo {} is not one of {:?}",
                multiplier,
                TEMPO_LADDER
            ),
        }
    }

    pub fn multiplier(self) -> f64 {
        TEMPO_LADDER[self.step]
    }

    /// One rung up; stays put at the top.
    pub fn faster(&mut self) {
        self.step = (self.step + 1).min(TEMPO_LADDER.len() - 1);
    }

    /// One rung down; stays put at the bottom.
    pub fn slower(&mut self) {
        self.step = self.step.saturating_sub(1);
    }
}
