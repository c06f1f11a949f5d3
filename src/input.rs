use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Error, Result};

/// Tempo key state, sampled once per tick before the animation advances.
pub trait InputSignals {
    fn faster(&self, tick: u64) -> bool;
    fn slower(&self, tick: u64) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputSignals for NoInput {
    fn faster(&self, _tick: u64) -> bool {
        false
    }

    fn slower(&self, _tick: u64) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempoKey {
    Faster,
    Slower,
}

impl FromStr for TempoKey {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "faster" | "f1" | "+" => Ok(Self::Faster),
            "slower" | "f2" | "-" => Ok(Self::Slower),
            other => bail!("unknown tempo key '{}', expected faster or slower", other),
        }
    }
}

impl fmt::Display for TempoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Faster => f.write_str("faster"),
            Self::Slower => f.write_str("slower"),
        }
    }
}

/// A key held down over an inclusive range of ticks. Written as
/// `TICK:key` or `START-END:key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyHold {
    pub ticks: RangeInclusive<u64>,
    pub key: TempoKey,
}

impl FromStr for KeyHold {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let (ticks, key) = raw
            .split_once(':')
            .ok_or_else(|| anyhow!("key press '{}' must look like TICK:key", raw))?;
        let key = key.parse::<TempoKey>()?;
        let parse_tick = |value: &str| {
            value
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid tick '{}' in key press '{}'", value, raw))
        };

        let ticks = match ticks.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (parse_tick(start)?, parse_tick(end)?);
                if end < start {
                    bail!("key press '{}' ends before it starts", raw);
                }
                start..=end
            }
            None => {
                let tick = parse_tick(ticks)?;
                tick..=tick
            }
        };

        Ok(Self { ticks, key })
    }
}

/// Replays a fixed script of key holds, for headless renders.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    holds: Vec<KeyHold>,
}

impl ScriptedInput {
    pub fn new(holds: Vec<KeyHold>) -> Self {
        Self { holds }
    }

    fn held(&self, key: TempoKey, tick: u64) -> bool {
        self.holds
            .iter()
            .any(|hold| hold.key == key && hold.ticks.contains(&tick))
    }
}

impl InputSignals for ScriptedInput {
    fn faster(&self, tick: u64) -> bool {
        self.held(TempoKey::Faster, tick)
    }

    fn slower(&self, tick: u64) -> bool {
        self.held(TempoKey::Slower, tick)
    }
}
