use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

use crate::audio::{DEFAULT_SAMPLE_RATE, DEFAULT_VOLUME};
use crate::message::DEFAULT_MESSAGE;
use crate::scroll::tier::Tier;
use crate::tempo::Tempo;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub scroll: ScrollSettings,
    #[serde(default)]
    pub assets: AssetSettings,
    #[serde(default)]
    pub audio: AudioSettings,
}

impl Manifest {
    pub fn validate(&self) -> Result<()> {
        self.environment.validate()?;
        self.scroll.validate().context("invalid scroll settings")?;
        self.audio.validate().context("invalid audio settings")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Environment {
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_duration")]
    pub duration: Duration,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            duration: default_duration(),
        }
    }
}

/// Host tick rate; every tick is one `update` and one `render`.
fn default_fps() -> u32 {
    60
}

fn default_duration() -> Duration {
    Duration::Frames { frames: 600 }
}

impl Environment {
    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            bail!("fps must be > 0");
        }

        match self.duration {
            Duration::Seconds(seconds) => {
                if seconds <= 0.0 || !seconds.is_finite() {
                    bail!("duration in seconds must be > 0");
                }
            }
            Duration::Frames { frames } => {
                if frames == 0 {
                    bail!("duration frames must be > 0");
                }
            }
        }

        Ok(())
    }

    pub fn total_frames(&self) -> u32 {
        match self.duration {
            Duration::Seconds(seconds) => {
                let frames = (seconds * self.fps as f32).ceil();
                frames.max(1.0) as u32
            }
            Duration::Frames { frames } => frames.max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum Duration {
    Seconds(f32),
    Frames { frames: u32 },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScrollSettings {
    /// Annotated scroll text; the built-in message when absent.
    #[serde(default)]
    pub message: Option<String>,
    /// Tier that shows text before the first size directive.
    #[serde(default)]
    pub default_tier: u8,
    #[serde(default = "default_tempo")]
    pub tempo: f64,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            message: None,
            default_tier: 0,
            tempo: default_tempo(),
        }
    }
}

fn default_tempo() -> f64 {
    1.0
}

impl ScrollSettings {
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or(DEFAULT_MESSAGE)
    }

    pub fn default_tier(&self) -> Result<Tier> {
        Tier::from_index(self.default_tier)
            .ok_or_else(|| anyhow!("default_tier must be 0..=3, got {}", self.default_tier))
    }

    pub fn tempo(&self) -> Result<Tempo> {
        Tempo::from_multiplier(self.tempo)
    }

    pub fn validate(&self) -> Result<()> {
        let message = self.message();
        if message.is_empty() {
            bail!("message cannot be empty");
        }
        if let Some(bad) = message.chars().find(|ch| !ch.is_ascii()) {
            bail!(
                "message must be ASCII, found U+{:04X} ({})",
                bad as u32,
                bad.escape_default()
            );
        }
        self.default_tier()?;
        self.tempo()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetSettings {
    /// Directory with the intro's PNGs; built-in art when absent.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AudioSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default = "default_true", rename = "loop")]
    pub looping: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_rate: default_sample_rate(),
            volume: default_volume(),
            looping: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

fn default_volume() -> f64 {
    DEFAULT_VOLUME
}

impl AudioSettings {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            bail!("sample_rate must be > 0");
        }
        if !(0.0..=1.0).contains(&self.volume) {
            bail!("volume must be within 0..=1, got {}", self.volume);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Manifest {
        serde_yaml::from_str(yaml).expect("manifest should parse")
    }

    #[test]
    fn empty_manifest_uses_defaults() {
        let manifest = parse("{}");
        manifest.validate().expect("defaults are valid");
        assert_eq!(manifest.environment.fps, 60);
        assert_eq!(manifest.environment.total_frames(), 600);
        assert_eq!(manifest.scroll.message(), DEFAULT_MESSAGE);
        assert_eq!(manifest.scroll.default_tier().expect("tier"), Tier::Small);
        assert!(manifest.audio.enabled);
        assert!(manifest.audio.looping);
    }

    #[test]
    fn duration_in_seconds_rounds_up_to_frames() {
        let manifest = parse("environment: { fps: 50, duration: 1.01 }");
        assert_eq!(manifest.environment.total_frames(), 51);
    }

    #[test]
    fn rejects_unknown_fields() {
        let result = serde_yaml::from_str::<Manifest>("scroll: { speed: 3 }");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_bad_values() {
        for yaml in [
            "environment: { fps: 0 }",
            "environment: { duration: { frames: 0 } }",
            "scroll: { tempo: 1.5 }",
            "scroll: { default_tier: 4 }",
            "scroll: { message: '' }",
            "scroll: { message: 'CAF\u{c9}' }",
            "audio: { volume: 2.0 }",
            "audio: { sample_rate: 0 }",
        ] {
            assert!(parse(yaml).validate().is_err(), "{yaml} should be rejected");
        }
    }

    #[test]
    fn loop_flag_uses_its_yaml_name() {
        let manifest = parse("audio: { loop: false }");
        assert!(!manifest.audio.looping);
    }
}
