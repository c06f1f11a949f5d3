//! The intro as a frame-loop client: one `update` and one `render` per tick.

use anyhow::Result;
use tiny_skia::Pixmap;
use tracing::debug;

use crate::assets::{AssetDir, BuiltinArt, FallbackImages};
use crate::audio::MusicPlayback;
use crate::compose::{compose, Art, Canvases, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::effects::Effects;
use crate::input::InputSignals;
use crate::schema::{Manifest, ScrollSettings};
use crate::scroll::tier::Tier;
use crate::scroll::ScrollEngine;
use crate::tempo::Tempo;

pub struct Intro {
    engine: ScrollEngine,
    tempo: Tempo,
    effects: Effects,
    art: Art,
    canvases: Canvases,
    music: MusicPlayback,
    tick: u64,
}

impl Intro {
    /// Loads art from the manifest's asset directory, or the built-in art
    /// when none is configured.
    pub fn new(manifest: &Manifest, music: MusicPlayback) -> Result<Self> {
        let art = match &manifest.assets.dir {
            Some(dir) => Art::load(&FallbackImages::new(AssetDir::new(dir))),
            None => Art::load(&FallbackImages::new(BuiltinArt)),
        };
        Self::with_art(&manifest.scroll, manifest.seed, art, music)
    }

    pub fn with_art(
        scroll: &ScrollSettings,
        seed: u64,
        art: Art,
        mut music: MusicPlayback,
    ) -> Result<Self> {
        let tempo = scroll.tempo()?;
        let engine = ScrollEngine::new(scroll.message(), scroll.default_tier()?, tempo.multiplier())?;
        debug!(
            glyphs = engine.index().total_glyphs(),
            directives = engine.index().changes().len(),
            "scroll text prepared"
        );
        music.start();

        Ok(Self {
            engine,
            tempo,
            effects: Effects::new(seed),
            art,
            canvases: Canvases::new()?,
            music,
            tick: 0,
        })
    }

    /// Fixed logical resolution, whatever the host window size.
    pub fn layout(&self) -> (u32, u32) {
        (SCREEN_WIDTH, SCREEN_HEIGHT)
    }

    /// Advances everything by one tick. Tempo keys are sampled first so the
    /// new speeds apply to this tick's movement.
    pub fn update(&mut self, input: &dyn InputSignals) -> Result<()> {
        let before = self.tempo;
        if input.faster(self.tick) {
            self.tempo.faster();
        }
        if input.slower(self.tick) {
            self.tempo.slower();
        }
        if self.tempo != before {
            debug!(tick = self.tick, multiplier = self.tempo.multiplier(), "tempo changed");
        }
        self.engine.set_multiplier(self.tempo.multiplier());

        self.effects.tick();
        self.engine.tick();
        self.tick += 1;
        Ok(())
    }

    /// Repaints the tier lanes, then composes the screen.
    pub fn render(&mut self, surface: &mut Pixmap) {
        for tier in Tier::ALL {
            self.engine
                .animator(tier)
                .render(&mut self.canvases.tiers[tier.index()], &self.art.glyphs);
        }
        compose(
            surface,
            &self.art,
            &mut self.canvases,
            &self.effects,
            self.engine.active_tier(),
        );
    }

    /// Feeds offline audio backends `sample_frames` frames of music.
    pub fn pump_audio(&mut self, sample_frames: usize) {
        self.music.pump(sample_frames);
    }

    pub fn engine(&self) -> &ScrollEngine {
        &self.engine
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn effects(&self) -> &Effects {
        &self.effects
    }

    pub fn music(&self) -> &MusicPlayback {
        &self.music
    }

    /// Ticks run so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }
}
