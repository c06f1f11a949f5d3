use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const STAR_COUNT: usize = 8;
/// Animation frames in the star sprite sheet are 0..=9; a star respawns
/// once its phase reaches this value.
pub const STAR_LAST_PHASE: f64 = 9.0;

const BACK_RASTER_STEP: f64 = 4.0;
const BACK_RASTER_WRAP: f64 = 654.0;
const SCROLL_RASTER_STEP: f64 = 2.0;
const SCROLL_RASTER_TOP: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Star {
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub phase: f64,
}

impl Star {
    fn spawn(rng: &mut impl Rng, phase: f64) -> Self {
        Self {
            x: (rng.gen::<f64>() * 9.0).round() * 64.0,
            y: (rng.gen::<f64>() * 354.0).round(),
            speed: (rng.gen::<f64>() * 4.0).round() + 4.0,
            phase,
        }
    }

    /// Sprite sheet frame to draw for the current phase.
    pub fn frame(&self) -> u32 {
        self.phase.round() as u32
    }
}

/// Raster bar scroll positions and twinkling stars behind the scroller.
#[derive(Debug, Clone)]
pub struct Effects {
    vbl: u64,
    back_raster_y: f64,
    scroll_raster_y: f64,
    stars: [Star; STAR_COUNT],
    rng: StdRng,
}

impl Effects {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let stars = std::array::from_fn(|_| {
            let mut star = Star::spawn(&mut rng, 0.0);
            star.phase = (rng.gen::<f64>() * 10.0).round();
            star
        });
        Self {
            vbl: 0,
            back_raster_y: 0.0,
            scroll_raster_y: SCROLL_RASTER_TOP,
            stars,
            rng,
        }
    }

    pub fn vbl(&self) -> u64 {
        self.vbl
    }

    pub fn back_raster_y(&self) -> f64 {
        self.back_raster_y
    }

    pub fn scroll_raster_y(&self) -> f64 {
        self.scroll_raster_y
    }

    pub fn stars(&self) -> &[Star; STAR_COUNT] {
        &self.stars
    }

    pub fn tick(&mut self) {
        self.vbl += 1;

        // rasters move at half the frame rate
        if self.vbl % 2 == 0 {
            self.back_raster_y += BACK_RASTER_STEP;
            if self.back_raster_y >= BACK_RASTER_WRAP {
                self.back_raster_y = 0.0;
            }
            self.scroll_raster_y -= SCROLL_RASTER_STEP;
            if self.scroll_raster_y <= 0.0 {
                self.scroll_raster_y = SCROLL_RASTER_TOP;
            }
        }

        for star in &mut self.stars {
            star.phase += 1.0 / star.speed;
            if star.phase >= STAR_LAST_PHASE {
                *star = Star::spawn(&mut self.rng, 0.0);
            }
        }
    }
}
