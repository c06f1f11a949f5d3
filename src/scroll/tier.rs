use std::fmt;

use serde::Serialize;

/// One of the four parallel scroll lanes. The discriminant is the digit used
/// by the `^Cs<d>;` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Small = 0,
    Normal = 1,
    Medium = 2,
    Big = 3,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Small, Tier::Normal, Tier::Medium, Tier::Big];

    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            b'0' => Some(Self::Small),
            b'1' => Some(Self::Normal),
            b'2' => Some(Self::Medium),
            b'3' => Some(Self::Big),
            _ => None,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Pixel geometry of this lane: a 320x200 screen layout doubled to
    /// 640 wide.
    pub fn geometry(self) -> TierGeometry {
        let (scale_x, scale_y) = match self {
            Self::Small => (1.0, 1.0),
            Self::Normal => (2.0, 2.0),
            Self::Medium => (4.0, 4.0),
            Self::Big => (8.0, 12.0),
        };
        TierGeometry {
            canvas_width: CANVAS_WIDTH,
            canvas_height: (TILE_HEIGHT as f64 * scale_y) as u32,
            tile_width: TILE_WIDTH,
            tile_height: TILE_HEIGHT,
            scale_x,
            scale_y,
        }
    }

    /// Vertical stamp positions of this lane's canvas inside the 640x400
    /// scroll window.
    pub fn stamp_rows(self) -> &'static [i32] {
        match self {
            Self::Small => &[2, 38, 74, 110, 146, 182, 218, 254, 290, 326, 362],
            Self::Normal => &[2, 68, 134, 200, 266, 332],
            Self::Medium => &[0, 134, 268],
            Self::Big => &[4],
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Small => "small",
            Self::Normal => "normal",
            Self::Medium => "medium",
            Self::Big => "big",
        };
        f.write_str(name)
    }
}

pub const CANVAS_WIDTH: u32 = 640;
pub const TILE_WIDTH: u32 = 40;
pub const TILE_HEIGHT: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierGeometry {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl TierGeometry {
    pub fn scaled_tile_width(&self) -> f64 {
        self.tile_width as f64 * self.scale_x
    }

    pub fn scaled_tile_height(&self) -> f64 {
        self.tile_height as f64 * self.scale_y
    }

    /// Offset a follower lane must sit at to show the same logical scroll
    /// position as the master lane at `master_offset`.
    pub fn follow(&self, master_offset: f64, master_canvas_width: u32) -> f64 {
        master_offset * self.scale_x + (1.0 - self.scale_x) * master_canvas_width as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_map_to_the_closed_tier_set() {
        assert_eq!(Tier::from_digit(b'0'), Some(Tier::Small));
        assert_eq!(Tier::from_digit(b'3'), Some(Tier::Big));
        assert_eq!(Tier::from_digit(b'4'), None);
        assert_eq!(Tier::from_digit(b'x'), None);
    }

    #[test]
    fn canvas_heights_follow_vertical_scale() {
        let heights = Tier::ALL.map(|tier| tier.geometry().canvas_height);
        assert_eq!(heights, [32, 64, 128, 384]);
    }

    #[test]
    fn follower_at_master_origin_sits_at_its_own_origin() {
        let big = Tier::Big.geometry();
        assert_eq!(big.follow(640.0, 640), 640.0);
        assert_eq!(big.follow(600.0, 640), 320.0);
    }

    #[test]
    fn stamp_rows_fit_the_scroll_window() {
        for tier in Tier::ALL {
            let height = tier.geometry().canvas_height as i32;
            for row in tier.stamp_rows() {
                assert!(row + height <= 400, "{tier} row {row} overflows");
            }
        }
    }
}
