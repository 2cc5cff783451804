use crate::actor::Actor;
use crate::config::ObstacleConfig;
use crate::mask::{Mask, Sprites};
use rand::Rng;

/// A pair of segments with a gap between them.
///
/// `gap_top` is the lower edge of the top segment and `gap_bottom` the upper
/// edge of the bottom one. Both are fixed at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Obstacle {
    pub x: f32,
    gap_top: i32,
    gap_bottom: i32,
    top_y: i32,
    pub passed: bool,
}

impl Obstacle {
    pub fn new<R: Rng + ?Sized>(
        x: f32,
        config: &ObstacleConfig,
        segment_height: u32,
        rng: &mut R,
    ) -> Self {
        let gap_top = rng.gen_range(config.gap_top_min..config.gap_top_max);
        Self::with_gap_top(x, gap_top, config.gap_size, segment_height)
    }

    pub fn with_gap_top(x: f32, gap_top: i32, gap_size: i32, segment_height: u32) -> Self {
        Self {
            x,
            gap_top,
            gap_bottom: gap_top + gap_size,
            top_y: gap_top - segment_height as i32,
            passed: false,
        }
    }

    pub fn advance(&mut self, velocity: f32) {
        self.x -= velocity;
    }

    pub fn gap_top(&self) -> i32 {
        self.gap_top
    }

    pub fn gap_bottom(&self) -> i32 {
        self.gap_bottom
    }

    /// Y of the top segment's upper edge; usually off-screen.
    pub fn top_y(&self) -> i32 {
        self.top_y
    }

    /// Rightmost x covered by the segments.
    pub fn trailing_edge(&self, segment_width: u32) -> f32 {
        self.x + segment_width as f32
    }

    /// Both segments as `(mask, screen origin)`, top first.
    pub fn segments<'a>(&self, sprites: &'a Sprites) -> [(&'a Mask, (i32, i32)); 2] {
        let x = self.x.round() as i32;
        [
            (&sprites.segment_top, (x, self.top_y)),
            (&sprites.segment_bottom, (x, self.gap_bottom)),
        ]
    }

    pub fn collides(&self, actor: &Actor, sprites: &Sprites) -> bool {
        let actor_mask = actor.mask(sprites);
        let (ax, ay) = actor.pixel_pos();
        self.segments(sprites)
            .iter()
            .any(|(mask, (sx, sy))| actor_mask.overlaps(mask, (sx - ax, sy - ay)))
    }
}
