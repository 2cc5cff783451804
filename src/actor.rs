use crate::config::PhysicsConfig;
use crate::mask::{Mask, Sprites};

/// Frame shown while diving; the wing holds still.
const GLIDE_FRAME: usize = 1;

/// A flapping actor. `x` is fixed for the whole episode.
#[derive(Clone, Debug, PartialEq)]
pub struct Actor {
    pub x: f32,
    pub y: f32,
    pub velocity: f32,
    /// Ticks since the last jump; displacement is derived from it each tick.
    pub tick_count: u32,
    /// Height at the last jump, used to decide when the nose drops.
    pub reference_y: f32,
    pub tilt: f32,
    pub frame: usize,
    frame_counter: u32,
}

impl Actor {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            velocity: 0.0,
            tick_count: 0,
            reference_y: y,
            tilt: 0.0,
            frame: 0,
            frame_counter: 0,
        }
    }

    pub fn spawn(physics: &PhysicsConfig) -> Self {
        Self::new(physics.spawn_x, physics.spawn_y)
    }

    pub fn jump(&mut self, physics: &PhysicsConfig) {
        self.velocity = physics.jump_velocity;
        self.tick_count = 0;
        self.reference_y = self.y;
    }

    /// Advances one tick and returns the displacement applied.
    ///
    /// Displacement is `v*t + g*t^2/2` recomputed from the tick count rather
    /// than integrated, clamped to the terminal velocity, with an extra lift
    /// while rising.
    pub fn advance(&mut self, physics: &PhysicsConfig) -> f32 {
        self.tick_count += 1;
        let t = self.tick_count as f32;
        let terminal = physics.terminal_velocity;

        let mut displacement = self.velocity * t + 0.5 * physics.gravity * t * t;
        displacement = displacement.clamp(-terminal, terminal);
        if displacement < 0.0 {
            displacement = (displacement - physics.jump_softening).clamp(-terminal, terminal);
        }

        self.y += displacement;

        if displacement < 0.0 || self.y < self.reference_y + physics.tilt_hold_band {
            if self.tilt < physics.max_tilt {
                self.tilt = physics.max_tilt;
            }
        } else if self.tilt > physics.min_tilt {
            self.tilt = (self.tilt - physics.tilt_step).max(physics.min_tilt);
        }

        displacement
    }

    /// Steps the wing cycle 0,1,2,1 once per tick. A steep dive freezes it.
    pub fn animate(&mut self, physics: &PhysicsConfig) {
        let period = physics.animation_ticks;
        self.frame_counter += 1;

        if self.frame_counter <= period {
            self.frame = 0;
        } else if self.frame_counter <= period * 2 {
            self.frame = 1;
        } else if self.frame_counter <= period * 3 {
            self.frame = 2;
        } else if self.frame_counter <= period * 4 {
            self.frame = 1;
        } else {
            self.frame = 0;
            self.frame_counter = 0;
        }

        if self.tilt <= physics.dive_tilt {
            self.frame = GLIDE_FRAME;
            self.frame_counter = period * 2;
        }
    }

    pub fn mask<'a>(&self, sprites: &'a Sprites) -> &'a Mask {
        &sprites.actor_frames[self.frame]
    }

    pub fn pixel_pos(&self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}
