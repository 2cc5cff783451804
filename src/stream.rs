use crate::config::ObstacleConfig;
use crate::obstacle::Obstacle;
use rand::Rng;
use tracing::debug;

/// Active obstacles, nearest first.
#[derive(Clone, Debug)]
pub struct ObstacleStream {
    obstacles: Vec<Obstacle>,
    config: ObstacleConfig,
    segment_width: u32,
    segment_height: u32,
}

impl ObstacleStream {
    /// Starts with one obstacle at `config.initial_x`.
    pub fn new<R: Rng + ?Sized>(
        config: &ObstacleConfig,
        segment_width: u32,
        segment_height: u32,
        rng: &mut R,
    ) -> Self {
        let first = Obstacle::new(config.initial_x, config, segment_height, rng);
        Self::from_obstacles(vec![first], config, segment_width, segment_height)
    }

    pub fn from_obstacles(
        obstacles: Vec<Obstacle>,
        config: &ObstacleConfig,
        segment_width: u32,
        segment_height: u32,
    ) -> Self {
        Self {
            obstacles,
            config: config.clone(),
            segment_width,
            segment_height,
        }
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// Index of the first obstacle whose trailing edge `reference_x` has not
    /// yet crossed. Falls back to the last obstacle when all are behind.
    pub fn active_index(&self, reference_x: f32) -> Option<usize> {
        if self.obstacles.is_empty() {
            return None;
        }
        let ahead = self
            .obstacles
            .iter()
            .position(|o| reference_x <= o.trailing_edge(self.segment_width));
        Some(ahead.unwrap_or(self.obstacles.len() - 1))
    }

    pub fn advance(&mut self) {
        let velocity = self.config.velocity;
        for obstacle in &mut self.obstacles {
            obstacle.advance(velocity);
        }
    }

    /// Drops obstacles whose trailing edge is left of the field. Returns how many.
    pub fn retire_offscreen(&mut self) -> usize {
        let before = self.obstacles.len();
        let width = self.segment_width;
        self.obstacles.retain(|o| o.trailing_edge(width) >= 0.0);
        before - self.obstacles.len()
    }

    /// Marks obstacles that fell behind `reference_x`; each is reported once.
    pub fn check_passed(&mut self, reference_x: f32) -> usize {
        let mut passed = 0;
        for obstacle in &mut self.obstacles {
            if !obstacle.passed && obstacle.x < reference_x {
                obstacle.passed = true;
                passed += 1;
            }
        }
        passed
    }

    /// Appends an obstacle at the spawn line once the newest one has moved
    /// `spawn_spacing` past it. Returns whether one was added.
    pub fn spawn_if_needed<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        let threshold = self.config.spawn_x - self.config.spawn_spacing;
        let due = match self.obstacles.last() {
            Some(newest) => newest.x < threshold,
            None => true,
        };
        if due {
            let x = self.config.spawn_x;
            let obstacle = Obstacle::new(x, &self.config, self.segment_height, rng);
            debug!(x = obstacle.x, gap_top = obstacle.gap_top(), "obstacle spawned");
            self.obstacles.push(obstacle);
        }
        due
    }
}
