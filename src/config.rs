use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The wing cycle spans four periods; larger values would overflow its counter.
pub const MAX_ANIMATION_TICKS: u32 = u32::MAX / 4;

/// Play field geometry and elimination bounds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FieldConfig {
    pub width: u32,
    pub height: u32,
    pub floor_y: f32,
    /// Actors may sink this far into the floor line before elimination.
    pub floor_tolerance: f32,
    /// Actors may rise this far above the top edge before elimination.
    pub ceiling_margin: f32,
    pub ground_velocity: f32,
    pub draw_lines: bool,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            width: 600,
            height: 800,
            floor_y: 730.0,
            floor_tolerance: 10.0,
            ceiling_margin: 50.0,
            ground_velocity: 5.0,
            draw_lines: false,
        }
    }
}

/// Actor motion constants. Angles are degrees, distances are pixels per tick.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PhysicsConfig {
    pub spawn_x: f32,
    pub spawn_y: f32,
    pub gravity: f32,
    pub jump_velocity: f32,
    pub terminal_velocity: f32,
    pub jump_softening: f32,
    pub max_tilt: f32,
    pub min_tilt: f32,
    pub tilt_step: f32,
    pub tilt_hold_band: f32,
    pub dive_tilt: f32,
    pub animation_ticks: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            spawn_x: 230.0,
            spawn_y: 350.0,
            gravity: 3.0,
            jump_velocity: -10.5,
            terminal_velocity: 16.0,
            jump_softening: 2.0,
            max_tilt: 25.0,
            min_tilt: -90.0,
            tilt_step: 20.0,
            tilt_hold_band: 50.0,
            dive_tilt: -80.0,
            animation_ticks: 5,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ObstacleConfig {
    pub gap_size: i32,
    /// Gap top edge is rolled from `gap_top_min..gap_top_max`.
    pub gap_top_min: i32,
    pub gap_top_max: i32,
    pub velocity: f32,
    pub initial_x: f32,
    pub spawn_x: f32,
    pub spawn_spacing: f32,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            gap_size: 200,
            gap_top_min: 50,
            gap_top_max: 450,
            velocity: 5.0,
            initial_x: 700.0,
            spawn_x: 600.0,
            spawn_spacing: 370.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SpriteConfig {
    pub actor_width: u32,
    pub actor_height: u32,
    pub segment_width: u32,
    pub segment_height: u32,
    pub ground_width: u32,
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            actor_width: 68,
            actor_height: 48,
            segment_width: 104,
            segment_height: 640,
            ground_width: 672,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FitnessConfig {
    pub survival: f64,
    pub pass_bonus: f64,
    pub collision: f64,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            survival: 0.1,
            pass_bonus: 5.0,
            collision: -1.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EpisodeConfig {
    pub population: usize,
    pub generations: u32,
    /// Soft stop; `None` runs until the population is exhausted.
    pub max_steps: Option<u64>,
    pub tick_rate: u32,
    pub jump_threshold: f32,
    pub parallel_policies: bool,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            population: 50,
            generations: 50,
            max_steps: None,
            tick_rate: 30,
            jump_threshold: 0.5,
            parallel_policies: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub field: FieldConfig,
    pub physics: PhysicsConfig,
    pub obstacles: ObstacleConfig,
    pub sprites: SpriteConfig,
    pub fitness: FitnessConfig,
    pub episode: EpisodeConfig,
}

impl GameConfig {
    /// Reads a (possibly partial) JSON config and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let obstacles = &self.obstacles;
        let physics = &self.physics;
        let sprites = &self.sprites;

        if obstacles.gap_size <= 0 {
            return Err(ConfigError::invalid(format!(
                "gap size must be positive, got {}",
                obstacles.gap_size
            )));
        }
        if obstacles.gap_top_min >= obstacles.gap_top_max {
            return Err(ConfigError::invalid(format!(
                "gap range {}..{} is empty",
                obstacles.gap_top_min, obstacles.gap_top_max
            )));
        }
        if obstacles.velocity <= 0.0 || !obstacles.velocity.is_finite() {
            return Err(ConfigError::invalid("obstacle velocity must be positive"));
        }
        if obstacles.spawn_spacing <= 0.0
            || obstacles.spawn_spacing >= obstacles.spawn_x + sprites.segment_width as f32
        {
            return Err(ConfigError::invalid(format!(
                "spawn spacing {} must lie in (0, {})",
                obstacles.spawn_spacing,
                obstacles.spawn_x + sprites.segment_width as f32
            )));
        }
        if physics.terminal_velocity <= 0.0 || !physics.terminal_velocity.is_finite() {
            return Err(ConfigError::invalid("terminal velocity must be positive"));
        }
        if !physics.gravity.is_finite() || !physics.jump_velocity.is_finite() {
            return Err(ConfigError::invalid("gravity and jump velocity must be finite"));
        }
        if physics.jump_softening < 0.0 || !physics.jump_softening.is_finite() {
            return Err(ConfigError::invalid(format!(
                "jump softening must be non-negative, got {}",
                physics.jump_softening
            )));
        }
        if physics.min_tilt > physics.max_tilt {
            return Err(ConfigError::invalid("min tilt exceeds max tilt"));
        }
        if physics.tilt_step <= 0.0 || !physics.tilt_step.is_finite() {
            return Err(ConfigError::invalid(format!(
                "tilt step must be positive, got {}",
                physics.tilt_step
            )));
        }
        if physics.animation_ticks == 0 || physics.animation_ticks > MAX_ANIMATION_TICKS {
            return Err(ConfigError::invalid(format!(
                "animation ticks must lie in 1..={MAX_ANIMATION_TICKS}, got {}",
                physics.animation_ticks
            )));
        }
        if self.field.ground_velocity <= 0.0 || !self.field.ground_velocity.is_finite() {
            return Err(ConfigError::invalid("ground velocity must be positive"));
        }
        if sprites.actor_width == 0
            || sprites.actor_height == 0
            || sprites.segment_width == 0
            || sprites.segment_height == 0
            || sprites.ground_width == 0
        {
            return Err(ConfigError::invalid("sprite dimensions must be non-zero"));
        }
        if self.episode.population == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.episode.tick_rate == 0 {
            return Err(ConfigError::invalid("tick rate must be non-zero"));
        }
        if !self.episode.jump_threshold.is_finite() {
            return Err(ConfigError::invalid("jump threshold must be finite"));
        }
        if self.episode.max_steps == Some(0) {
            return Err(ConfigError::invalid("step budget must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        GameConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_non_positive_gap() {
        let mut config = GameConfig::default();
        config.obstacles.gap_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_negative_jump_softening() {
        let mut config = GameConfig::default();
        config.physics.jump_softening = -40.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_non_positive_tilt_step() {
        let mut config = GameConfig::default();
        config.physics.tilt_step = -20.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.physics.tilt_step = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_non_finite_motion() {
        let mut config = GameConfig::default();
        config.physics.gravity = f32::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = GameConfig::default();
        config.physics.jump_velocity = f32::NEG_INFINITY;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_non_finite_jump_threshold() {
        let mut config = GameConfig::default();
        config.episode.jump_threshold = f32::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_non_positive_ground_velocity() {
        let mut config = GameConfig::default();
        config.field.ground_velocity = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_oversized_animation_period() {
        let mut config = GameConfig::default();
        config.physics.animation_ticks = MAX_ANIMATION_TICKS + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.physics.animation_ticks = MAX_ANIMATION_TICKS;
        config.validate().unwrap();
    }

    #[test]
    fn rejects_zero_population() {
        let mut config = GameConfig::default();
        config.episode.population = 0;
        assert!(matches!(config.validate(), Err(ConfigError::EmptyPopulation)));
    }

    #[test]
    fn rejects_spacing_that_outruns_retirement() {
        let mut config = GameConfig::default();
        config.obstacles.spawn_spacing = 800.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = r#"{ "obstacles": { "gap_size": 150 }, "episode": { "population": 4 } }"#;
        file.write_all(json.as_bytes()).unwrap();
        let config = GameConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.obstacles.gap_size, 150);
        assert_eq!(config.episode.population, 4);
        assert_eq!(config.physics, PhysicsConfig::default());
    }

    #[test]
    fn invalid_json_file_fails_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "obstacles": {{ "gap_size": -5 }} }}"#).unwrap();
        assert!(GameConfig::from_json_file(file.path()).is_err());
    }
}
