//! Runs one episode for a whole population of actors at once.

use crate::actor::Actor;
use crate::config::GameConfig;
use crate::error::{ConfigError, PolicyError, RenderError};
use crate::mask::Sprites;
use crate::obstacle::Obstacle;
use crate::policy::{ControlPolicy, Observation};
use crate::scroller::Scroller;
use crate::stream::ObstacleStream;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Read-only view of the world handed to the renderer once per tick.
#[derive(Clone, Copy, Debug)]
pub struct Snapshot<'a> {
    pub actors: &'a [Actor],
    pub obstacles: &'a [Obstacle],
    pub ground: &'a Scroller,
    pub sprites: &'a Sprites,
    /// Obstacle the policies were shown this tick, if any.
    pub active: Option<usize>,
    pub score: u32,
    pub live: usize,
    pub generation: u32,
    pub tick: u64,
}

pub trait Renderer {
    fn present(&mut self, snapshot: &Snapshot<'_>) -> Result<(), RenderError>;
}

/// Polled once per tick, before any simulation work.
pub trait InputSource {
    fn abort_requested(&mut self) -> bool;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NeverAbort;

impl InputSource for NeverAbort {
    fn abort_requested(&mut self) -> bool {
        false
    }
}

/// Abort flag that can be raised from another thread or an event handler.
#[derive(Clone, Debug, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl InputSource for StopFlag {
    fn abort_requested(&mut self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Receives final fitness per original policy index.
pub trait FitnessSink {
    fn record(&mut self, index: usize, fitness: f64);
}

impl FitnessSink for Vec<f64> {
    fn record(&mut self, index: usize, fitness: f64) {
        if self.len() <= index {
            self.resize(index + 1, 0.0);
        }
        self[index] = fitness;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Every actor was eliminated.
    Extinct,
    /// The step budget ran out with actors still alive.
    StepBudget,
    /// Stopped by the input source.
    Aborted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EpisodeState {
    Running,
    Terminated(Termination),
}

impl EpisodeState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeOutcome {
    pub termination: Termination,
    /// One entry per policy handed to the evaluator, in the original order.
    pub fitness: Vec<f64>,
    pub score: u32,
    pub ticks: u64,
    pub generation: u32,
    pub policy_faults: u64,
    pub render_failures: u64,
}

impl EpisodeOutcome {
    pub fn deliver(&self, sink: &mut dyn FitnessSink) {
        for (index, &fitness) in self.fitness.iter().enumerate() {
            sink.record(index, fitness);
        }
    }

    pub fn best(&self) -> Option<(usize, f64)> {
        self.fitness
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub fn mean(&self) -> f64 {
        if self.fitness.is_empty() {
            return 0.0;
        }
        self.fitness.iter().sum::<f64>() / self.fitness.len() as f64
    }
}

/// Constants, silhouettes and counters shared by consecutive episodes.
#[derive(Clone, Debug)]
pub struct EpisodeContext {
    config: GameConfig,
    sprites: Arc<Sprites>,
    generation: u32,
    rng: SmallRng,
}

impl EpisodeContext {
    pub fn new(config: GameConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let sprites = Arc::new(Sprites::procedural(&config.sprites));
        Ok(Self {
            config,
            sprites,
            generation: 0,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    /// Replaces the procedural silhouettes, e.g. with masks built from decoded assets.
    pub fn with_sprites(mut self, sprites: Sprites) -> Self {
        self.sprites = Arc::new(sprites);
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn sprites(&self) -> &Sprites {
        &self.sprites
    }

    /// Episodes started so far.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.config.episode.tick_rate as f64)
    }
}

pub struct PopulationEvaluator<P = Box<dyn ControlPolicy>> {
    config: GameConfig,
    sprites: Arc<Sprites>,
    rng: SmallRng,
    generation: u32,

    // Parallel collections: index i of each refers to the same live actor.
    actors: Vec<Actor>,
    policies: Vec<P>,
    fitness: Vec<f64>,
    ids: Vec<usize>,

    final_fitness: Vec<f64>,
    stream: ObstacleStream,
    ground: Scroller,
    active: Option<usize>,
    score: u32,
    ticks: u64,
    state: EpisodeState,
    policy_faults: u64,
    render_failures: u64,
}

impl<P: ControlPolicy> PopulationEvaluator<P> {
    pub fn new(context: &mut EpisodeContext, policies: Vec<P>) -> Result<Self, ConfigError> {
        if policies.is_empty() {
            return Err(ConfigError::EmptyPopulation);
        }
        context.generation += 1;
        let config = context.config.clone();
        let sprites = Arc::clone(&context.sprites);
        let mut rng = SmallRng::seed_from_u64(context.rng.r#gen());

        let count = policies.len();
        let actors = (0..count).map(|_| Actor::spawn(&config.physics)).collect();
        let stream = ObstacleStream::new(
            &config.obstacles,
            sprites.segment_width(),
            sprites.segment_height(),
            &mut rng,
        );
        let ground = Scroller::new(config.field.floor_y, sprites.ground_width);

        debug!(generation = context.generation, population = count, "episode started");

        Ok(Self {
            generation: context.generation,
            config,
            sprites,
            rng,
            actors,
            policies,
            fitness: vec![0.0; count],
            ids: (0..count).collect(),
            final_fitness: vec![0.0; count],
            stream,
            ground,
            active: None,
            score: 0,
            ticks: 0,
            state: EpisodeState::Running,
            policy_faults: 0,
            render_failures: 0,
        })
    }

    /// Replaces the opening obstacles with a fixed layout.
    pub fn with_obstacles(mut self, obstacles: Vec<Obstacle>) -> Self {
        self.stream = ObstacleStream::from_obstacles(
            obstacles,
            &self.config.obstacles,
            self.sprites.segment_width(),
            self.sprites.segment_height(),
        );
        self
    }

    pub fn state(&self) -> EpisodeState {
        self.state
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    /// Accumulators of the live actors, aligned with [`Self::actors`].
    pub fn fitness(&self) -> &[f64] {
        &self.fitness
    }

    /// Original policy indices of the live actors.
    pub fn live_ids(&self) -> &[usize] {
        &self.ids
    }

    pub fn live(&self) -> usize {
        self.actors.len()
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        self.stream.obstacles()
    }

    pub fn ground(&self) -> &Scroller {
        &self.ground
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn abort(&mut self) {
        if self.state.is_running() {
            self.state = EpisodeState::Terminated(Termination::Aborted);
            info!(generation = self.generation, ticks = self.ticks, "episode aborted");
        }
    }

    /// Runs until termination, polling `input` before every tick.
    pub fn run(
        mut self,
        input: &mut dyn InputSource,
        renderer: &mut dyn Renderer,
    ) -> EpisodeOutcome {
        while self.state.is_running() {
            if input.abort_requested() {
                self.abort();
                break;
            }
            self.tick(renderer);
        }
        self.finish()
    }

    /// Advances the world by one tick. A no-op once terminated.
    pub fn tick(&mut self, renderer: &mut dyn Renderer) -> EpisodeState {
        if !self.state.is_running() {
            return self.state;
        }
        self.ticks += 1;
        let reference_x = self.config.physics.spawn_x;

        self.active = self.stream.active_index(reference_x);
        let gap = self.active.map(|i| {
            let o = &self.stream.obstacles()[i];
            (o.gap_top() as f32, o.gap_bottom() as f32)
        });

        self.move_and_decide(gap);

        self.ground.advance(self.config.field.ground_velocity);

        self.stream.advance();
        let hits = self.collisions();
        self.remove_marked(&hits, "collision");

        self.stream.retire_offscreen();
        let passed = self.stream.check_passed(reference_x);
        if passed > 0 {
            self.score += passed as u32;
            let bonus = self.config.fitness.pass_bonus * passed as f64;
            for fitness in &mut self.fitness {
                *fitness += bonus;
            }
            debug!(score = self.score, live = self.actors.len(), "obstacle passed");
        }
        self.stream.spawn_if_needed(&mut self.rng);

        let out_of_bounds = self.out_of_bounds();
        self.remove_marked(&out_of_bounds, "out of bounds");

        for actor in &mut self.actors {
            actor.animate(&self.config.physics);
        }

        self.present(renderer);

        if self.actors.is_empty() {
            self.terminate(Termination::Extinct);
        } else if self.config.episode.max_steps.is_some_and(|max| self.ticks >= max) {
            self.terminate(Termination::StepBudget);
        }
        self.state
    }

    /// Final fitness for every original policy. Aborts a running episode.
    pub fn finish(mut self) -> EpisodeOutcome {
        self.abort();
        for (&id, &fitness) in self.ids.iter().zip(&self.fitness) {
            self.final_fitness[id] = fitness;
        }
        let termination = match self.state {
            EpisodeState::Terminated(reason) => reason,
            EpisodeState::Running => Termination::Aborted,
        };
        EpisodeOutcome {
            termination,
            fitness: self.final_fitness,
            score: self.score,
            ticks: self.ticks,
            generation: self.generation,
            policy_faults: self.policy_faults,
            render_failures: self.render_failures,
        }
    }

    fn move_and_decide(&mut self, gap: Option<(f32, f32)>) {
        let physics = &self.config.physics;
        let survival = self.config.fitness.survival;
        for (actor, fitness) in self.actors.iter_mut().zip(&mut self.fitness) {
            *fitness += survival;
            actor.advance(physics);
        }

        let observations: Vec<Observation> = self
            .actors
            .iter()
            .map(|actor| observe(actor, gap))
            .collect();

        let decisions: Vec<Result<f32, PolicyError>> = if self.config.episode.parallel_policies {
            self.policies
                .par_iter_mut()
                .zip(observations.par_iter())
                .map(|(policy, observation)| policy.decide(observation))
                .collect()
        } else {
            self.policies
                .iter_mut()
                .zip(&observations)
                .map(|(policy, observation)| policy.decide(observation))
                .collect()
        };

        let threshold = self.config.episode.jump_threshold;
        for ((actor, decision), &id) in self.actors.iter_mut().zip(decisions).zip(&self.ids) {
            match decision {
                Ok(signal) if !signal.is_finite() => {
                    trace!(actor = id, signal, "policy returned a non-finite signal");
                    self.policy_faults += 1;
                }
                Ok(signal) if signal > threshold => actor.jump(physics),
                Ok(_) => {}
                Err(err) => {
                    trace!(actor = id, "policy failed: {err}");
                    self.policy_faults += 1;
                }
            }
        }
    }

    fn collisions(&mut self) -> Vec<bool> {
        let mut hit = vec![false; self.actors.len()];
        for obstacle in self.stream.obstacles() {
            for (i, actor) in self.actors.iter().enumerate() {
                if !hit[i] && obstacle.collides(actor, &self.sprites) {
                    hit[i] = true;
                    self.fitness[i] += self.config.fitness.collision;
                }
            }
        }
        hit
    }

    fn out_of_bounds(&self) -> Vec<bool> {
        let field = &self.config.field;
        self.actors
            .iter()
            .map(|actor| {
                let height = actor.mask(&self.sprites).height() as f32;
                actor.y + height - field.floor_tolerance >= field.floor_y
                    || actor.y < -field.ceiling_margin
            })
            .collect()
    }

    /// One compacting pass over every parallel collection.
    fn remove_marked(&mut self, marked: &[bool], cause: &str) {
        let mut removed = 0;
        for (i, _) in marked.iter().enumerate().filter(|(_, m)| **m) {
            self.final_fitness[self.ids[i]] = self.fitness[i];
            debug!(
                actor = self.ids[i],
                tick = self.ticks,
                fitness = self.fitness[i],
                cause,
                "actor eliminated"
            );
            removed += 1;
        }
        if removed == 0 {
            return;
        }
        retain_unmarked(&mut self.actors, marked);
        retain_unmarked(&mut self.policies, marked);
        retain_unmarked(&mut self.fitness, marked);
        retain_unmarked(&mut self.ids, marked);
    }

    fn present(&mut self, renderer: &mut dyn Renderer) {
        let snapshot = Snapshot {
            actors: &self.actors,
            obstacles: self.stream.obstacles(),
            ground: &self.ground,
            sprites: &self.sprites,
            active: self.active,
            score: self.score,
            live: self.actors.len(),
            generation: self.generation,
            tick: self.ticks,
        };
        if let Err(err) = renderer.present(&snapshot) {
            warn!(tick = self.ticks, "render failed: {err}");
            self.render_failures += 1;
        }
    }

    fn terminate(&mut self, reason: Termination) {
        self.state = EpisodeState::Terminated(reason);
        info!(
            generation = self.generation,
            score = self.score,
            ticks = self.ticks,
            reason = ?reason,
            "episode finished"
        );
    }
}

fn observe(actor: &Actor, gap: Option<(f32, f32)>) -> Observation {
    match gap {
        Some((top, bottom)) => Observation {
            y: actor.y,
            to_gap_top: (actor.y - top).abs(),
            to_gap_bottom: (actor.y - bottom).abs(),
        },
        None => Observation { y: actor.y, to_gap_top: 0.0, to_gap_bottom: 0.0 },
    }
}

fn retain_unmarked<T>(items: &mut Vec<T>, marked: &[bool]) {
    let mut idx = 0;
    items.retain(|_| {
        let keep = !marked[idx];
        idx += 1;
        keep
    });
}
