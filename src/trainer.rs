use flappy::{ControlPolicy, EpisodeOutcome, FeedForwardPolicy, FitnessSink, Termination};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::info;

pub const HIDDEN: usize = 6;
const MUTATION_RATE: f32 = 0.3;
const MUTATION_SCALE: f32 = 0.25;

#[derive(Clone, Debug, PartialEq)]
pub struct GenerationReport {
    pub generation: u32,
    pub best: f64,
    pub mean: f64,
    pub score: u32,
    pub ticks: u64,
    pub termination: Termination,
}

/// Keeps the single best network each generation and fills the rest of the
/// population with mutated copies of it.
pub struct Trainer {
    population: Vec<FeedForwardPolicy>,
    fitness: Vec<f64>,
    rng: SmallRng,
    history: Vec<GenerationReport>,
}

impl Trainer {
    pub fn new(size: usize, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let population = (0..size)
            .map(|_| FeedForwardPolicy::random(&mut rng, HIDDEN))
            .collect();
        Self {
            population,
            fitness: vec![0.0; size],
            rng,
            history: Vec::new(),
        }
    }

    pub fn policies(&self) -> Vec<Box<dyn ControlPolicy>> {
        self.population
            .iter()
            .cloned()
            .map(|p| Box::new(p) as Box<dyn ControlPolicy>)
            .collect()
    }

    pub fn history(&self) -> &[GenerationReport] {
        &self.history
    }

    /// Scores the finished generation and breeds the next one.
    pub fn evolve(&mut self, outcome: &EpisodeOutcome) -> GenerationReport {
        self.fitness.fill(0.0);
        outcome.deliver(self);

        let (best_idx, best) = self
            .fitness
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((0, 0.0));

        let report = GenerationReport {
            generation: outcome.generation,
            best,
            mean: outcome.mean(),
            score: outcome.score,
            ticks: outcome.ticks,
            termination: outcome.termination,
        };
        info!(
            generation = report.generation,
            best = report.best,
            mean = report.mean,
            score = report.score,
            ticks = report.ticks,
            reason = ?report.termination,
            "generation complete"
        );

        let parent = self.population[best_idx].clone();

        let size = self.population.len();
        let mut next = Vec::with_capacity(size);
        next.push(parent.clone());
        while next.len() < size {
            let mut child = parent.clone();
            child.mutate(&mut self.rng, MUTATION_RATE, MUTATION_SCALE);
            next.push(child);
        }
        self.population = next;
        self.history.push(report.clone());
        report
    }
}

impl FitnessSink for Trainer {
    fn record(&mut self, index: usize, fitness: f64) {
        if let Some(slot) = self.fitness.get_mut(index) {
            *slot = fitness;
        }
    }
}
