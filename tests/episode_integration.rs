use flappy::{
    ControlPolicy, EpisodeContext, FeedForwardPolicy, GameConfig, GapFollower, NeverAbort,
    NullRenderer, Observation, PolicyError, PopulationEvaluator, StopFlag, Termination,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::io::Write;

#[derive(Clone)]
struct Constant(f32);

impl ControlPolicy for Constant {
    fn kind(&self) -> &'static str {
        "constant"
    }

    fn decide(&mut self, _observation: &Observation) -> Result<f32, PolicyError> {
        Ok(self.0)
    }
}

fn budgeted(max_steps: u64) -> GameConfig {
    let mut config = GameConfig::default();
    config.episode.max_steps = Some(max_steps);
    config
}

#[test]
fn population_only_shrinks() {
    let mut ctx = EpisodeContext::new(budgeted(400), 42).unwrap();
    let mut rng = SmallRng::seed_from_u64(42);
    let policies: Vec<Box<dyn ControlPolicy>> = (0..20)
        .map(|_| Box::new(FeedForwardPolicy::random(&mut rng, 4)) as Box<dyn ControlPolicy>)
        .collect();
    let mut eval = PopulationEvaluator::new(&mut ctx, policies).unwrap();

    let mut live = eval.live();
    assert_eq!(live, 20);
    while eval.tick(&mut NullRenderer).is_running() {
        assert!(eval.live() <= live);
        assert!(eval.live() > 0);
        live = eval.live();
        let mut ids = eval.live_ids().to_vec();
        ids.dedup();
        assert_eq!(ids.len(), eval.live());
        assert!(!eval.obstacles().is_empty());
    }

    let outcome = eval.finish();
    assert_eq!(outcome.fitness.len(), 20);
    assert!(outcome.ticks <= 400);
}

#[test]
fn free_fall_reaches_the_floor() {
    let mut ctx = EpisodeContext::new(GameConfig::default(), 1).unwrap();
    let eval = PopulationEvaluator::new(&mut ctx, vec![Constant(0.0); 3]).unwrap();
    let outcome = eval.run(&mut NeverAbort, &mut NullRenderer);
    assert_eq!(outcome.termination, Termination::Extinct);
    assert_eq!(outcome.ticks, 24);
    assert_eq!(outcome.score, 0);
    for fitness in &outcome.fitness {
        assert!((fitness - 2.4).abs() < 1e-9);
    }
}

#[test]
fn constant_flapping_leaves_through_the_ceiling() {
    let mut ctx = EpisodeContext::new(GameConfig::default(), 1).unwrap();
    let eval = PopulationEvaluator::new(&mut ctx, vec![Constant(1.0)]).unwrap();
    let outcome = eval.run(&mut NeverAbort, &mut NullRenderer);
    assert_eq!(outcome.termination, Termination::Extinct);
    // 351.5 after the first tick, then 11 up per tick: below -50 on tick 38.
    assert_eq!(outcome.ticks, 38);
}

#[test]
fn gap_follower_scores() {
    let mut ctx = EpisodeContext::new(budgeted(3_000), 7).unwrap();
    let eval = PopulationEvaluator::new(&mut ctx, vec![GapFollower::default()]).unwrap();
    let outcome = eval.run(&mut NeverAbort, &mut NullRenderer);
    assert!(outcome.score >= 1, "gap follower passed nothing: {outcome:?}");
    assert_eq!(outcome.policy_faults, 0);
}

#[test]
fn episodes_are_reproducible_per_seed() {
    let run = |seed| {
        let mut ctx = EpisodeContext::new(budgeted(800), seed).unwrap();
        let policies: Vec<_> = (0..5)
            .map(|i| GapFollower { bias: 20.0 + i as f32 * 15.0 })
            .collect();
        PopulationEvaluator::new(&mut ctx, policies)
            .unwrap()
            .run(&mut NeverAbort, &mut NullRenderer)
    };
    assert_eq!(run(3), run(3));
}

#[test]
fn consecutive_episodes_advance_the_generation() {
    let mut ctx = EpisodeContext::new(budgeted(5), 0).unwrap();
    for expected in 1..=3 {
        let outcome = PopulationEvaluator::new(&mut ctx, vec![Constant(0.0)])
            .unwrap()
            .run(&mut NeverAbort, &mut NullRenderer);
        assert_eq!(outcome.generation, expected);
    }
    assert_eq!(ctx.generation(), 3);
}

#[test]
fn raised_stop_flag_aborts_before_the_first_tick() {
    let mut ctx = EpisodeContext::new(GameConfig::default(), 0).unwrap();
    let mut stop = StopFlag::new();
    stop.clone().raise();
    let outcome = PopulationEvaluator::new(&mut ctx, vec![Constant(0.0), Constant(0.0)])
        .unwrap()
        .run(&mut stop, &mut NullRenderer);
    assert_eq!(outcome.termination, Termination::Aborted);
    assert_eq!(outcome.ticks, 0);
    assert_eq!(outcome.fitness, vec![0.0, 0.0]);
}

#[test]
fn config_file_feeds_the_context() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "episode": {{ "population": 3, "max_steps": 12 }} }}"#).unwrap();
    let config = GameConfig::from_json_file(file.path()).unwrap();
    let mut ctx = EpisodeContext::new(config, 0).unwrap();
    let population = ctx.config().episode.population;
    let policies: Vec<_> = (0..population).map(|_| Constant(0.0)).collect();
    let outcome = PopulationEvaluator::new(&mut ctx, policies)
        .unwrap()
        .run(&mut NeverAbort, &mut NullRenderer);
    assert_eq!(outcome.termination, Termination::StepBudget);
    assert_eq!(outcome.fitness.len(), 3);
    assert_eq!(outcome.ticks, 12);
}
