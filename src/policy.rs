//! Control policies: anything that turns an observation into a jump signal.

use crate::error::PolicyError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// What a policy sees each tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub y: f32,
    /// `|y - gap_top|` of the active obstacle.
    pub to_gap_top: f32,
    /// `|y - gap_bottom|` of the active obstacle.
    pub to_gap_bottom: f32,
}

impl Observation {
    pub const INPUTS: usize = 3;

    pub fn inputs(&self) -> [f32; Self::INPUTS] {
        [self.y, self.to_gap_top, self.to_gap_bottom]
    }
}

/// Shared interface implemented by every controller driving an actor.
pub trait ControlPolicy: Send {
    fn kind(&self) -> &'static str;

    /// Jump signal for this tick. Every finite value is in range: the
    /// evaluator jumps when it exceeds the configured threshold. Errors and
    /// non-finite values count as "no jump".
    fn decide(&mut self, observation: &Observation) -> Result<f32, PolicyError>;
}

impl<P: ControlPolicy + ?Sized> ControlPolicy for Box<P> {
    fn kind(&self) -> &'static str {
        (**self).kind()
    }

    fn decide(&mut self, observation: &Observation) -> Result<f32, PolicyError> {
        (**self).decide(observation)
    }
}

/// Single hidden layer, tanh activations throughout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedForwardPolicy {
    hidden: usize,
    /// `hidden x (inputs + 1)`, bias last in each row.
    w1: Vec<f32>,
    /// `hidden + 1`, bias last.
    w2: Vec<f32>,
}

impl FeedForwardPolicy {
    pub fn new(hidden: usize, w1: Vec<f32>, w2: Vec<f32>) -> Result<Self, PolicyError> {
        let expected = hidden * (Observation::INPUTS + 1);
        if w1.len() != expected {
            return Err(PolicyError::InputArity { expected, actual: w1.len() });
        }
        if w2.len() != hidden + 1 {
            return Err(PolicyError::InputArity { expected: hidden + 1, actual: w2.len() });
        }
        Ok(Self { hidden, w1, w2 })
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R, hidden: usize) -> Self {
        let w1 = (0..hidden * (Observation::INPUTS + 1))
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect();
        let w2 = (0..hidden + 1).map(|_| rng.gen_range(-1.0..1.0)).collect();
        Self { hidden, w1, w2 }
    }

    /// Perturbs each weight with probability `rate` by up to `scale`.
    pub fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R, rate: f32, scale: f32) {
        for w in self.w1.iter_mut().chain(self.w2.iter_mut()) {
            if rng.r#gen::<f32>() < rate {
                *w += rng.gen_range(-scale..scale);
            }
        }
    }

    pub fn activate(&self, inputs: &[f32]) -> Result<f32, PolicyError> {
        if inputs.len() != Observation::INPUTS {
            return Err(PolicyError::InputArity {
                expected: Observation::INPUTS,
                actual: inputs.len(),
            });
        }
        let stride = Observation::INPUTS + 1;
        let mut out = self.w2[self.hidden];
        for (h, row) in self.w1.chunks_exact(stride).enumerate() {
            let sum: f32 = row[..Observation::INPUTS]
                .iter()
                .zip(inputs)
                .map(|(w, x)| w * x)
                .sum::<f32>()
                + row[Observation::INPUTS];
            out += self.w2[h] * sum.tanh();
        }
        let out = out.tanh();
        if out.is_finite() { Ok(out) } else { Err(PolicyError::NonFinite(out)) }
    }
}

impl ControlPolicy for FeedForwardPolicy {
    fn kind(&self) -> &'static str {
        "feed-forward"
    }

    fn decide(&mut self, observation: &Observation) -> Result<f32, PolicyError> {
        self.activate(&observation.inputs())
    }
}

/// Flaps whenever the actor sits lower than `bias` pixels below the gap's
/// midpoint (or below the gap entirely).
#[derive(Clone, Debug, PartialEq)]
pub struct GapFollower {
    pub bias: f32,
}

impl Default for GapFollower {
    fn default() -> Self {
        Self { bias: 40.0 }
    }
}

impl ControlPolicy for GapFollower {
    fn kind(&self) -> &'static str {
        "gap-follower"
    }

    fn decide(&mut self, observation: &Observation) -> Result<f32, PolicyError> {
        // Inside the gap the difference is twice the offset from the midpoint;
        // below it, it equals the gap size.
        let below_mid = (observation.to_gap_top - observation.to_gap_bottom) / 2.0;
        Ok(if below_mid > self.bias { 1.0 } else { 0.0 })
    }
}

/// Plays back a recorded tape of jump decisions.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayPolicy {
    tape: Vec<bool>,
    cursor: usize,
}

impl ReplayPolicy {
    pub fn new(tape: Vec<bool>) -> Self {
        Self { tape, cursor: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.tape.len().saturating_sub(self.cursor)
    }
}

impl ControlPolicy for ReplayPolicy {
    fn kind(&self) -> &'static str {
        "replay"
    }

    fn decide(&mut self, _observation: &Observation) -> Result<f32, PolicyError> {
        let Some(&jump) = self.tape.get(self.cursor) else {
            return Err(PolicyError::TapeExhausted(self.tape.len()));
        };
        self.cursor += 1;
        Ok(if jump { 1.0 } else { 0.0 })
    }
}

/// Wraps a policy and records each decision as a jump/no-jump tape.
#[derive(Clone, Debug)]
pub struct RecordingPolicy<P> {
    inner: P,
    threshold: f32,
    tape: Vec<bool>,
}

impl<P: ControlPolicy> RecordingPolicy<P> {
    pub fn new(inner: P, threshold: f32) -> Self {
        Self { inner, threshold, tape: Vec::new() }
    }

    pub fn tape(&self) -> &[bool] {
        &self.tape
    }

    pub fn into_replay(self) -> ReplayPolicy {
        ReplayPolicy::new(self.tape)
    }
}

impl<P: ControlPolicy> ControlPolicy for RecordingPolicy<P> {
    fn kind(&self) -> &'static str {
        "recording"
    }

    fn decide(&mut self, observation: &Observation) -> Result<f32, PolicyError> {
        let result = self.inner.decide(observation);
        let jumped = matches!(result, Ok(signal) if signal > self.threshold);
        self.tape.push(jumped);
        result
    }
}

/// Player control: a flap request set from the input side is consumed by the
/// next decision.
#[derive(Clone, Debug, Default)]
pub struct ManualPolicy {
    flap: Arc<AtomicBool>,
}

impl ManualPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the input side.
    pub fn trigger(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flap)
    }
}

impl ControlPolicy for ManualPolicy {
    fn kind(&self) -> &'static str {
        "manual"
    }

    fn decide(&mut self, _observation: &Observation) -> Result<f32, PolicyError> {
        Ok(if self.flap.swap(false, Ordering::AcqRel) { 1.0 } else { 0.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    const OBS: Observation = Observation { y: 300.0, to_gap_top: 50.0, to_gap_bottom: 150.0 };

    #[test]
    fn feed_forward_output_is_bounded() {
        let mut rng = SmallRng::seed_from_u64(9);
        let mut net = FeedForwardPolicy::random(&mut rng, 4);
        for y in [-1000.0, 0.0, 350.0, 1e6] {
            let obs = Observation { y, ..OBS };
            let out = net.decide(&obs).unwrap();
            assert!((-1.0..=1.0).contains(&out));
        }
    }

    #[test]
    fn feed_forward_known_weights() {
        // One hidden unit that copies `y`, output copies the hidden unit.
        let net = FeedForwardPolicy::new(1, vec![1.0, 0.0, 0.0, 0.0], vec![1.0, 0.0]).unwrap();
        let out = net.activate(&[0.5, 9.0, 9.0]).unwrap();
        assert!((out - 0.5f32.tanh().tanh()).abs() < 1e-6);
        assert!(net.activate(&[1.0]).is_err());
        assert!(FeedForwardPolicy::new(2, vec![0.0; 3], vec![0.0; 3]).is_err());
    }

    #[test]
    fn mutation_changes_weights() {
        let mut rng = SmallRng::seed_from_u64(2);
        let net = FeedForwardPolicy::random(&mut rng, 3);
        let mut child = net.clone();
        child.mutate(&mut rng, 1.0, 0.5);
        assert_ne!(net, child);
    }

    #[test]
    fn gap_follower_flaps_when_low() {
        let mut policy = GapFollower::default();
        // Near the top of the gap.
        assert_eq!(policy.decide(&OBS).unwrap(), 0.0);
        // Below the gap.
        let low = Observation { y: 500.0, to_gap_top: 250.0, to_gap_bottom: 50.0 };
        assert_eq!(policy.decide(&low).unwrap(), 1.0);
    }

    #[test]
    fn replay_then_exhausted() {
        let mut policy = ReplayPolicy::new(vec![true, false]);
        assert_eq!(policy.decide(&OBS), Ok(1.0));
        assert_eq!(policy.decide(&OBS), Ok(0.0));
        assert_eq!(policy.decide(&OBS), Err(PolicyError::TapeExhausted(2)));
    }

    #[test]
    fn recording_round_trips_through_replay() {
        let mut recorder = RecordingPolicy::new(ReplayPolicy::new(vec![false, true, true]), 0.5);
        for _ in 0..4 {
            let _ = recorder.decide(&OBS);
        }
        assert_eq!(recorder.tape(), &[false, true, true, false]);
        let mut replay = recorder.into_replay();
        assert_eq!(replay.remaining(), 4);
        assert_eq!(replay.decide(&OBS), Ok(0.0));
    }

    #[test]
    fn manual_flap_is_consumed() {
        let mut policy = ManualPolicy::new();
        let trigger = policy.trigger();
        assert_eq!(policy.decide(&OBS).unwrap(), 0.0);
        trigger.store(true, Ordering::Release);
        assert_eq!(policy.decide(&OBS).unwrap(), 1.0);
        assert_eq!(policy.decide(&OBS).unwrap(), 0.0);
    }
}
