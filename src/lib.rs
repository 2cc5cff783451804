//! Side-scrolling obstacle game driven by a population of controllers.
//!
//! Each episode spawns one actor per policy; every tick the world moves, each
//! policy decides whether its actor jumps, and fitness accrues per actor until
//! the population dies out, the step budget runs out, or the input aborts.

pub mod actor;
pub mod config;
pub mod draw;
pub mod error;
pub mod evaluator;
pub mod mask;
pub mod obstacle;
pub mod policy;
pub mod scroller;
pub mod stream;

pub use actor::Actor;
pub use config::GameConfig;
pub use draw::{FrameRenderer, NullRenderer};
pub use error::{ConfigError, PolicyError, RenderError};
pub use evaluator::{
    EpisodeContext, EpisodeOutcome, EpisodeState, FitnessSink, InputSource, NeverAbort,
    PopulationEvaluator, Renderer, Snapshot, StopFlag, Termination,
};
pub use mask::{Mask, Sprites};
pub use obstacle::Obstacle;
pub use policy::{
    ControlPolicy, FeedForwardPolicy, GapFollower, ManualPolicy, Observation, RecordingPolicy,
    ReplayPolicy,
};
pub use scroller::Scroller;
pub use stream::ObstacleStream;
