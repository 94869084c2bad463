mod engine;
mod step;

pub use engine::{PlaybackEngine, PlaybackPhase, PlaybackSnapshot, StepOutcome};
pub use step::{Scenario, ScenarioInfo, Step, StepAction, StepContext};
