//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use aetheric_flow::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Engine host loop
pub use crate::engine::{Engine, EngineBuilder, EngineEvent, EngineHandle, EngineServices, TickControl};

// Signals and scopes
pub use crate::core::scope::{Scope, Wait};
pub use crate::core::signal::{Connection, Signal};

// Flow
pub use crate::core::flow::{Controller, ControllerStore, FlowLoop, Phase, PhaseResult};

// Acts engine
pub use crate::core::acts::{
    Act, ActOutcome, Action, ActsRunner, Guard, RunnerState, Scenario, SkipAll, SkipPolicy,
};

// Animation capability
pub use crate::core::anim::{Animation, AnimationEnd, FinishCallback, Ticker, Timeline, Tween};

// Presentation acts
pub use crate::presentation::{play_scenario, CounterAct, FnAct, TransitionAct, DEFAULT_TRANSITION_DELAY};

// Errors
pub use crate::error::{ActError, ActFailure, FlowError};
