//=========================================================================
// Presentation Acts
//=========================================================================
//
// Reusable building blocks for game presentation sequences.
//
// Architecture:
//   FnAct          closures for action/skip, for one-off steps
//   CounterAct     win/balance counter counting up to a target
//   TransitionAct  state change after a short delay
//   play_scenario  runs a Scenario inside a phase scope, routing skips
//
// Each act commits the same final state whether played or skipped.
//
//=========================================================================

//=== Module Declarations =================================================

mod counter_act;
mod fn_act;
mod round;
mod transition_act;

//=== Public API ==========================================================

pub use counter_act::CounterAct;
pub use fn_act::FnAct;
pub use round::play_scenario;
pub use transition_act::{TransitionAct, DEFAULT_TRANSITION_DELAY};
