//=========================================================================
// Flow System
//=========================================================================
//
// Top-level game flow built from phases.
//
// Architecture:
//   FlowLoop::run(ctx, first)
//     └─ Phase(scope, ctx) → next Phase | None
//   ControllerStore
//     └─ background controllers kept in the shared context
//
//=========================================================================

//=== Module Declarations =================================================

mod controller_store;
mod flow_loop;

//=== Public API ==========================================================

pub use controller_store::{Controller, ControllerStore};
pub use flow_loop::{FlowLoop, Phase, PhaseResult};
