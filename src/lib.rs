//=========================================================================
// Aetheric Flow — Library Root
//
// This crate defines the public API surface of Aetheric Flow, a
// presentation sequencer for slot-style games.
//
// Responsibilities:
// - Expose the scoped flow primitives (`Scope`, `FlowLoop`, `Phase`)
// - Expose the skippable acts engine (`Act`, `Scenario`, `ActsRunner`)
// - Provide the host loop (`Engine`) tying flow, animation clock and
//   player requests together
//
// Typical usage:
// ```no_run
// use std::rc::Rc;
// use aetheric_flow::prelude::*;
//
// struct Game;
//
// async fn main_loop(scope: Scope, _game: Rc<Game>) -> PhaseResult<Game> {
//     loop {
//         scope.run(|round| async move { /* one spin */ }).await;
//     }
// }
//
// fn main() {
//     EngineBuilder::new()
//         .build()
//         .run(Rc::new(Game), Phase::new(main_loop))
//         .unwrap();
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` contains the engine primitives (signals, scopes, flow, acts,
// animation capability). Game code mostly reaches them via `prelude`.
//
// `presentation` holds reusable acts and the scenario playback glue.
//
pub mod core;
pub mod error;
pub mod prelude;
pub mod presentation;

//--- Internal Modules ----------------------------------------------------
//
// `engine` defines the host loop and its configuration.
//
mod engine;

//--- Public Exports ------------------------------------------------------
//
// Re-exports the host loop types so applications can simply
// `use aetheric_flow::EngineBuilder;`.
//
pub use engine::{Engine, EngineBuilder, EngineEvent, EngineHandle, EngineServices, TickControl};
