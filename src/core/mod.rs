//=========================================================================
// Core Systems
//
// Single-threaded building blocks of the flow engine.
//
// Responsibilities:
// - Observer lists with disconnectable subscriptions (`signal`)
// - Resource lifetimes tied to a phase or sub-flow (`scope`)
// - Top-level phase chaining and background controllers (`flow`)
// - Sequential, skippable presentation steps (`acts`)
// - The animation capability acts hand to the engine (`anim`)
//
// Notes:
// Nothing in `core` is Send. Work from other threads reaches it through
// the engine's event channel.
//
//=========================================================================

pub mod acts;
pub mod anim;
pub mod flow;
pub mod scope;
pub mod signal;
