//=========================================================================
// Animation Capability
//=========================================================================
//
// The acts engine never knows a concrete animation library. Anything
// that can be started, reports when it is finished and can be stopped
// early is an `Animation`.
//
// Architecture:
//   Animation (trait)
//     ├─ Tween     duration-based handle stepped by a Ticker
//     └─ Timeline  sequential steps of parallel animations
//   Ticker
//     └─ host-driven clock: advance(dt) steps every live Tween
//
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::error::ActError;

//=== Module Declarations =================================================

mod ticker;
mod timeline;

//=== Public API ==========================================================

pub use ticker::{Ticker, Tween};
pub use timeline::Timeline;

/// How an animation ended.
pub type AnimationEnd = Result<(), ActError>;

/// Callback fired once when an animation finishes on its own.
pub type FinishCallback = Box<dyn FnOnce(AnimationEnd)>;

//=== Animation Trait =====================================================

/// Externally driven, time-based work an act can hand to the engine.
///
/// Adapt your animation primitive to this trio: start it, get told when
/// it is done, force-stop it.
///
/// # Contract
///
/// - `on_finished` callbacks fire at most once, and never after `kill`.
/// - An animation that finishes synchronously inside `start` fires its
///   callbacks from within `start`.
/// - `kill` must also stop side effects the animation owns, such as
///   looping sound effects.
pub trait Animation {
    /// Begins playback. Calling it twice has no further effect.
    fn start(&mut self);

    /// Returns true once playback has reached its end.
    fn is_finished(&self) -> bool;

    /// Registers a callback for natural completion.
    fn on_finished(&mut self, callback: FinishCallback);

    /// Stops playback immediately and drops pending callbacks.
    fn kill(&mut self);
}

impl<A: Animation + ?Sized> Animation for Box<A> {
    fn start(&mut self) {
        (**self).start()
    }

    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }

    fn on_finished(&mut self, callback: FinishCallback) {
        (**self).on_finished(callback)
    }

    fn kill(&mut self) {
        (**self).kill()
    }
}
