//=========================================================================
// Acts Engine
//=========================================================================
//
// Sequential, skippable presentation steps.
//
// Architecture:
//   Scenario                one presentation run (e.g. one spin result)
//     └─ ActsRunner         cursor over the action list, one active at a time
//          └─ Action[]      lifecycle wrapper: started/completed/skipped
//               └─ Act      game code: action() / skip() / guard()
//
// Flow:
//   start() → next guarded action → apply() → ... completion ... → next
//   skip_all_if_possible() → skip until a Step/Disabled act, land there
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};

//=== Internal Dependencies ===============================================

use crate::core::anim::Animation;
use crate::error::ActError;

//=== Module Declarations =================================================

mod action;
mod runner;
mod scenario;

#[cfg(test)]
pub(crate) mod testing;

//=== Public API ==========================================================

pub use action::Action;
pub use runner::{ActsRunner, RunnerState};
pub use scenario::Scenario;

//=== Guard ===============================================================

/// Decides whether an act takes part in the current run.
///
/// Predicates are evaluated when the runner reaches the act, so an act can
/// drop out based on data produced by earlier acts.
#[derive(Clone)]
pub enum Guard {
    /// Fixed decision.
    Constant(bool),

    /// Decision made when the act is reached.
    Predicate(Rc<dyn Fn() -> bool>),
}

impl Guard {
    /// Builds a predicate guard.
    pub fn when<F: Fn() -> bool + 'static>(predicate: F) -> Self {
        Self::Predicate(Rc::new(predicate))
    }

    /// Resolves the guard to a decision.
    pub fn evaluate(&self) -> bool {
        match self {
            Self::Constant(value) => *value,
            Self::Predicate(predicate) => predicate(),
        }
    }
}

impl Default for Guard {
    fn default() -> Self {
        Self::Constant(true)
    }
}

impl From<bool> for Guard {
    fn from(value: bool) -> Self {
        Self::Constant(value)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

//=== SkipPolicy ==========================================================

/// How an act behaves under fast-forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkipPolicy {
    /// Fast-forward skips it silently.
    #[default]
    Skippable,

    /// Can be skipped on its own, but fast-forward stops and plays it.
    Step,

    /// Can never be skipped; fast-forward stops in front of it.
    Disabled,
}

//=== ActOutcome ==========================================================

/// Work handed back by [`Act::action`].
pub enum ActOutcome {
    /// The step finished synchronously.
    Done,

    /// The step finishes when the future resolves.
    ///
    /// Requires a scenario built with a local spawner.
    Future(LocalBoxFuture<'static, Result<(), ActError>>),

    /// The step finishes when the animation does.
    Animation(Box<dyn Animation>),
}

impl ActOutcome {
    /// Wraps an animation handle.
    pub fn animation<A: Animation + 'static>(animation: A) -> Self {
        Self::Animation(Box::new(animation))
    }

    /// Wraps a future.
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = Result<(), ActError>> + 'static,
    {
        Self::Future(future.boxed_local())
    }
}

impl fmt::Debug for ActOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => f.write_str("Done"),
            Self::Future(_) => f.write_str("Future(..)"),
            Self::Animation(_) => f.write_str("Animation(..)"),
        }
    }
}

//=== Act Trait ===========================================================

/// A unit of presentation behavior.
///
/// # Contract
///
/// `skip` must leave every piece of state this act touches at the value
/// `action` would have produced by playing through: set the win counter
/// to its end value instead of counting up, apply the sticky symbols
/// instead of dropping them in. It may be called after `action` started,
/// without `action` ever running, or after natural completion, so it must
/// be safe to apply more than once.
///
/// # Minimal Implementation
///
/// ```
/// use aetheric_flow::prelude::*;
///
/// struct ShowBigWin { shown: bool }
///
/// impl Act for ShowBigWin {
///     fn skip_policy(&self) -> SkipPolicy {
///         SkipPolicy::Step
///     }
///
///     fn action(&mut self) -> Result<ActOutcome, ActError> {
///         self.shown = true;
///         Ok(ActOutcome::Done)
///     }
///
///     fn skip(&mut self) {
///         self.shown = true;
///     }
/// }
/// ```
pub trait Act {
    /// Identity used in logs and failures. Defaults to the type name.
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Whether the act takes part in the run. Read once when compiled
    /// into an [`Action`]; predicates are evaluated when reached.
    fn guard(&self) -> Guard {
        Guard::default()
    }

    /// Fast-forward behavior. Read once when compiled into an [`Action`].
    fn skip_policy(&self) -> SkipPolicy {
        SkipPolicy::default()
    }

    /// Plays the step.
    fn action(&mut self) -> Result<ActOutcome, ActError>;

    /// Commits the step's final state without playing it.
    fn skip(&mut self);
}

//=== SkipAll =============================================================

/// Options for [`ActsRunner::skip_all_if_possible`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipAll {
    /// Also skip the action currently playing.
    pub include_current: bool,
}

impl SkipAll {
    /// Skip the current action and everything up to the next stop.
    pub const INCLUDE_CURRENT: Self = Self {
        include_current: true,
    };

    /// Let the current action finish; skip what follows up to the next stop.
    pub const UPCOMING: Self = Self {
        include_current: false,
    };
}

impl Default for SkipAll {
    fn default() -> Self {
        Self::INCLUDE_CURRENT
    }
}

//=========================================================================
// Tests
//=========================================================================
