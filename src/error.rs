//=========================================================================
// Error Types
//=========================================================================
//
// Two layers of failure:
//   ActError:  a single presentation step failed (action or animation)
//   FlowError: a phase, scope or scenario could not finish cleanly
//
// Misuse of runner/scenario methods (calling before start, after
// completion, skipping a skip-disabled step) is never an error: those
// calls are silent no-ops.
//
//=========================================================================

//=== External Dependencies ===============================================

use thiserror::Error;

//=== ActError ============================================================

/// Failure raised by an act or by the animation it returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActError {
    /// The act's own `action()` reported a failure.
    #[error("act failed: {0}")]
    Failed(String),

    /// The animation handle returned by the act finished with an error.
    #[error("animation failed: {0}")]
    Animation(String),

    /// Future-based work could not be scheduled.
    #[error("could not spawn act work: {0}")]
    Spawn(String),
}

impl ActError {
    /// Convenience constructor for [`ActError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

//=== ActFailure ==========================================================

/// An [`ActError`] tagged with the identity of the offending act.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("act #{index} ({name}) failed: {error}")]
pub struct ActFailure {
    /// Position of the act in its scenario.
    pub index: usize,

    /// Name reported by the act.
    pub name: String,

    /// Underlying error.
    #[source]
    pub error: ActError,
}

//=== FlowError ===========================================================

/// Errors surfaced by scopes, flow phases and the engine host loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// A `wait` was abandoned because its scope was disposed first.
    #[error("scope disposed before the awaited signal fired")]
    ScopeDisposed,

    /// One or more cleanup callbacks panicked during disposal.
    ///
    /// Teardown still ran to the end; `first` holds the first panic message.
    #[error("{failed} cleanup callback(s) panicked, first: {first}")]
    Cleanup { failed: usize, first: String },

    /// A scenario stopped because one of its acts failed.
    #[error(transparent)]
    Act(#[from] ActFailure),

    /// Work could not be handed to the local executor.
    #[error("spawn failed: {0}")]
    Spawn(String),

    /// Free-form failure raised by game phase code.
    #[error("{0}")]
    Phase(String),
}

impl FlowError {
    /// Convenience constructor for [`FlowError::Phase`].
    pub fn phase(message: impl Into<String>) -> Self {
        Self::Phase(message.into())
    }
}

//=== Panic Payloads ======================================================

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn act_failure_display_names_the_act() {
        let failure = ActFailure {
            index: 2,
            name: "PaysAct".to_string(),
            error: ActError::failed("missing pay table"),
        };

        assert_eq!(
            failure.to_string(),
            "act #2 (PaysAct) failed: act failed: missing pay table"
        );
    }

    #[test]
    fn act_failure_converts_into_flow_error() {
        let failure = ActFailure {
            index: 0,
            name: "StopReels".to_string(),
            error: ActError::Animation("timeline error".to_string()),
        };

        let err: FlowError = failure.clone().into();
        assert_eq!(err, FlowError::Act(failure));
    }

    #[test]
    fn panic_message_handles_str_and_string() {
        let a: Box<dyn std::any::Any + Send> = Box::new("static");
        let b: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        let c: Box<dyn std::any::Any + Send> = Box::new(7_u32);

        assert_eq!(panic_message(a.as_ref()), "static");
        assert_eq!(panic_message(b.as_ref()), "owned");
        assert_eq!(panic_message(c.as_ref()), "unknown panic");
    }
}
