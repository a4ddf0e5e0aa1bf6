//=========================================================================
// FnAct
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;

//=== Internal Dependencies ===============================================

use crate::core::acts::{Act, ActOutcome, Guard, SkipPolicy};
use crate::error::ActError;

type ActionFn = Box<dyn FnMut() -> Result<ActOutcome, ActError>>;
type SkipFn = Box<dyn FnMut()>;

//=== FnAct ===============================================================

/// Act assembled from closures.
///
/// Without an action closure the act completes immediately; without a
/// skip closure skipping changes nothing.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use aetheric_flow::prelude::*;
///
/// let goes_idle = Rc::new(Cell::new(false));
/// let (a, s) = (Rc::clone(&goes_idle), Rc::clone(&goes_idle));
///
/// let act = FnAct::new("GoIdle")
///     .policy(SkipPolicy::Step)
///     .on_action(move || {
///         a.set(true);
///         Ok(ActOutcome::Done)
///     })
///     .on_skip(move || s.set(true));
///
/// assert_eq!(act.name(), "GoIdle");
/// ```
pub struct FnAct {
    name: String,
    guard: Guard,
    policy: SkipPolicy,
    action: Option<ActionFn>,
    skip: Option<SkipFn>,
}

impl FnAct {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guard: Guard::default(),
            policy: SkipPolicy::default(),
            action: None,
            skip: None,
        }
    }

    //--- Builder ----------------------------------------------------------

    pub fn guard(mut self, guard: impl Into<Guard>) -> Self {
        self.guard = guard.into();
        self
    }

    pub fn policy(mut self, policy: SkipPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn on_action<F>(mut self, action: F) -> Self
    where
        F: FnMut() -> Result<ActOutcome, ActError> + 'static,
    {
        self.action = Some(Box::new(action));
        self
    }

    pub fn on_skip<F>(mut self, skip: F) -> Self
    where
        F: FnMut() + 'static,
    {
        self.skip = Some(Box::new(skip));
        self
    }

    /// Boxes the act for [`Scenario::new`](crate::core::acts::Scenario::new).
    pub fn boxed(self) -> Box<dyn Act> {
        Box::new(self)
    }
}

impl Act for FnAct {
    fn name(&self) -> &str {
        &self.name
    }

    fn guard(&self) -> Guard {
        self.guard.clone()
    }

    fn skip_policy(&self) -> SkipPolicy {
        self.policy
    }

    fn action(&mut self) -> Result<ActOutcome, ActError> {
        match self.action.as_mut() {
            Some(action) => action(),
            None => Ok(ActOutcome::Done),
        }
    }

    fn skip(&mut self) {
        if let Some(skip) = self.skip.as_mut() {
            skip();
        }
    }
}

impl fmt::Debug for FnAct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAct")
            .field("name", &self.name)
            .field("guard", &self.guard)
            .field("policy", &self.policy)
            .finish()
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn empty_act_completes_and_skips_quietly() {
        let mut act = FnAct::new("Noop");
        assert!(matches!(act.action(), Ok(ActOutcome::Done)));
        act.skip();
    }

    #[test]
    fn builder_carries_flags() {
        let act = FnAct::new("Intro")
            .guard(false)
            .policy(SkipPolicy::Disabled);

        assert_eq!(act.name(), "Intro");
        assert!(!Act::guard(&act).evaluate());
        assert_eq!(act.skip_policy(), SkipPolicy::Disabled);
    }

    #[test]
    fn closures_are_invoked() {
        let calls = Rc::new(Cell::new(0));
        let (a, s) = (Rc::clone(&calls), Rc::clone(&calls));
        let mut act = FnAct::new("Count")
            .on_action(move || {
                a.set(a.get() + 1);
                Ok(ActOutcome::Done)
            })
            .on_skip(move || s.set(s.get() + 10));

        act.action().unwrap();
        act.skip();
        assert_eq!(calls.get(), 11);
    }
}
