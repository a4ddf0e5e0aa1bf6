//=========================================================================
// Test Doubles
//=========================================================================
//
// Scripted acts and a hand-driven animation for engine tests.
//
//=========================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{Act, ActOutcome, Action, Guard, SkipPolicy};
use crate::core::anim::{Animation, FinishCallback};
use crate::error::ActError;

//=== ManualAnimation =====================================================

#[derive(Default)]
struct ManualState {
    started: Cell<bool>,
    finished: Cell<bool>,
    killed: Cell<bool>,
    keep_callbacks_on_kill: bool,
    callbacks: RefCell<Vec<FinishCallback>>,
}

/// Animation finished by the test, not by a clock.
#[derive(Clone, Default)]
pub(crate) struct ManualAnimation {
    state: Rc<ManualState>,
}

impl ManualAnimation {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Misbehaving animation that still reports completion after kill.
    pub(crate) fn ignoring_kill() -> Self {
        Self {
            state: Rc::new(ManualState {
                keep_callbacks_on_kill: true,
                ..ManualState::default()
            }),
        }
    }

    pub(crate) fn finish(&self) {
        self.end(Ok(()));
    }

    pub(crate) fn fail(&self, message: &str) {
        self.end(Err(ActError::Animation(message.to_string())));
    }

    fn end(&self, end: Result<(), ActError>) {
        self.state.finished.set(true);
        let callbacks = std::mem::take(&mut *self.state.callbacks.borrow_mut());
        for callback in callbacks {
            callback(end.clone());
        }
    }

    pub(crate) fn is_started(&self) -> bool {
        self.state.started.get()
    }

    pub(crate) fn is_killed(&self) -> bool {
        self.state.killed.get()
    }
}

impl Animation for ManualAnimation {
    fn start(&mut self) {
        self.state.started.set(true);
    }

    fn is_finished(&self) -> bool {
        self.state.finished.get()
    }

    fn on_finished(&mut self, callback: FinishCallback) {
        self.state.callbacks.borrow_mut().push(callback);
    }

    fn kill(&mut self) {
        self.state.killed.set(true);
        if !self.state.keep_callbacks_on_kill {
            self.state.callbacks.borrow_mut().clear();
        }
    }
}

//=== ActLog ===============================================================

/// Shared event log written by scripted acts.
#[derive(Clone, Default)]
pub(crate) struct ActLog {
    events: Rc<RefCell<Vec<String>>>,
}

impl ActLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn act(&self, name: &'static str) -> ScriptedAct {
        ScriptedAct {
            name,
            acts_log: self.clone(),
            guard: Guard::default(),
            policy: SkipPolicy::default(),
            animation: None,
        }
    }

    pub(crate) fn record(&self, event: String) {
        self.events.borrow_mut().push(event);
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }
}

/// Act that logs `apply <name>` and `skip <name>` to its shared log.
pub(crate) struct ScriptedAct {
    name: &'static str,
    acts_log: ActLog,
    guard: Guard,
    policy: SkipPolicy,
    animation: Option<ManualAnimation>,
}

impl ScriptedAct {
    pub(crate) fn guard(mut self, guard: impl Into<Guard>) -> Self {
        self.guard = guard.into();
        self
    }

    pub(crate) fn policy(mut self, policy: SkipPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Hands `animation` to the engine instead of finishing synchronously.
    pub(crate) fn animated(mut self, animation: &ManualAnimation) -> Self {
        self.animation = Some(animation.clone());
        self
    }

    pub(crate) fn boxed(self) -> Box<dyn Act> {
        Box::new(self)
    }
}

impl Act for ScriptedAct {
    fn name(&self) -> &str {
        self.name
    }

    fn guard(&self) -> Guard {
        self.guard.clone()
    }

    fn skip_policy(&self) -> SkipPolicy {
        self.policy
    }

    fn action(&mut self) -> Result<ActOutcome, ActError> {
        self.acts_log.record(format!("apply {}", self.name));
        Ok(match &self.animation {
            Some(animation) => ActOutcome::animation(animation.clone()),
            None => ActOutcome::Done,
        })
    }

    fn skip(&mut self) {
        self.acts_log.record(format!("skip {}", self.name));
    }
}

//=== Helpers =============================================================

/// Counts `on_complete` emissions of `action`.
pub(crate) fn count_completions(action: &Action) -> Rc<Cell<u32>> {
    let count = Rc::new(Cell::new(0));
    let c = Rc::clone(&count);
    action.on_complete().connect(move |_| c.set(c.get() + 1));
    count
}
