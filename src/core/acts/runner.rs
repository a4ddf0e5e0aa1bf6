//=========================================================================
// ActsRunner
//=========================================================================
//
// Cursor over a list of actions. At most one action is current.
//
// State machine:
//   NotStarted ──start()──→ Running ──list exhausted──→ Completed
//                              └──act failure──→ Failed
//
// Flow:
//   advance() → scan from cursor for guard-true action → activate()
//   activate() → emit on_action → link completion → apply()
//   completion → unlink → advance()
//
// Every public call outside `Running` is a silent no-op.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use log::{debug, warn};

//=== Internal Dependencies ===============================================

use super::{Action, SkipAll};
use crate::core::signal::{Connection, Signal};
use crate::error::ActFailure;

//=== RunnerState =========================================================

/// Lifecycle of an [`ActsRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    NotStarted,
    Running,
    Completed,
    Failed,
}

//=== RunnerInner =========================================================

struct RunnerInner {
    actions: Vec<Action>,

    /// Next position to scan.
    index: Cell<usize>,
    current: RefCell<Option<Action>>,
    current_link: RefCell<Option<(Connection, Connection)>>,
    state: Cell<RunnerState>,

    on_action: Signal<Option<Action>>,
    on_complete: Signal<()>,
    on_error: Signal<ActFailure>,
}

//=== ActsRunner ==========================================================

/// Plays actions strictly in list order, one at a time.
#[derive(Clone)]
pub struct ActsRunner {
    inner: Rc<RunnerInner>,
}

impl ActsRunner {
    /// Creates a runner over `actions`. Nothing plays until [`start`](Self::start).
    pub fn new(actions: Vec<Action>) -> Self {
        Self {
            inner: Rc::new(RunnerInner {
                actions,
                index: Cell::new(0),
                current: RefCell::new(None),
                current_link: RefCell::new(None),
                state: Cell::new(RunnerState::NotStarted),
                on_action: Signal::new(),
                on_complete: Signal::new(),
                on_error: Signal::new(),
            }),
        }
    }

    fn from_weak(weak: &Weak<RunnerInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn is_running(&self) -> bool {
        self.inner.state.get() == RunnerState::Running
    }

    //--- Control ----------------------------------------------------------

    /// Begins playing from the first guard-true action.
    pub fn start(&self) {
        if self.inner.state.get() != RunnerState::NotStarted {
            return;
        }

        debug!("Runner starting with {} actions", self.inner.actions.len());
        self.inner.state.set(RunnerState::Running);
        self.advance();
    }

    /// Moves on to the next action.
    ///
    /// With an action still in flight this skips it (unless skip-disabled)
    /// and the skip's completion advances the runner.
    pub fn to_next(&self) {
        if !self.is_running() {
            return;
        }

        match self.current() {
            Some(action) if !action.is_completed() => {
                if action.skip_disabled() {
                    debug!("Act #{} {} cannot be skipped", action.id(), action.name());
                    return;
                }
                action.skip();
            }
            _ => self.advance(),
        }
    }

    /// Relocates the cursor to `target`, resuming normal play from there.
    ///
    /// Only forward jumps are honored. If the current action is still in
    /// flight, `target` is reached once it completes.
    pub fn jump_to(&self, target: &Action) {
        if !self.is_running() {
            return;
        }

        let index = self.inner.index.get();
        let Some(position) = self.inner.actions.iter().position(|a| a == target) else {
            warn!("Jump target #{} {} is not part of this run", target.id(), target.name());
            return;
        };
        if position < index {
            warn!("Ignoring backward jump to act #{} {}", target.id(), target.name());
            return;
        }

        self.inner.index.set(position);

        if self.current().is_none() {
            self.advance();
        }
    }

    /// Fast-forwards to the next mandatory stop.
    ///
    /// Skips every guard-true action up to the first skip-disabled or
    /// skip-step one, which becomes the landing point. With
    /// `include_current`, a skip-disabled current action aborts the whole
    /// request.
    pub fn skip_all_if_possible(&self, options: SkipAll) {
        if !self.is_running() {
            return;
        }

        let mut in_flight = self.current();

        if options.include_current {
            if let Some(current) = in_flight.take() {
                if current.skip_disabled() {
                    debug!("Fast-forward blocked by act #{} {}", current.id(), current.name());
                    return;
                }
                self.unlink_current();
                self.inner.current.borrow_mut().take();
                current.skip();
            }
        }

        let mut stop = None;
        let start = self.inner.index.get();
        for position in start..self.inner.actions.len() {
            let action = &self.inner.actions[position];
            if action.is_completed() || !action.is_guard() {
                continue;
            }
            if action.skip_disabled() || action.skip_step() {
                stop = Some(position);
                break;
            }
            action.skip();
        }

        match stop {
            Some(position) => {
                self.inner.index.set(position);
                if in_flight.is_none() {
                    self.advance();
                }
            }
            None => {
                self.inner.index.set(self.inner.actions.len());
                if in_flight.is_none() {
                    self.finish();
                }
            }
        }
    }

    //--- Sequencing -------------------------------------------------------

    fn advance(&self) {
        if !self.is_running() {
            return;
        }

        let actions = &self.inner.actions;
        let mut position = self.inner.index.get();

        while position < actions.len() {
            let action = &actions[position];
            position += 1;

            // Already skipped by a fast-forward; apply would be a no-op
            if action.is_completed() {
                continue;
            }
            if !action.is_guard() {
                debug!("Act #{} {} excluded by guard", action.id(), action.name());
                continue;
            }

            self.inner.index.set(position);
            self.activate(action.clone());
            return;
        }

        self.inner.index.set(actions.len());
        self.finish();
    }

    fn activate(&self, action: Action) {
        *self.inner.current.borrow_mut() = Some(action.clone());
        self.inner.on_action.emit(&Some(action.clone()));

        let weak = Rc::downgrade(&self.inner);
        let completed = action.on_complete().connect_once(move |_| {
            if let Some(runner) = ActsRunner::from_weak(&weak) {
                runner.current_finished();
            }
        });

        let weak = Rc::downgrade(&self.inner);
        let (index, name) = (action.id(), action.name().to_string());
        let failed = action.on_error().connect_once(move |err| {
            if let Some(runner) = ActsRunner::from_weak(&weak) {
                runner.fail(ActFailure {
                    index,
                    name,
                    error: err.clone(),
                });
            }
        });

        *self.inner.current_link.borrow_mut() = Some((completed, failed));

        action.apply();
    }

    fn current_finished(&self) {
        self.unlink_current();
        self.inner.current.borrow_mut().take();
        self.advance();
    }

    fn finish(&self) {
        if !self.is_running() {
            return;
        }

        debug!("Runner completed");
        self.inner.state.set(RunnerState::Completed);
        self.inner.current.borrow_mut().take();
        self.inner.on_action.emit(&None);
        self.inner.on_complete.emit(&());
    }

    fn fail(&self, failure: ActFailure) {
        if !self.is_running() {
            return;
        }

        self.unlink_current();
        self.inner.state.set(RunnerState::Failed);
        self.inner.current.borrow_mut().take();

        self.inner.on_action.emit(&None);
        self.inner.on_error.emit(&failure);
    }

    fn unlink_current(&self) {
        let link = self.inner.current_link.borrow_mut().take();
        if let Some((completed, failed)) = link {
            completed.disconnect();
            failed.disconnect();
        }
    }

    //--- Query API --------------------------------------------------------

    /// Current lifecycle state.
    pub fn state(&self) -> RunnerState {
        self.inner.state.get()
    }

    /// Returns true once every action has run or been skipped.
    pub fn is_completed(&self) -> bool {
        self.inner.state.get() == RunnerState::Completed
    }

    /// Returns true once an act failure stopped the run.
    pub fn is_failed(&self) -> bool {
        self.inner.state.get() == RunnerState::Failed
    }

    /// The action now playing.
    pub fn current(&self) -> Option<Action> {
        self.inner.current.borrow().clone()
    }

    /// All actions, in play order.
    pub fn actions(&self) -> &[Action] {
        &self.inner.actions
    }

    /// Next cursor position to be scanned.
    pub fn index(&self) -> usize {
        self.inner.index.get()
    }

    /// Fires with the new current action, or `None` when the run ends.
    pub fn on_action(&self) -> &Signal<Option<Action>> {
        &self.inner.on_action
    }

    /// Fires once when every action has run or been skipped.
    pub fn on_complete(&self) -> &Signal<()> {
        &self.inner.on_complete
    }

    /// Fires once if an act fails.
    pub fn on_error(&self) -> &Signal<ActFailure> {
        &self.inner.on_error
    }
}

impl fmt::Debug for ActsRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActsRunner")
            .field("state", &self.state())
            .field("index", &self.index())
            .field("actions", &self.inner.actions.len())
            .field("current", &self.current().map(|a| a.id()))
            .finish()
    }
}

//=========================================================================
// Tests
//=========================================================================
