//=========================================================================
// Action
//=========================================================================
//
// Lifecycle wrapper around one Act.
//
// State machine:
//   idle ──apply()──→ started ──natural end──→ completed
//     │                  │
//     └──────skip()──────┴──→ skipped + completed
//                        └──error──→ failed (terminal)
//
// Exactly one of on_complete / on_error fires, at most once, over the
// lifetime of an action. A late natural completion after skip() is
// swallowed by the `completed` guard.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use futures::future::{AbortHandle, Abortable, LocalBoxFuture};
use futures::task::{LocalSpawn, LocalSpawnExt};
use log::{debug, error, warn};

//=== Internal Dependencies ===============================================

use super::{Act, ActOutcome, Guard, SkipPolicy};
use crate::core::anim::{Animation, AnimationEnd};
use crate::core::signal::Signal;
use crate::error::ActError;

//=== ActionInner =========================================================

struct ActionInner {
    id: usize,
    name: String,
    act: RefCell<Box<dyn Act>>,
    guard: Guard,
    policy: SkipPolicy,

    started: Cell<bool>,
    completed: Cell<bool>,
    skipped: Cell<bool>,
    failed: Cell<bool>,
    skip_pending: Cell<bool>,

    animation: RefCell<Option<Box<dyn Animation>>>,
    abort: RefCell<Option<AbortHandle>>,
    spawner: Option<Rc<dyn LocalSpawn>>,

    on_complete: Signal<()>,
    on_error: Signal<ActError>,
}

//=== Action ==============================================================

/// Engine-side handle for one act in a run.
///
/// Clones refer to the same action; equality is identity.
#[derive(Clone)]
pub struct Action {
    inner: Rc<ActionInner>,
}

impl Action {
    //--- Construction -----------------------------------------------------

    /// Wraps `act`. Future outcomes will fail for lack of a spawner.
    pub fn new(id: usize, act: Box<dyn Act>) -> Self {
        Self::build(id, act, None)
    }

    /// Wraps `act`, spawning future outcomes on `spawner`.
    pub fn with_spawner(id: usize, act: Box<dyn Act>, spawner: Rc<dyn LocalSpawn>) -> Self {
        Self::build(id, act, Some(spawner))
    }

    fn build(id: usize, act: Box<dyn Act>, spawner: Option<Rc<dyn LocalSpawn>>) -> Self {
        let name = act.name().to_string();
        let guard = act.guard();
        let policy = act.skip_policy();

        Self {
            inner: Rc::new(ActionInner {
                id,
                name,
                act: RefCell::new(act),
                guard,
                policy,
                started: Cell::new(false),
                completed: Cell::new(false),
                skipped: Cell::new(false),
                failed: Cell::new(false),
                skip_pending: Cell::new(false),
                animation: RefCell::new(None),
                abort: RefCell::new(None),
                spawner,
                on_complete: Signal::new(),
                on_error: Signal::new(),
            }),
        }
    }

    fn from_weak(weak: &Weak<ActionInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    //--- Lifecycle --------------------------------------------------------

    /// Runs the act's work. No-op once started or already finished.
    pub fn apply(&self) {
        let inner = &self.inner;
        if inner.completed.get() || inner.started.replace(true) {
            return;
        }

        debug!("Applying act #{} {}", inner.id, inner.name);

        let outcome = match inner.act.try_borrow_mut() {
            Ok(mut act) => act.action(),
            Err(_) => Err(ActError::failed("act re-entered while busy")),
        };

        // Skipped from inside its own action(): the outcome is stale
        if inner.skipped.get() {
            self.discard(outcome);
            return;
        }

        match outcome {
            Err(err) => self.fail(err),
            Ok(ActOutcome::Done) => self.complete(),
            Ok(ActOutcome::Future(future)) => self.drive_future(future),
            Ok(ActOutcome::Animation(animation)) => self.drive_animation(animation),
        }
    }

    /// Skips the act, committing its final state.
    ///
    /// No-op if already skipped, if the act is skip-disabled, or if it
    /// failed. Fires `on_complete` unless the action had already finished.
    pub fn skip(&self) {
        let inner = &self.inner;
        if inner.skipped.get() || inner.policy == SkipPolicy::Disabled || inner.failed.get() {
            return;
        }

        inner.skipped.set(true);
        let already_completed = inner.completed.replace(true);

        // Stop in-flight work first so it cannot report late
        self.stop_work();

        match inner.act.try_borrow_mut() {
            Ok(mut act) => act.skip(),
            Err(_) => {
                debug!("Act #{} {} skipped inside its action; deferring", inner.id, inner.name);
                inner.skip_pending.set(true);
            }
        }

        if !already_completed {
            debug!("Act #{} {} skipped", inner.id, inner.name);
            inner.on_complete.emit(&());
        }
    }

    /// Evaluates the guard.
    pub fn is_guard(&self) -> bool {
        self.inner.guard.evaluate()
    }

    //--- Completion Wiring ------------------------------------------------

    /// Drops the work of an action skipped while `action()` was running,
    /// then commits the deferred skip.
    fn discard(&self, outcome: Result<ActOutcome, ActError>) {
        let inner = &self.inner;
        match outcome {
            Ok(ActOutcome::Animation(mut animation)) => animation.kill(),
            Ok(ActOutcome::Future(future)) => drop(future),
            Ok(ActOutcome::Done) => {}
            Err(err) => warn!("Act #{} {} failed after being skipped: {}", inner.id, inner.name, err),
        }

        if inner.skip_pending.replace(false) {
            match inner.act.try_borrow_mut() {
                Ok(mut act) => act.skip(),
                Err(_) => warn!("Act #{} {} still busy; skip not committed", inner.id, inner.name),
            }
        }
    }

    fn drive_animation(&self, mut animation: Box<dyn Animation>) {
        let weak = Rc::downgrade(&self.inner);
        animation.on_finished(Box::new(move |end| {
            if let Some(action) = Action::from_weak(&weak) {
                action.settle(end);
            }
        }));

        animation.start();

        // Finished (or skipped) synchronously inside start()
        if self.inner.completed.get() {
            animation.kill();
            return;
        }
        *self.inner.animation.borrow_mut() = Some(animation);
    }

    fn drive_future(&self, future: LocalBoxFuture<'static, Result<(), ActError>>) {
        let Some(spawner) = self.inner.spawner.clone() else {
            self.fail(ActError::Spawn("no local spawner configured".to_string()));
            return;
        };

        let (handle, registration) = AbortHandle::new_pair();
        let work = Abortable::new(future, registration);
        let weak = Rc::downgrade(&self.inner);

        *self.inner.abort.borrow_mut() = Some(handle);

        let spawned = spawner.spawn_local(async move {
            // Aborted means skipped; nothing to report
            if let Ok(result) = work.await {
                if let Some(action) = Action::from_weak(&weak) {
                    action.settle(result);
                }
            }
        });

        if let Err(err) = spawned {
            self.inner.abort.borrow_mut().take();
            self.fail(ActError::Spawn(err.to_string()));
        }
    }

    fn settle(&self, end: AnimationEnd) {
        match end {
            Ok(()) if self.inner.skipped.get() => {}
            Ok(()) => self.complete(),
            Err(err) => self.fail(err),
        }
    }

    fn complete(&self) {
        let inner = &self.inner;
        if inner.completed.replace(true) {
            return;
        }

        self.release_work();
        debug!("Act #{} {} completed", inner.id, inner.name);
        inner.on_complete.emit(&());
    }

    fn fail(&self, err: ActError) {
        let inner = &self.inner;
        if inner.completed.replace(true) {
            return;
        }

        inner.failed.set(true);
        self.stop_work();
        error!("Act #{} {} failed: {}", inner.id, inner.name, err);
        inner.on_error.emit(&err);
    }

    /// Drops finished work handles without stopping anything.
    fn release_work(&self) {
        let animation = self
            .inner
            .animation
            .try_borrow_mut()
            .ok()
            .and_then(|mut slot| slot.take());
        drop(animation);
        self.inner.abort.borrow_mut().take();
    }

    /// Force-stops in-flight work.
    fn stop_work(&self) {
        let animation = self
            .inner
            .animation
            .try_borrow_mut()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(mut animation) = animation {
            animation.kill();
        }
        if let Some(handle) = self.inner.abort.borrow_mut().take() {
            handle.abort();
        }
    }

    //--- Query API --------------------------------------------------------

    /// Position of the act in its scenario.
    pub fn id(&self) -> usize {
        self.inner.id
    }

    /// Name reported by the act.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Fast-forward policy captured from the act.
    pub fn skip_policy(&self) -> SkipPolicy {
        self.inner.policy
    }

    /// The act can never be skipped.
    pub fn skip_disabled(&self) -> bool {
        self.inner.policy == SkipPolicy::Disabled
    }

    /// Fast-forward must stop at this act.
    pub fn skip_step(&self) -> bool {
        self.inner.policy == SkipPolicy::Step
    }

    /// `apply` has run.
    pub fn is_started(&self) -> bool {
        self.inner.started.get()
    }

    /// The action reached a terminal state (natural, skipped or failed).
    pub fn is_completed(&self) -> bool {
        self.inner.completed.get()
    }

    /// `skip` took effect.
    pub fn is_skipped(&self) -> bool {
        self.inner.skipped.get()
    }

    /// The act or its work reported an error.
    pub fn is_failed(&self) -> bool {
        self.inner.failed.get()
    }

    /// Fires once when the action completes or is skipped.
    pub fn on_complete(&self) -> &Signal<()> {
        &self.inner.on_complete
    }

    /// Fires once if the act fails.
    pub fn on_error(&self) -> &Signal<ActError> {
        &self.inner.on_error
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Action {}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("policy", &self.inner.policy)
            .field("started", &self.inner.started.get())
            .field("completed", &self.inner.completed.get())
            .field("skipped", &self.inner.skipped.get())
            .field("failed", &self.inner.failed.get())
            .finish()
    }
}

//=========================================================================
// Tests
//=========================================================================
