//=========================================================================
// Timeline
//=========================================================================
//
// Composes several animations into one handle.
//
// Architecture:
//   steps: VecDeque<group>   played front to back
//   group: Vec<Animation>    started together, done when all are done
//
// Killing the timeline kills the running group and drops the rest.
// The first child error ends the timeline with that error.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

//=== Internal Dependencies ===============================================

use super::{Animation, AnimationEnd, FinishCallback};

type Group = Vec<Box<dyn Animation>>;

//=== Cue =================================================================

/// Instantaneous step running a callback when reached.
struct Cue {
    action: Option<Box<dyn FnOnce()>>,
    finished: bool,
    callbacks: Vec<FinishCallback>,
}

impl Animation for Cue {
    fn start(&mut self) {
        let Some(action) = self.action.take() else {
            return;
        };
        action();
        self.finished = true;
        for callback in self.callbacks.drain(..) {
            callback(Ok(()));
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn on_finished(&mut self, callback: FinishCallback) {
        if self.finished {
            callback(Ok(()));
        } else {
            self.callbacks.push(callback);
        }
    }

    fn kill(&mut self) {
        self.action = None;
        self.callbacks.clear();
    }
}

//=== TimelineState =======================================================

#[derive(Default)]
struct TimelineState {
    steps: RefCell<VecDeque<Group>>,
    running: RefCell<Group>,
    pending: Cell<usize>,
    generation: Cell<u64>,
    started: Cell<bool>,
    finished: Cell<bool>,
    killed: Cell<bool>,
    callbacks: RefCell<Vec<FinishCallback>>,
}

impl TimelineState {
    fn is_done(&self) -> bool {
        self.finished.get() || self.killed.get()
    }
}

fn advance(state: &Rc<TimelineState>) {
    loop {
        if state.is_done() {
            return;
        }

        let next = state.steps.borrow_mut().pop_front();
        let Some(mut group) = next else {
            finish(state, Ok(()));
            return;
        };
        if group.is_empty() {
            continue;
        }

        let generation = state.generation.get() + 1;
        state.generation.set(generation);
        state.pending.set(group.len());

        for animation in group.iter_mut() {
            let weak = Rc::downgrade(state);
            animation.on_finished(Box::new(move |end| {
                if let Some(state) = weak.upgrade() {
                    child_finished(&state, generation, end);
                }
            }));
        }

        for animation in group.iter_mut() {
            if state.is_done() {
                break;
            }
            animation.start();
        }

        if state.killed.get() {
            for animation in group.iter_mut() {
                animation.kill();
            }
        } else if state.generation.get() == generation && !state.finished.get() {
            *state.running.borrow_mut() = group;
        }
        return;
    }
}

fn child_finished(state: &Rc<TimelineState>, generation: u64, end: AnimationEnd) {
    if state.is_done() || state.generation.get() != generation {
        return;
    }

    match end {
        Ok(()) => {
            let pending = state.pending.get().saturating_sub(1);
            state.pending.set(pending);
            if pending == 0 {
                let done = std::mem::take(&mut *state.running.borrow_mut());
                drop(done);
                advance(state);
            }
        }
        Err(err) => {
            let mut running = std::mem::take(&mut *state.running.borrow_mut());
            for animation in running.iter_mut() {
                animation.kill();
            }
            finish(state, Err(err));
        }
    }
}

fn finish(state: &Rc<TimelineState>, end: AnimationEnd) {
    state.finished.set(true);
    state.steps.borrow_mut().clear();

    let callbacks = std::mem::take(&mut *state.callbacks.borrow_mut());
    for callback in callbacks {
        callback(end.clone());
    }
}

//=== Timeline ============================================================

/// Sequential composition of animations, each step a parallel group.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use aetheric_flow::prelude::*;
///
/// let ticker = Ticker::new();
/// let shown = Rc::new(Cell::new(false));
/// let s = Rc::clone(&shown);
///
/// let mut timeline = Timeline::new()
///     .then(ticker.delay(0.5))
///     .call(move || s.set(true));
///
/// timeline.start();
/// assert!(!shown.get());
/// ticker.advance(0.5);
/// assert!(shown.get() && timeline.is_finished());
/// ```
pub struct Timeline {
    state: Rc<TimelineState>,
}

impl Timeline {
    /// Creates an empty timeline. Started empty, it finishes immediately.
    pub fn new() -> Self {
        Self {
            state: Rc::new(TimelineState::default()),
        }
    }

    //--- Composition ------------------------------------------------------

    /// Appends a step playing `animation` after everything added before.
    pub fn then<A: Animation + 'static>(self, animation: A) -> Self {
        self.push(vec![Box::new(animation)])
    }

    /// Appends a step playing all `animations` in parallel.
    pub fn with(self, animations: Vec<Box<dyn Animation>>) -> Self {
        self.push(animations)
    }

    /// Appends an instantaneous step running `action`.
    pub fn call<F: FnOnce() + 'static>(self, action: F) -> Self {
        self.push(vec![Box::new(Cue {
            action: Some(Box::new(action)),
            finished: false,
            callbacks: Vec::new(),
        })])
    }

    fn push(self, group: Group) -> Self {
        if self.state.started.get() {
            log::warn!("Timeline step added after start; ignored");
        } else {
            self.state.steps.borrow_mut().push_back(group);
        }
        self
    }

    /// Number of steps not yet reached.
    pub fn remaining(&self) -> usize {
        self.state.steps.borrow().len()
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Animation for Timeline {
    fn start(&mut self) {
        if self.state.started.replace(true) {
            return;
        }
        let state = Rc::clone(&self.state);
        advance(&state);
    }

    fn is_finished(&self) -> bool {
        self.state.finished.get()
    }

    fn on_finished(&mut self, callback: FinishCallback) {
        if self.state.killed.get() {
            return;
        }
        if self.state.finished.get() {
            callback(Ok(()));
            return;
        }
        self.state.callbacks.borrow_mut().push(callback);
    }

    fn kill(&mut self) {
        if self.state.is_done() {
            return;
        }
        self.state.killed.set(true);
        self.state.callbacks.borrow_mut().clear();
        self.state.steps.borrow_mut().clear();

        let mut running = std::mem::take(&mut *self.state.running.borrow_mut());
        for animation in running.iter_mut() {
            animation.kill();
        }
    }
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("remaining", &self.remaining())
            .field("finished", &self.state.finished.get())
            .field("killed", &self.state.killed.get())
            .finish()
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::anim::Ticker;
    use crate::error::ActError;

    fn log() -> Rc<RefCell<Vec<&'static str>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn mark(log: &Rc<RefCell<Vec<&'static str>>>, entry: &'static str) -> impl FnOnce() {
        let log = Rc::clone(log);
        move || log.borrow_mut().push(entry)
    }

    struct Failing {
        callbacks: Vec<FinishCallback>,
    }

    impl Animation for Failing {
        fn start(&mut self) {
            for callback in self.callbacks.drain(..) {
                callback(Err(ActError::Animation("spine missing".into())));
            }
        }
        fn is_finished(&self) -> bool {
            false
        }
        fn on_finished(&mut self, callback: FinishCallback) {
            self.callbacks.push(callback);
        }
        fn kill(&mut self) {}
    }

    #[test]
    fn empty_timeline_finishes_on_start() {
        let mut timeline = Timeline::new();
        let done = Rc::new(Cell::new(false));
        let d = Rc::clone(&done);
        timeline.on_finished(Box::new(move |end| d.set(end.is_ok())));

        timeline.start();
        assert!(done.get());
    }

    #[test]
    fn steps_run_in_sequence() {
        let ticker = Ticker::new();
        let order = log();

        let mut timeline = Timeline::new()
            .call(mark(&order, "show win info"))
            .then(ticker.delay(1.0))
            .call(mark(&order, "clear pay info"));

        timeline.start();
        assert_eq!(*order.borrow(), vec!["show win info"]);
        assert_eq!(timeline.remaining(), 1);

        ticker.advance(1.0);
        assert_eq!(*order.borrow(), vec!["show win info", "clear pay info"]);
        assert!(timeline.is_finished());
    }

    #[test]
    fn parallel_group_waits_for_slowest() {
        let ticker = Ticker::new();
        let order = log();

        let mut timeline = Timeline::new()
            .with(vec![
                Box::new(ticker.delay(0.5)),
                Box::new(ticker.delay(1.0)),
            ])
            .call(mark(&order, "after group"));

        timeline.start();
        ticker.advance(0.5);
        assert!(order.borrow().is_empty());

        ticker.advance(0.5);
        assert_eq!(*order.borrow(), vec!["after group"]);
    }

    #[test]
    fn kill_stops_running_children() {
        let ticker = Ticker::new();
        let order = log();
        let tween = ticker.delay(1.0);
        let sfx_stopped = Rc::new(Cell::new(false));
        let s = Rc::clone(&sfx_stopped);
        tween.on_kill(move || s.set(true));

        let mut timeline = Timeline::new()
            .then(tween.clone())
            .call(mark(&order, "never"));
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        timeline.on_finished(Box::new(move |_| f.set(true)));

        timeline.start();
        timeline.kill();
        ticker.advance(2.0);

        assert!(tween.is_killed());
        assert!(sfx_stopped.get());
        assert!(order.borrow().is_empty());
        assert!(!fired.get());
    }

    #[test]
    fn child_error_ends_timeline() {
        let order = log();
        let mut timeline = Timeline::new()
            .then(Failing { callbacks: Vec::new() })
            .call(mark(&order, "never"));

        let end = Rc::new(RefCell::new(None));
        let e = Rc::clone(&end);
        timeline.on_finished(Box::new(move |result| *e.borrow_mut() = Some(result)));

        timeline.start();

        assert_eq!(
            *end.borrow(),
            Some(Err(ActError::Animation("spine missing".into())))
        );
        assert!(order.borrow().is_empty());
    }

    #[test]
    fn nested_timelines_compose() {
        let ticker = Ticker::new();
        let order = log();

        let inner = Timeline::new()
            .then(ticker.delay(0.25))
            .call(mark(&order, "inner"));
        let mut outer = Timeline::new()
            .then(inner)
            .call(mark(&order, "outer"));

        outer.start();
        ticker.advance(0.25);

        assert_eq!(*order.borrow(), vec!["inner", "outer"]);
        assert!(outer.is_finished());
    }
}
