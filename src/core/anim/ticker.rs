//=========================================================================
// Ticker & Tween
//=========================================================================
//
// Minimal host-driven animation clock.
//
// Flow:
//   host frame → Ticker::advance(dt) → Tween::step(dt) → update(progress)
//                                                ↓
//                                 progress == 1.0 → finish callbacks
//
// The ticker only keeps weak references: a tween lives as long as the
// act (or timeline) holding its handle.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

//=== Internal Dependencies ===============================================

use super::{Animation, FinishCallback};

//=== TweenState ==========================================================

struct TweenState {
    duration: f64,
    elapsed: Cell<f64>,
    started: Cell<bool>,
    finished: Cell<bool>,
    killed: Cell<bool>,
    update: RefCell<Box<dyn FnMut(f64)>>,
    finish_callbacks: RefCell<Vec<FinishCallback>>,
    kill_hooks: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl TweenState {
    fn is_done(&self) -> bool {
        self.finished.get() || self.killed.get()
    }

    fn step(&self, dt: f64) {
        if !self.started.get() || self.is_done() {
            return;
        }

        let elapsed = (self.elapsed.get() + dt.max(0.0)).min(self.duration);
        self.elapsed.set(elapsed);

        if let Ok(mut update) = self.update.try_borrow_mut() {
            update(self.progress());
        }

        // The update may have killed us
        if self.killed.get() {
            return;
        }

        if elapsed >= self.duration {
            self.finish();
        }
    }

    fn progress(&self) -> f64 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed.get() / self.duration).clamp(0.0, 1.0)
        }
    }

    fn finish(&self) {
        self.finished.set(true);
        self.kill_hooks.borrow_mut().clear();

        let callbacks = std::mem::take(&mut *self.finish_callbacks.borrow_mut());
        for callback in callbacks {
            callback(Ok(()));
        }
    }
}

//=== Tween ===============================================================

/// Duration-based animation handle created by a [`Ticker`].
///
/// The update closure receives progress in `0.0..=1.0` on every tick and
/// is guaranteed to see `1.0` before the tween reports completion.
/// Clones share the same playback state.
#[derive(Clone)]
pub struct Tween {
    state: Rc<TweenState>,
}

impl Tween {
    /// Registers a hook run only if the tween is killed before finishing.
    ///
    /// Typically stops a looping sound effect started with the tween.
    pub fn on_kill<F: FnOnce() + 'static>(&self, hook: F) {
        if self.state.is_done() {
            return;
        }
        self.state.kill_hooks.borrow_mut().push(Box::new(hook));
    }

    /// Current progress in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        self.state.progress()
    }

    /// Total duration in seconds.
    pub fn duration(&self) -> f64 {
        self.state.duration
    }

    /// Returns true if the tween was stopped early.
    pub fn is_killed(&self) -> bool {
        self.state.killed.get()
    }
}

impl Animation for Tween {
    fn start(&mut self) {
        if self.state.started.replace(true) {
            return;
        }
        if self.state.duration <= 0.0 {
            self.state.step(0.0);
        }
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
        self.state.finish_callbacks.borrow_mut().push(callback);
    }

    fn kill(&mut self) {
        if self.state.is_done() {
            return;
        }
        self.state.killed.set(true);
        self.state.finish_callbacks.borrow_mut().clear();

        let hooks = std::mem::take(&mut *self.state.kill_hooks.borrow_mut());
        for hook in hooks {
            hook();
        }
    }
}

impl fmt::Debug for Tween {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tween")
            .field("duration", &self.state.duration)
            .field("progress", &self.progress())
            .field("finished", &self.state.finished.get())
            .field("killed", &self.state.killed.get())
            .finish()
    }
}

//=== Ticker ==============================================================

#[derive(Default)]
struct TickerInner {
    time: Cell<f64>,
    tweens: RefCell<Vec<Weak<TweenState>>>,
}

/// Animation clock advanced by the host loop.
///
/// Cloning yields another handle to the same clock.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use aetheric_flow::prelude::*;
///
/// let ticker = Ticker::new();
/// let seen = Rc::new(Cell::new(0.0));
/// let s = Rc::clone(&seen);
/// let mut tween = ticker.tween(1.0, move |p| s.set(p));
///
/// tween.start();
/// ticker.advance(0.25);
/// assert_eq!(seen.get(), 0.25);
///
/// ticker.advance(1.0);
/// assert!(tween.is_finished());
/// ```
#[derive(Clone, Default)]
pub struct Ticker {
    inner: Rc<TickerInner>,
}

impl Ticker {
    /// Creates a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    //--- Factories --------------------------------------------------------

    /// Creates a tween of `duration` seconds. It does not run until started.
    pub fn tween<F>(&self, duration: f64, update: F) -> Tween
    where
        F: FnMut(f64) + 'static,
    {
        let state = Rc::new(TweenState {
            duration: duration.max(0.0),
            elapsed: Cell::new(0.0),
            started: Cell::new(false),
            finished: Cell::new(false),
            killed: Cell::new(false),
            update: RefCell::new(Box::new(update)),
            finish_callbacks: RefCell::new(Vec::new()),
            kill_hooks: RefCell::new(Vec::new()),
        });

        self.inner.tweens.borrow_mut().push(Rc::downgrade(&state));
        Tween { state }
    }

    /// Creates a tween that only waits.
    pub fn delay(&self, duration: f64) -> Tween {
        self.tween(duration, |_| {})
    }

    //--- Update Loop ------------------------------------------------------

    /// Steps every started tween by `dt` seconds.
    ///
    /// Tweens created or started by callbacks during this call are first
    /// stepped on the next call.
    pub fn advance(&self, dt: f64) {
        self.inner.time.set(self.inner.time.get() + dt);

        let live: Vec<Rc<TweenState>> = {
            let mut tweens = self.inner.tweens.borrow_mut();
            tweens.retain(|weak| weak.upgrade().is_some_and(|state| !state.is_done()));
            tweens
                .iter()
                .filter_map(Weak::upgrade)
                .filter(|state| state.started.get())
                .collect()
        };

        for state in live {
            state.step(dt);
        }
    }

    //--- Query API --------------------------------------------------------

    /// Total time advanced so far, in seconds.
    pub fn time(&self) -> f64 {
        self.inner.time.get()
    }

    /// Number of tweens started and still playing.
    pub fn active(&self) -> usize {
        self.inner
            .tweens
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|state| state.started.get() && !state.is_done())
            .count()
    }
}

impl fmt::Debug for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticker")
            .field("time", &self.time())
            .field("active", &self.active())
            .finish()
    }
}

//=========================================================================
// Tests
//=========================================================================
