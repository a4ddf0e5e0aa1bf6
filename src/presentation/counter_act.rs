//=========================================================================
// CounterAct
//=========================================================================
//
// Counts an integer amount (minor currency units) from a start value to
// a target, pushing every intermediate value to a sink such as a HUD
// label. Skipping pushes the target directly.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::rc::Rc;

//=== Internal Dependencies ===============================================

use crate::core::acts::{Act, ActOutcome, SkipPolicy};
use crate::core::anim::{Animation, Ticker, Tween};
use crate::error::ActError;

type Sink = Rc<RefCell<Box<dyn FnMut(i64)>>>;

fn push(sink: &Sink, value: i64) {
    if let Ok(mut sink) = sink.try_borrow_mut() {
        sink(value);
    }
}

//=== CounterAct ==========================================================

/// Animated count-up of a win or balance amount.
pub struct CounterAct {
    ticker: Ticker,
    from: i64,
    to: i64,
    duration: f64,
    policy: SkipPolicy,
    sink: Sink,
    tween: Option<Tween>,
}

impl CounterAct {
    /// Counts from `from` to `to` over `duration` seconds.
    pub fn new<F>(ticker: &Ticker, from: i64, to: i64, duration: f64, sink: F) -> Self
    where
        F: FnMut(i64) + 'static,
    {
        let sink: Box<dyn FnMut(i64)> = Box::new(sink);
        Self {
            ticker: ticker.clone(),
            from,
            to,
            duration,
            policy: SkipPolicy::Skippable,
            sink: Rc::new(RefCell::new(sink)),
            tween: None,
        }
    }

    pub fn with_policy(mut self, policy: SkipPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Value shown at `progress` in `0.0..=1.0`.
    fn value_at(from: i64, to: i64, progress: f64) -> i64 {
        if progress >= 1.0 {
            return to;
        }
        let span = i128::from(to) - i128::from(from);
        let step = (span as f64 * progress).round() as i128;
        i64::try_from(i128::from(from) + step).unwrap_or(to)
    }
}

impl Act for CounterAct {
    fn skip_policy(&self) -> SkipPolicy {
        self.policy
    }

    fn action(&mut self) -> Result<ActOutcome, ActError> {
        let (from, to) = (self.from, self.to);
        let sink = Rc::clone(&self.sink);

        push(&self.sink, from);
        let tween = self
            .ticker
            .tween(self.duration, move |p| push(&sink, Self::value_at(from, to, p)));

        self.tween = Some(tween.clone());
        Ok(ActOutcome::animation(tween))
    }

    fn skip(&mut self) {
        if let Some(mut tween) = self.tween.take() {
            tween.kill();
        }
        push(&self.sink, self.to);
    }
}

//=========================================================================
// Tests
//=========================================================================
