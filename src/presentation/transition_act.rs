//=========================================================================
// TransitionAct
//=========================================================================
//
// Final act of a round: waits briefly, then moves the game to its next
// state (idle, free-spin intro, ...). The transition is committed once,
// by whichever of play-through or skip reaches it first.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

//=== Internal Dependencies ===============================================

use crate::core::acts::{Act, ActOutcome, SkipPolicy};
use crate::core::anim::{Ticker, Timeline};
use crate::error::ActError;

/// Default pause before the transition fires, in seconds.
pub const DEFAULT_TRANSITION_DELAY: f64 = 0.25;

//=== Commit ==============================================================

struct Commit {
    done: Cell<bool>,
    transition: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Commit {
    fn run(&self) {
        if self.done.replace(true) {
            return;
        }
        let transition = self.transition.borrow_mut().take();
        if let Some(transition) = transition {
            transition();
        }
    }
}

//=== TransitionAct =======================================================

/// Deferred game-state transition.
///
/// Defaults to [`SkipPolicy::Step`]: a fast-forward stops here so the
/// transition still plays.
pub struct TransitionAct {
    ticker: Ticker,
    delay: f64,
    policy: SkipPolicy,
    commit: Rc<Commit>,
}

impl TransitionAct {
    pub fn new<F>(ticker: &Ticker, transition: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        let transition: Box<dyn FnOnce()> = Box::new(transition);
        Self {
            ticker: ticker.clone(),
            delay: DEFAULT_TRANSITION_DELAY,
            policy: SkipPolicy::Step,
            commit: Rc::new(Commit {
                done: Cell::new(false),
                transition: RefCell::new(Some(transition)),
            }),
        }
    }

    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_policy(mut self, policy: SkipPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns true once the transition ran.
    pub fn is_committed(&self) -> bool {
        self.commit.done.get()
    }
}

impl Act for TransitionAct {
    fn skip_policy(&self) -> SkipPolicy {
        self.policy
    }

    fn action(&mut self) -> Result<ActOutcome, ActError> {
        let commit = Rc::clone(&self.commit);
        let timeline = Timeline::new()
            .then(self.ticker.delay(self.delay))
            .call(move || commit.run());

        Ok(ActOutcome::animation(timeline))
    }

    fn skip(&mut self) {
        self.commit.run();
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::anim::Animation;

    fn counting(ticker: &Ticker) -> (TransitionAct, Rc<Cell<u32>>) {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        (TransitionAct::new(ticker, move || c.set(c.get() + 1)), count)
    }

    #[test]
    fn transition_fires_after_delay() {
        let ticker = Ticker::new();
        let (mut act, count) = counting(&ticker);

        let Ok(ActOutcome::Animation(mut timeline)) = act.action() else {
            panic!("transition must hand back an animation");
        };
        timeline.start();
        ticker.advance(0.1);
        assert_eq!(count.get(), 0);

        ticker.advance(DEFAULT_TRANSITION_DELAY);
        assert_eq!(count.get(), 1);
        assert!(act.is_committed());
    }

    #[test]
    fn skip_then_late_cue_commits_once() {
        let ticker = Ticker::new();
        let (mut act, count) = counting(&ticker);

        let Ok(ActOutcome::Animation(mut timeline)) = act.action() else {
            panic!("transition must hand back an animation");
        };
        timeline.start();
        act.skip();
        act.skip();
        ticker.advance(1.0);

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn defaults_to_skip_step() {
        let ticker = Ticker::new();
        let (act, _) = counting(&ticker);
        assert_eq!(act.skip_policy(), SkipPolicy::Step);

        let act = act.with_delay(0.0).with_policy(SkipPolicy::Disabled);
        assert_eq!(act.skip_policy(), SkipPolicy::Disabled);
    }
}
