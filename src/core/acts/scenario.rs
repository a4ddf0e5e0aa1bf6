//=========================================================================
// Scenario
//=========================================================================
//
// One presentation run: acts compiled into actions, driven by a runner.
//
// Architecture:
//   Scenario ──owns──→ ActsRunner ──owns──→ Action[]
//       ↑                  │
//       └──weak handlers───┘  on_action / on_complete / on_error
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use futures::task::LocalSpawn;
use log::{debug, error};

//=== Internal Dependencies ===============================================

use super::{Act, Action, ActsRunner, SkipAll};
use crate::core::signal::Signal;
use crate::error::ActFailure;

//=== ScenarioInner =======================================================

struct ScenarioInner {
    runner: ActsRunner,
    visible: RefCell<Option<Action>>,
    started: Cell<bool>,
    completed: Cell<bool>,
    outcome: RefCell<Option<Result<(), ActFailure>>>,

    on_complete: Signal<()>,
    on_finished: Signal<Result<(), ActFailure>>,
}

impl ScenarioInner {
    fn settle(&self, outcome: Result<(), ActFailure>) {
        if self.completed.replace(true) {
            return;
        }

        *self.outcome.borrow_mut() = Some(outcome.clone());

        match &outcome {
            Ok(()) => {
                debug!("Scenario completed");
                self.on_complete.emit(&());
            }
            Err(failure) => error!("Scenario stopped: {}", failure),
        }
        self.on_finished.emit(&outcome);
    }
}

//=== Scenario ============================================================

/// A sequence of acts played as one skippable presentation.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use aetheric_flow::prelude::*;
///
/// let shown = Rc::new(Cell::new(0));
/// let s = Rc::clone(&shown);
///
/// let scenario = Scenario::new(vec![
///     FnAct::new("ShowPays").on_action(move || {
///         s.set(s.get() + 1);
///         Ok(ActOutcome::Done)
///     }).boxed(),
///     FnAct::new("NoCascade").guard(false).boxed(),
/// ]);
///
/// scenario.start();
/// assert!(scenario.is_completed());
/// assert_eq!(shown.get(), 1);
/// ```
#[derive(Clone)]
pub struct Scenario {
    inner: Rc<ScenarioInner>,
}

impl Scenario {
    //--- Construction -----------------------------------------------------

    /// Compiles `acts` into a scenario. Acts returning futures will fail.
    pub fn new(acts: Vec<Box<dyn Act>>) -> Self {
        let actions = acts
            .into_iter()
            .enumerate()
            .map(|(id, act)| Action::new(id, act))
            .collect();
        Self::from_actions(actions)
    }

    /// Compiles `acts`, spawning future outcomes on `spawner`.
    pub fn with_spawner<S>(acts: Vec<Box<dyn Act>>, spawner: S) -> Self
    where
        S: LocalSpawn + 'static,
    {
        let spawner: Rc<dyn LocalSpawn> = Rc::new(spawner);
        let actions = acts
            .into_iter()
            .enumerate()
            .map(|(id, act)| Action::with_spawner(id, act, Rc::clone(&spawner)))
            .collect();
        Self::from_actions(actions)
    }

    fn from_actions(actions: Vec<Action>) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<ScenarioInner>| {
            let runner = ActsRunner::new(actions);

            let w = weak.clone();
            runner.on_action().connect(move |action| {
                if let Some(inner) = w.upgrade() {
                    *inner.visible.borrow_mut() = action.clone();
                }
            });

            let w = weak.clone();
            runner.on_complete().connect(move |_| {
                if let Some(inner) = w.upgrade() {
                    inner.settle(Ok(()));
                }
            });

            let w = weak.clone();
            runner.on_error().connect(move |failure| {
                if let Some(inner) = w.upgrade() {
                    inner.settle(Err(failure.clone()));
                }
            });

            ScenarioInner {
                runner,
                visible: RefCell::new(None),
                started: Cell::new(false),
                completed: Cell::new(false),
                outcome: RefCell::new(None),
                on_complete: Signal::new(),
                on_finished: Signal::new(),
            }
        });

        Self { inner }
    }

    fn is_live(&self) -> bool {
        self.inner.started.get() && !self.inner.completed.get()
    }

    //--- Control ----------------------------------------------------------

    /// Starts playing. No-op once started.
    pub fn start(&self) {
        if self.inner.started.replace(true) {
            return;
        }
        self.inner.runner.start();
    }

    /// See [`ActsRunner::to_next`].
    pub fn to_next(&self) {
        if self.is_live() {
            self.inner.runner.to_next();
        }
    }

    /// See [`ActsRunner::jump_to`].
    pub fn jump_to(&self, target: &Action) {
        if self.is_live() {
            self.inner.runner.jump_to(target);
        }
    }

    /// See [`ActsRunner::skip_all_if_possible`].
    pub fn skip_all_if_possible(&self, options: SkipAll) {
        if self.is_live() {
            self.inner.runner.skip_all_if_possible(options);
        }
    }

    //--- Query API --------------------------------------------------------

    /// The action currently visible to the player.
    pub fn current(&self) -> Option<Action> {
        self.inner.visible.borrow().clone()
    }

    /// All compiled actions, in play order.
    pub fn actions(&self) -> &[Action] {
        self.inner.runner.actions()
    }

    /// The underlying runner.
    pub fn runner(&self) -> &ActsRunner {
        &self.inner.runner
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.get()
    }

    /// Returns true once the run ended, successfully or not.
    pub fn is_completed(&self) -> bool {
        self.inner.completed.get()
    }

    /// How the run ended, once it has.
    pub fn outcome(&self) -> Option<Result<(), ActFailure>> {
        self.inner.outcome.borrow().clone()
    }

    /// Fires once when every act has run or been skipped.
    pub fn on_complete(&self) -> &Signal<()> {
        &self.inner.on_complete
    }

    /// Fires once with the outcome, on success or failure.
    pub fn on_finished(&self) -> &Signal<Result<(), ActFailure>> {
        &self.inner.on_finished
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("started", &self.is_started())
            .field("completed", &self.is_completed())
            .field("current", &self.current().map(|a| a.id()))
            .field("runner", &self.inner.runner)
            .finish()
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::acts::testing::{ActLog, ManualAnimation};
    use crate::core::acts::{ActOutcome, SkipPolicy};
    use crate::core::anim::Ticker;
    use crate::error::ActError;
    use crate::presentation::FnAct;
    use futures::channel::oneshot;
    use futures::executor::LocalPool;

    fn finished_count(scenario: &Scenario) -> Rc<Cell<u32>> {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        scenario.on_complete().connect(move |_| c.set(c.get() + 1));
        count
    }

    #[test]
    fn guards_select_which_acts_run() {
        let acts_log = ActLog::new();
        let scenario = Scenario::new(vec![
            acts_log.act("Act1").boxed(),
            acts_log.act("Act2").guard(false).boxed(),
            acts_log.act("Act3").boxed(),
        ]);
        let done = finished_count(&scenario);

        scenario.start();

        assert_eq!(acts_log.events(), vec!["apply Act1", "apply Act3"]);
        assert_eq!(done.get(), 1);
        assert_eq!(scenario.outcome(), Some(Ok(())));
        assert_eq!(scenario.current(), None);
    }

    #[test]
    fn fast_forward_lands_on_mandatory_act() {
        let acts_log = ActLog::new();
        let animations: Vec<ManualAnimation> = (0..4).map(|_| ManualAnimation::new()).collect();
        let scenario = Scenario::new(vec![
            acts_log.act("Act1").animated(&animations[0]).boxed(),
            acts_log.act("Act2").animated(&animations[1]).boxed(),
            acts_log
                .act("Act3")
                .policy(SkipPolicy::Disabled)
                .animated(&animations[2])
                .boxed(),
            acts_log.act("Act4").animated(&animations[3]).boxed(),
        ]);

        scenario.start();
        animations[0].finish();
        let act2 = scenario.current().map(|a| a.id());
        assert_eq!(act2, Some(1));

        scenario.skip_all_if_possible(SkipAll::INCLUDE_CURRENT);
        assert!(scenario.actions()[1].is_skipped());
        assert_eq!(scenario.current().map(|a| a.id()), Some(2));

        scenario.skip_all_if_possible(SkipAll::INCLUDE_CURRENT);
        assert_eq!(scenario.current().map(|a| a.id()), Some(2));
        assert!(!scenario.actions()[2].is_skipped());
        assert!(!scenario.is_completed());
    }

    #[test]
    fn controls_are_ignored_before_start() {
        let acts_log = ActLog::new();
        let scenario = Scenario::new(vec![acts_log.act("A").boxed(), acts_log.act("B").boxed()]);
        let b = scenario.actions()[1].clone();

        scenario.to_next();
        scenario.jump_to(&b);
        scenario.skip_all_if_possible(SkipAll::default());

        assert!(acts_log.events().is_empty());
        assert!(!scenario.is_started());
    }

    #[test]
    fn controls_are_ignored_after_completion() {
        let acts_log = ActLog::new();
        let scenario = Scenario::new(vec![acts_log.act("A").boxed()]);
        let done = finished_count(&scenario);

        scenario.start();
        scenario.start();
        scenario.to_next();
        scenario.skip_all_if_possible(SkipAll::default());

        assert_eq!(done.get(), 1);
        assert_eq!(acts_log.events(), vec!["apply A"]);
    }

    #[test]
    fn failure_is_republished() {
        let scenario = Scenario::new(vec![
            FnAct::new("Pays").boxed(),
            FnAct::new("Multiplier")
                .on_action(|| Err(ActError::failed("no target cell")))
                .boxed(),
        ]);
        let done = finished_count(&scenario);
        let seen = Rc::new(RefCell::new(None));
        let s = Rc::clone(&seen);
        scenario
            .on_finished()
            .connect(move |outcome| *s.borrow_mut() = Some(outcome.clone()));

        scenario.start();

        let failure = ActFailure {
            index: 1,
            name: "Multiplier".to_string(),
            error: ActError::failed("no target cell"),
        };
        assert_eq!(done.get(), 0);
        assert!(scenario.is_completed());
        assert_eq!(scenario.outcome(), Some(Err(failure.clone())));
        assert_eq!(*seen.borrow(), Some(Err(failure)));
    }

    #[test]
    fn fast_forward_requested_from_inside_an_act_commits_it() {
        let ticker = Ticker::new();
        let slot: Rc<RefCell<Option<Scenario>>> = Rc::new(RefCell::new(None));
        let value = Rc::new(Cell::new(0));

        let s = Rc::clone(&slot);
        let v = Rc::clone(&value);
        let t = ticker.clone();
        let committed = Rc::clone(&value);
        let act = FnAct::new("Celebration")
            .on_action(move || {
                if let Some(scenario) = s.borrow().as_ref() {
                    scenario.skip_all_if_possible(SkipAll::INCLUDE_CURRENT);
                }
                v.set(1);
                Ok(ActOutcome::animation(t.delay(1.0)))
            })
            .on_skip(move || committed.set(100));

        let scenario = Scenario::new(vec![act.boxed()]);
        *slot.borrow_mut() = Some(scenario.clone());

        scenario.start();
        ticker.advance(2.0);
        slot.borrow_mut().take();

        assert!(scenario.is_completed());
        assert_eq!(scenario.outcome(), Some(Ok(())));
        assert_eq!(value.get(), 100);
    }

    #[test]
    fn current_tracks_runner() {
        let first = ManualAnimation::new();
        let acts_log = ActLog::new();
        let scenario = Scenario::new(vec![
            acts_log.act("A").animated(&first).boxed(),
            acts_log.act("B").animated(&ManualAnimation::new()).boxed(),
        ]);

        assert_eq!(scenario.current(), None);
        scenario.start();
        assert_eq!(scenario.current().as_ref(), scenario.actions().first());

        first.finish();
        assert_eq!(scenario.current().as_ref(), scenario.actions().get(1));
    }

    #[test]
    fn future_acts_run_on_spawner() {
        let mut pool = LocalPool::new();
        let (sender, receiver) = oneshot::channel::<()>();
        let receiver = RefCell::new(Some(receiver));
        let acts_log = ActLog::new();

        let scenario = Scenario::with_spawner(
            vec![
                FnAct::new("Spin")
                    .on_action(move || {
                        let receiver = receiver.borrow_mut().take();
                        Ok(ActOutcome::future(async move {
                            if let Some(receiver) = receiver {
                                receiver.await.map_err(|_| ActError::failed("spin cancelled"))?;
                            }
                            Ok(())
                        }))
                    })
                    .boxed(),
                acts_log.act("Pays").boxed(),
            ],
            pool.spawner(),
        );

        scenario.start();
        pool.run_until_stalled();
        assert!(acts_log.events().is_empty());

        sender.send(()).unwrap();
        pool.run_until_stalled();

        assert_eq!(acts_log.events(), vec!["apply Pays"]);
        assert_eq!(scenario.outcome(), Some(Ok(())));
    }
}
