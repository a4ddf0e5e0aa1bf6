//=========================================================================
// Flow Loop
//=========================================================================
//
// Top-level phase sequencer (boot → preload → intro → main loop).
//
// Flow:
//   phase(scope, ctx).await → next phase?
//        ↓
//   scope.dispose()          (always, before the next phase body runs)
//        ↓
//   next phase, or end of chain
//
// There is no phase graph: only the running phase and its open scope.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use log::{debug, error};

//=== Internal Dependencies ===============================================

use crate::core::scope::{DisposeGuard, Scope};
use crate::error::FlowError;

//=== Phase ===============================================================

/// What a phase hands back: the next phase, or `None` to end the chain.
pub type PhaseResult<C> = Result<Option<Phase<C>>, FlowError>;

type PhaseBody<C> = Box<dyn FnOnce(Scope, Rc<C>) -> LocalBoxFuture<'static, PhaseResult<C>>>;

/// One step of the top-level game flow.
///
/// Wraps any `async fn(Scope, Rc<C>) -> PhaseResult<C>`. The scope is owned
/// by the flow loop and disposed as soon as the phase returns.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use aetheric_flow::prelude::*;
///
/// struct Ctx;
///
/// async fn logo(_scope: Scope, _ctx: Rc<Ctx>) -> PhaseResult<Ctx> {
///     Phase::next(preloader)
/// }
///
/// async fn preloader(scope: Scope, _ctx: Rc<Ctx>) -> PhaseResult<Ctx> {
///     scope.defer(|| println!("preloader scene removed"));
///     Ok(None)
/// }
///
/// futures::executor::block_on(FlowLoop::run(Rc::new(Ctx), Phase::new(logo))).unwrap();
/// ```
pub struct Phase<C> {
    name: &'static str,
    body: PhaseBody<C>,
}

impl<C: 'static> Phase<C> {
    /// Wraps a phase function, labelled by its type name.
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: FnOnce(Scope, Rc<C>) -> Fut + 'static,
        Fut: Future<Output = PhaseResult<C>> + 'static,
    {
        Self::named(std::any::type_name::<F>(), body)
    }

    /// Wraps a phase function with an explicit label for logging.
    pub fn named<F, Fut>(name: &'static str, body: F) -> Self
    where
        F: FnOnce(Scope, Rc<C>) -> Fut + 'static,
        Fut: Future<Output = PhaseResult<C>> + 'static,
    {
        Self {
            name,
            body: Box::new(move |scope, ctx| body(scope, ctx).boxed_local()),
        }
    }

    /// Shorthand for returning `Ok(Some(Phase::new(body)))` from a phase.
    pub fn next<F, Fut>(body: F) -> PhaseResult<C>
    where
        F: FnOnce(Scope, Rc<C>) -> Fut + 'static,
        Fut: Future<Output = PhaseResult<C>> + 'static,
    {
        Ok(Some(Self::new(body)))
    }

    /// Label used in log output.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<C> fmt::Debug for Phase<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Phase").field(&self.name).finish()
    }
}

//=== FlowLoop ============================================================

/// Runs a chain of phases, each in its own freshly created [`Scope`].
pub struct FlowLoop;

impl FlowLoop {
    /// Drives the chain starting at `first` until a phase returns `None`.
    ///
    /// Every phase's scope is fully disposed before the next phase starts,
    /// including when the phase fails. A phase error ends the chain and is
    /// returned; so is a cleanup failure, since the next phase can no longer
    /// assume a clean slate.
    pub async fn run<C: 'static>(ctx: Rc<C>, first: Phase<C>) -> Result<(), FlowError> {
        let mut current = Some(first);

        while let Some(phase) = current.take() {
            let Phase { name, body } = phase;
            debug!("Entering phase {}", name);

            let scope = Scope::new();
            let guard = DisposeGuard::new(scope.clone());
            let result = body(scope, Rc::clone(&ctx)).await;
            let disposed = guard.dispose();

            match (result, disposed) {
                (Ok(next), Ok(())) => {
                    debug!("Leaving phase {}", name);
                    current = next;
                }
                (Ok(_), Err(err)) => {
                    error!("Phase {} left resources behind: {}", name, err);
                    return Err(err);
                }
                (Err(err), disposed) => {
                    if let Err(cleanup) = disposed {
                        error!("Phase {} cleanup also failed: {}", name, cleanup);
                    }
                    error!("Phase {} failed: {}", name, err);
                    return Err(err);
                }
            }
        }

        debug!("Flow chain ended");
        Ok(())
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::signal::Signal;
    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Ctx {
        order: RefCell<Vec<String>>,
    }

    impl Ctx {
        fn record(&self, entry: &str) {
            self.order.borrow_mut().push(entry.to_string());
        }

        fn order(&self) -> Vec<String> {
            self.order.borrow().clone()
        }
    }

    async fn phase_a(scope: Scope, ctx: Rc<Ctx>) -> PhaseResult<Ctx> {
        ctx.record("A body");
        let c = Rc::clone(&ctx);
        scope.defer(move || c.record("A cleanup"));
        Phase::next(phase_b)
    }

    async fn phase_b(_scope: Scope, ctx: Rc<Ctx>) -> PhaseResult<Ctx> {
        ctx.record("B body");
        Ok(None)
    }

    #[test]
    fn previous_scope_is_disposed_before_next_phase() {
        let ctx = Rc::new(Ctx::default());
        block_on(FlowLoop::run(Rc::clone(&ctx), Phase::new(phase_a))).unwrap();

        assert_eq!(ctx.order(), vec!["A body", "A cleanup", "B body"]);
    }

    #[test]
    fn context_is_passed_unchanged() {
        let ctx = Rc::new(Ctx::default());
        let expected = Rc::clone(&ctx);

        let first = Phase::new(move |_scope, got: Rc<Ctx>| async move {
            assert!(Rc::ptr_eq(&got, &expected));
            got.record("checked");
            Ok(None)
        });

        block_on(FlowLoop::run(Rc::clone(&ctx), first)).unwrap();
        assert_eq!(ctx.order(), vec!["checked"]);
    }

    #[test]
    fn phase_error_still_disposes_scope() {
        let ctx = Rc::new(Ctx::default());

        let first = Phase::named("failing", |scope: Scope, ctx: Rc<Ctx>| async move {
            let c = Rc::clone(&ctx);
            scope.defer(move || c.record("cleanup"));
            Err(FlowError::phase("session lost"))
        });

        let err = block_on(FlowLoop::run(Rc::clone(&ctx), first)).unwrap_err();
        assert_eq!(err, FlowError::phase("session lost"));
        assert_eq!(ctx.order(), vec!["cleanup"]);
    }

    #[test]
    fn cleanup_failure_stops_the_chain() {
        let ctx = Rc::new(Ctx::default());

        let first = Phase::new(|scope: Scope, _ctx: Rc<Ctx>| async move {
            scope.defer(|| panic!("scene already removed"));
            Phase::next(phase_b)
        });

        let err = block_on(FlowLoop::run(Rc::clone(&ctx), first)).unwrap_err();
        assert!(matches!(err, FlowError::Cleanup { failed: 1, .. }));
        assert!(ctx.order().is_empty());
    }

    #[test]
    fn phase_name_defaults_to_function_path() {
        let phase: Phase<Ctx> = Phase::new(phase_b);
        assert!(phase.name().ends_with("phase_b"));
    }

    //--- Main loop pattern ------------------------------------------------

    struct SlotCtx {
        spin: Signal<u32>,
        order: RefCell<Vec<String>>,
    }

    async fn slot_loop(scope: Scope, ctx: Rc<SlotCtx>) -> PhaseResult<SlotCtx> {
        loop {
            let bet = scope
                .run(|idle| {
                    let ctx = Rc::clone(&ctx);
                    async move {
                        let c = Rc::clone(&ctx);
                        idle.defer(move || c.order.borrow_mut().push("idle closed".into()));
                        idle.wait(&ctx.spin).await
                    }
                })
                .await?;

            ctx.order.borrow_mut().push(format!("spin {}", bet));
            if bet == 0 {
                return Ok(None);
            }
        }
    }

    #[test]
    fn sub_phases_run_in_child_scopes() {
        let ctx = Rc::new(SlotCtx {
            spin: Signal::new(),
            order: RefCell::new(Vec::new()),
        });

        let mut pool = LocalPool::new();
        let done = Rc::new(RefCell::new(None));
        {
            let ctx = Rc::clone(&ctx);
            let done = Rc::clone(&done);
            pool.spawner()
                .spawn_local(async move {
                    let result = FlowLoop::run(ctx, Phase::new(slot_loop)).await;
                    *done.borrow_mut() = Some(result);
                })
                .unwrap();
        }

        pool.run_until_stalled();
        ctx.spin.emit(&5);
        pool.run_until_stalled();
        ctx.spin.emit(&0);
        pool.run_until_stalled();

        assert_eq!(*done.borrow(), Some(Ok(())));
        assert_eq!(
            *ctx.order.borrow(),
            vec!["idle closed", "spin 5", "idle closed", "spin 0"]
        );
        assert!(ctx.spin.is_empty());
    }
}
