//=========================================================================
// Aetheric Flow Engine
//
// Host loop driving the flow, the animation clock and player requests.
//
// Architecture:
// ```text
//     EngineBuilder  ──build()──>  Engine  ──run(ctx, first)──>  [Host Loop]
//         │                          │
//         ├─ with_tps()              ├─ services()  ticker, skips, spawner
//         └─ with_channel_capacity() ├─ handle()    Send, posts EngineEvent
//                                    └─ step(dt)    one manual tick
// ```
//
// Each tick:
//   1. Drain queued EngineEvents (skip → skip_requests signal)
//   2. Advance the animation ticker by dt
//   3. Poll the flow and act futures until they stall
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;
use log::{debug, error, info};

//=== Internal Dependencies ===============================================

use crate::core::anim::Ticker;
use crate::core::flow::{FlowLoop, Phase};
use crate::core::signal::Signal;
use crate::error::FlowError;

//=== Module Declarations =================================================

pub mod event;

pub use event::{EngineEvent, EngineHandle, TickControl};

type Outcome = Rc<RefCell<Option<Result<(), FlowError>>>>;

//=== EngineBuilder =======================================================

/// Builder for configuring and constructing an [`Engine`].
///
/// # Default Values
///
/// - **TPS**: 60.0 (host ticks per second)
/// - **Channel capacity**: 128 events
///
/// # Examples
///
/// ```
/// use aetheric_flow::EngineBuilder;
///
/// let engine = EngineBuilder::new()
///     .with_tps(30.0)
///     .with_channel_capacity(16)
///     .build();
///
/// assert!(engine.handle().request_skip());
/// ```
#[derive(Debug, Clone)]
pub struct EngineBuilder {
    tps: f64,
    channel_capacity: usize,
}

impl EngineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            tps: 60.0,
            channel_capacity: 128,
        }
    }

    /// Sets the target ticks per second for [`Engine::run`].
    ///
    /// Default: 60.0
    ///
    /// # Panics
    ///
    /// Panics if `tps <= 0.0`.
    pub fn with_tps(mut self, tps: f64) -> Self {
        assert!(tps > 0.0, "TPS must be positive, got {}", tps);
        self.tps = tps;
        self
    }

    /// Sets how many host events may queue between two ticks.
    ///
    /// Default: 128
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Channel capacity must be positive");
        self.channel_capacity = capacity;
        self
    }

    /// Builds the engine instance.
    pub fn build(self) -> Engine {
        info!("Building engine (TPS: {}, channel: {})", self.tps, self.channel_capacity);

        let (sender, receiver) = bounded(self.channel_capacity);
        let pool = LocalPool::new();
        let services = EngineServices {
            ticker: Ticker::new(),
            skip_requests: Signal::new(),
            spawner: pool.spawner(),
        };

        Engine {
            tps: self.tps,
            pool,
            services,
            sender,
            receiver,
            launched: false,
            outcome: Rc::new(RefCell::new(None)),
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== EngineServices ======================================================

/// Engine-owned services game code builds its phase context from.
#[derive(Clone)]
pub struct EngineServices {
    /// Animation clock advanced once per tick.
    pub ticker: Ticker,

    /// Fires once per [`EngineEvent::SkipRequested`].
    pub skip_requests: Signal<()>,

    /// Spawner for scenarios whose acts return futures.
    pub spawner: LocalSpawner,
}

//=== Engine ==============================================================

/// Aetheric Flow runtime.
///
/// Everything except [`EngineHandle`] lives on the thread that owns the
/// engine. Create via [`EngineBuilder`].
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
/// use aetheric_flow::prelude::*;
///
/// struct Ctx;
///
/// async fn boot(scope: Scope, _ctx: Rc<Ctx>) -> PhaseResult<Ctx> {
///     scope.defer(|| println!("boot scene removed"));
///     Ok(None)
/// }
///
/// let engine = EngineBuilder::new().with_tps(240.0).build();
/// engine.run(Rc::new(Ctx), Phase::new(boot)).unwrap();
/// ```
pub struct Engine {
    tps: f64,
    pool: LocalPool,
    services: EngineServices,
    sender: Sender<EngineEvent>,
    receiver: Receiver<EngineEvent>,
    launched: bool,
    outcome: Outcome,
}

impl Engine {
    //--- Accessors --------------------------------------------------------

    /// Services to hand to phases through the flow context.
    pub fn services(&self) -> &EngineServices {
        &self.services
    }

    /// Returns a handle for posting events from any thread.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle::new(self.sender.clone())
    }

    /// How the flow ended, once it has.
    pub fn outcome(&self) -> Option<Result<(), FlowError>> {
        self.outcome.borrow().clone()
    }

    //--- Execution --------------------------------------------------------

    /// Schedules the flow starting at `first`. It begins on the next tick.
    ///
    /// Only one flow may be launched per engine.
    pub fn launch<C: 'static>(&mut self, ctx: Rc<C>, first: Phase<C>) -> Result<(), FlowError> {
        if self.launched {
            return Err(FlowError::Spawn("a flow is already launched".to_string()));
        }

        info!("Launching flow at phase {}", first.name());

        let outcome = Rc::clone(&self.outcome);
        self.services
            .spawner
            .spawn_local(async move {
                let result = FlowLoop::run(ctx, first).await;
                *outcome.borrow_mut() = Some(result);
            })
            .map_err(|e| FlowError::Spawn(e.to_string()))?;

        self.launched = true;
        Ok(())
    }

    /// Runs one tick with `dt` seconds of animation time.
    ///
    /// Returns [`TickControl::Exit`] on shutdown or once the flow ended.
    pub fn step(&mut self, dt: f64) -> TickControl {
        if let TickControl::Exit = self.collect_events(None) {
            return TickControl::Exit;
        }
        self.tick(dt)
    }

    /// Launches the flow and ticks at the configured rate until it ends
    /// or a shutdown is posted.
    ///
    /// A flow still running at shutdown is dropped, disposing its scopes.
    pub fn run<C: 'static>(mut self, ctx: Rc<C>, first: Phase<C>) -> Result<(), FlowError> {
        self.launch(ctx, first)?;

        let frame_duration = Duration::from_secs_f64(1.0 / self.tps);
        info!("Starting host loop (TPS: {})", self.tps);

        // Let synchronous phases run before the first wait
        let mut control = self.tick(0.0);
        let mut last = Instant::now();

        while let TickControl::Continue = control {
            let frame_start = Instant::now();

            //--- Step 1: Gather host events ------------------------------
            if let TickControl::Exit = self.collect_events(Some(frame_duration)) {
                info!("Shutdown requested");
                break;
            }

            //--- Step 2: Advance clock and flow --------------------------
            let now = Instant::now();
            let dt = now.duration_since(last).as_secs_f64();
            last = now;
            control = self.tick(dt);

            //--- Step 3: Maintain pacing ---------------------------------
            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                thread::sleep(frame_duration - elapsed);
            }
        }

        let outcome = self.outcome();
        info!("Host loop exited");
        outcome.unwrap_or(Ok(()))
    }

    //--- Internals --------------------------------------------------------

    fn tick(&mut self, dt: f64) -> TickControl {
        self.services.ticker.advance(dt);
        self.pool.run_until_stalled();

        match &*self.outcome.borrow() {
            None => TickControl::Continue,
            Some(Ok(())) => {
                debug!("Flow completed");
                TickControl::Exit
            }
            Some(Err(err)) => {
                error!("Flow ended with error: {}", err);
                TickControl::Exit
            }
        }
    }

    /// Dispatches queued events, waiting up to `wait` for the first one.
    fn collect_events(&self, wait: Option<Duration>) -> TickControl {
        if let Some(timeout) = wait {
            match self.receiver.recv_timeout(timeout) {
                Ok(event) => {
                    if let TickControl::Exit = self.dispatch(event) {
                        return TickControl::Exit;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return TickControl::Exit,
            }
        }

        while let Ok(event) = self.receiver.try_recv() {
            if let TickControl::Exit = self.dispatch(event) {
                return TickControl::Exit;
            }
        }

        TickControl::Continue
    }

    fn dispatch(&self, event: EngineEvent) -> TickControl {
        debug!("Engine event: {:?}", event);
        match event {
            EngineEvent::SkipRequested => {
                self.services.skip_requests.emit(&());
                TickControl::Continue
            }
            EngineEvent::Shutdown => TickControl::Exit,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
