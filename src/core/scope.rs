//=========================================================================
// Scope
//=========================================================================
//
// Cancellation/cleanup unit for phases and sub-flows.
//
// Architecture:
//   Scope (Rc handle)
//     ├─ cleanups: Vec<(id, FnOnce())>   run in LIFO order on dispose
//     └─ disposed flag                   dispose() runs at most once
//
// Helpers register their own cleanup:
//   on()    → disconnect the handler (swept once disconnected early)
//   wait()  → disconnect the once-handler (also removed when it fires)
//   run()   → dispose the child scope (removed once the child finishes
//             or its future is dropped)
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use futures::channel::oneshot;
use log::{error, warn};

//=== Internal Dependencies ===============================================

use crate::core::signal::{Connection, Signal};
use crate::error::{panic_message, FlowError};

//=== Types ===============================================================

type Cleanup = Box<dyn FnOnce()>;
type CleanupId = u64;

struct Entry {
    id: CleanupId,
    cleanup: Cleanup,
    // Subscription the cleanup tears down, if any
    connection: Option<Connection>,
}

impl Entry {
    fn new(id: CleanupId, cleanup: Cleanup) -> Self {
        Self {
            id,
            cleanup,
            connection: None,
        }
    }

    fn subscription(id: CleanupId, connection: Connection) -> Self {
        let registered = connection.clone();
        Self {
            id,
            cleanup: Box::new(move || registered.disconnect()),
            connection: Some(connection),
        }
    }

    fn is_stale(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|connection| !connection.is_connected())
    }
}

struct ScopeInner {
    cleanups: RefCell<Vec<Entry>>,
    next_id: Cell<CleanupId>,
    disposed: Cell<bool>,
}

impl ScopeInner {
    fn reserve_id(&self) -> CleanupId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Registers a cleanup, or runs it right away if already disposed.
    fn insert(&self, entry: Entry) {
        if self.disposed.get() {
            warn!("Cleanup registered on a disposed scope; running it immediately");
            (entry.cleanup)();
            return;
        }
        self.sweep();
        self.cleanups.borrow_mut().push(entry);
    }

    /// Drops a pending cleanup without running it.
    fn cancel(&self, id: CleanupId) {
        let removed = {
            let mut cleanups = self.cleanups.borrow_mut();
            cleanups
                .iter()
                .position(|entry| entry.id == id)
                .map(|pos| cleanups.remove(pos))
        };
        drop(removed);
    }

    /// Drops subscriptions that were disconnected early.
    fn sweep(&self) {
        let stale: Vec<Entry> = {
            let mut cleanups = self.cleanups.borrow_mut();
            let (stale, live) = std::mem::take(&mut *cleanups)
                .into_iter()
                .partition(Entry::is_stale);
            *cleanups = live;
            stale
        };
        drop(stale);
    }

    fn dispose(&self) -> Result<(), FlowError> {
        if self.disposed.replace(true) {
            return Ok(());
        }

        let cleanups = std::mem::take(&mut *self.cleanups.borrow_mut());
        let mut failed = 0;
        let mut first = None;

        for entry in cleanups.into_iter().rev() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(entry.cleanup)) {
                let message = panic_message(payload.as_ref());
                error!("Scope cleanup panicked: {}", message);
                failed += 1;
                first.get_or_insert(message);
            }
        }

        match first {
            None => Ok(()),
            Some(first) => Err(FlowError::Cleanup { failed, first }),
        }
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        // Last handle gone without an explicit dispose
        if let Err(err) = self.dispose() {
            error!("Dropped scope failed to clean up: {}", err);
        }
    }
}

//=== Scope ===============================================================

/// Collects teardown callbacks and runs them in reverse order exactly once.
///
/// `Scope` is a cheap handle; clones refer to the same cleanup list. Every
/// flow phase receives its own scope from [`FlowLoop`](crate::core::flow::FlowLoop),
/// and sub-flows get a child scope through [`Scope::run`].
///
/// # Example
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use aetheric_flow::prelude::*;
///
/// let order = Rc::new(RefCell::new(Vec::new()));
/// let scope = Scope::new();
/// for name in ["a", "b", "c"] {
///     let order = Rc::clone(&order);
///     scope.defer(move || order.borrow_mut().push(name));
/// }
///
/// scope.dispose().unwrap();
/// assert_eq!(*order.borrow(), vec!["c", "b", "a"]);
/// ```
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

impl Scope {
    /// Creates an open scope with no cleanups.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                cleanups: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                disposed: Cell::new(false),
            }),
        }
    }

    //--- Registration -----------------------------------------------------

    /// Registers a cleanup callback.
    ///
    /// On an already disposed scope the callback runs immediately.
    pub fn defer<F>(&self, cleanup: F)
    where
        F: FnOnce() + 'static,
    {
        let id = self.inner.reserve_id();
        self.inner.insert(Entry::new(id, Box::new(cleanup)));
    }

    /// Subscribes `handler` to `signal` until this scope is disposed.
    ///
    /// The returned connection may be disconnected early; its pending
    /// cleanup is then dropped at the next registration.
    pub fn on<T, F>(&self, signal: &Signal<T>, handler: F) -> Connection
    where
        T: 'static,
        F: FnMut(&T) + 'static,
    {
        let connection = signal.connect(handler);
        let id = self.inner.reserve_id();
        self.inner.insert(Entry::subscription(id, connection.clone()));
        connection
    }

    /// Returns a future resolving with the next value emitted by `signal`.
    ///
    /// The subscription is removed when the value arrives or when this
    /// scope is disposed, whichever comes first. In the latter case the
    /// future resolves to [`FlowError::ScopeDisposed`].
    pub fn wait<T>(&self, signal: &Signal<T>) -> Wait<T>
    where
        T: Clone + 'static,
    {
        let (sender, receiver) = oneshot::channel();

        if self.is_disposed() {
            return Wait { receiver };
        }

        let id = self.inner.reserve_id();
        let scope = Rc::downgrade(&self.inner);
        let connection = signal.connect_once(move |value: &T| {
            let _ = sender.send(value.clone());
            if let Some(scope) = scope.upgrade() {
                scope.cancel(id);
            }
        });

        self.inner.insert(Entry::subscription(id, connection));

        Wait { receiver }
    }

    //--- Child Scopes -----------------------------------------------------

    /// Runs `f` inside a child scope and disposes the child when it returns.
    ///
    /// The child is also disposed if this scope is disposed while `f` is
    /// still in flight, or if the returned future is dropped. Cleanup
    /// failures of the child are logged.
    pub async fn run<F, Fut, R>(&self, f: F) -> R
    where
        F: FnOnce(Scope) -> Fut,
        Fut: Future<Output = R>,
    {
        let child = Scope::new();

        let id = self.inner.reserve_id();
        let owned = child.clone();
        self.inner.insert(Entry::new(
            id,
            Box::new(move || {
                if let Err(err) = owned.dispose() {
                    error!("Child scope cleanup failed on parent disposal: {}", err);
                }
            }),
        ));

        let guard = DisposeGuard::child_of(child.clone(), self, id);
        let output = f(child).await;

        if let Err(err) = guard.dispose() {
            error!("Child scope cleanup failed: {}", err);
        }

        output
    }

    //--- Teardown ---------------------------------------------------------

    /// Runs every pending cleanup in reverse registration order.
    ///
    /// Idempotent. A panicking cleanup does not stop the remaining ones;
    /// the first failure is reported after teardown completes.
    pub fn dispose(&self) -> Result<(), FlowError> {
        self.inner.dispose()
    }

    /// Returns true once [`Scope::dispose`] has been called.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Number of cleanups waiting for disposal.
    pub fn pending(&self) -> usize {
        self.inner
            .cleanups
            .borrow()
            .iter()
            .filter(|entry| !entry.is_stale())
            .count()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("pending", &self.pending())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

//=== Wait ================================================================

/// Future returned by [`Scope::wait`].
#[must_use = "futures do nothing unless awaited"]
pub struct Wait<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> Future for Wait<T> {
    type Output = Result<T, FlowError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.map_err(|_| FlowError::ScopeDisposed))
    }
}

//=== DisposeGuard ========================================================

/// Disposes a scope when dropped, covering panics and dropped futures.
///
/// A child guard also withdraws the parent's "dispose child" cleanup.
pub(crate) struct DisposeGuard {
    scope: Option<Scope>,
    parent: Option<(Weak<ScopeInner>, CleanupId)>,
}

impl DisposeGuard {
    pub(crate) fn new(scope: Scope) -> Self {
        Self {
            scope: Some(scope),
            parent: None,
        }
    }

    fn child_of(scope: Scope, parent: &Scope, id: CleanupId) -> Self {
        Self {
            scope: Some(scope),
            parent: Some((Rc::downgrade(&parent.inner), id)),
        }
    }

    /// Disposes now and reports the outcome.
    pub(crate) fn dispose(mut self) -> Result<(), FlowError> {
        self.release()
    }

    fn release(&mut self) -> Result<(), FlowError> {
        let result = match self.scope.take() {
            Some(scope) => scope.dispose(),
            None => Ok(()),
        };
        if let Some((parent, id)) = self.parent.take() {
            if let Some(parent) = parent.upgrade() {
                parent.cancel(id);
            }
        }
        result
    }
}

impl Drop for DisposeGuard {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            error!("Scope cleanup failed during unwind: {}", err);
        }
    }
}

//=========================================================================
// Tests
//=========================================================================
