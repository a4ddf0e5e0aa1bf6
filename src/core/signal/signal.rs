//=========================================================================
// Signal
//=========================================================================
//
// Single-threaded multi-subscriber broadcast.
//
// Architecture:
//   connect()/connect_once() → slots: Vec<Slot<T>>
//                                   ↓
//   emit(&T) ──snapshot──→ each still-connected slot, in connect order
//
// Emission works on a snapshot of the slot list, so handlers may freely
// connect, disconnect or emit again while being called.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use log::warn;

//=== Internal Dependencies ===============================================

use super::connection::{Connection, SlotId, SlotOwner};

//=== Slots ===============================================================

enum Handler<T> {
    Many(Box<dyn FnMut(&T)>),
    Once(Option<Box<dyn FnOnce(&T)>>),
}

struct Slot<T> {
    id: SlotId,
    once: bool,
    handler: Rc<RefCell<Handler<T>>>,
}

pub(super) struct SignalInner<T> {
    next_id: Cell<SlotId>,
    slots: RefCell<Vec<Slot<T>>>,
}

impl<T> SlotOwner for SignalInner<T> {
    fn remove_slot(&self, id: SlotId) -> bool {
        // Removed handler is dropped after the borrow is released
        let removed = {
            let mut slots = self.slots.borrow_mut();
            slots
                .iter()
                .position(|slot| slot.id == id)
                .map(|pos| slots.remove(pos))
        };
        removed.is_some()
    }

    fn has_slot(&self, id: SlotId) -> bool {
        self.slots.borrow().iter().any(|slot| slot.id == id)
    }
}

//=== Signal ==============================================================

/// Observer list scoped to its owning object.
///
/// Cloning a `Signal` yields another handle to the same slot list.
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T: 'static> Signal<T> {
    /// Creates a signal with no listeners.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SignalInner {
                next_id: Cell::new(0),
                slots: RefCell::new(Vec::new()),
            }),
        }
    }

    //--- Subscription -----------------------------------------------------

    /// Subscribes a handler called on every emission until disconnected.
    pub fn connect<F>(&self, handler: F) -> Connection
    where
        F: FnMut(&T) + 'static,
    {
        self.insert(false, Handler::Many(Box::new(handler)))
    }

    /// Subscribes a handler for the next emission only.
    ///
    /// The slot is removed before the handler runs, so a re-entrant emit
    /// from inside the handler does not call it again.
    pub fn connect_once<F>(&self, handler: F) -> Connection
    where
        F: FnOnce(&T) + 'static,
    {
        self.insert(true, Handler::Once(Some(Box::new(handler))))
    }

    fn insert(&self, once: bool, handler: Handler<T>) -> Connection {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);

        self.inner.slots.borrow_mut().push(Slot {
            id,
            once,
            handler: Rc::new(RefCell::new(handler)),
        });

        let weak: Weak<SignalInner<T>> = Rc::downgrade(&self.inner);
        let owner: Weak<dyn SlotOwner> = weak;
        Connection::new(owner, id)
    }

    /// Removes every handler.
    pub fn disconnect_all(&self) {
        let removed = std::mem::take(&mut *self.inner.slots.borrow_mut());
        drop(removed);
    }

    //--- Emission ---------------------------------------------------------

    /// Calls every connected handler with `value`, in connection order.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<(SlotId, bool, Rc<RefCell<Handler<T>>>)> = self
            .inner
            .slots
            .borrow()
            .iter()
            .map(|slot| (slot.id, slot.once, Rc::clone(&slot.handler)))
            .collect();

        for (id, once, handler) in snapshot {
            // Skip slots disconnected by an earlier handler of this emit
            let live = if once {
                self.inner.remove_slot(id)
            } else {
                self.inner.has_slot(id)
            };
            if !live {
                continue;
            }

            let Ok(mut handler) = handler.try_borrow_mut() else {
                warn!("Signal handler {} re-entered during its own call; skipped", id);
                continue;
            };

            match &mut *handler {
                Handler::Many(f) => f(value),
                Handler::Once(f) => {
                    if let Some(f) = f.take() {
                        f(value);
                    }
                }
            }
        }
    }

    //--- Query API --------------------------------------------------------

    /// Number of currently connected handlers.
    pub fn listener_count(&self) -> usize {
        self.inner.slots.borrow().len()
    }

    /// Returns true if nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.listener_count() == 0
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.inner.slots.borrow().len())
            .finish()
    }
}

//=========================================================================
// Tests
//=========================================================================
