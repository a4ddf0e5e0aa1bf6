//=========================================================================
// Signal Connection
//=========================================================================
//
// Type-erased handle to one subscription on a Signal<T>.
//
// The connection only knows a slot id and a weak, type-erased pointer
// to the owning signal, so it can be stored next to cleanups of any
// payload type (scopes, runners) without generic parameters.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::rc::Weak;

//=========================================================================

/// Identifier of one handler slot within a signal.
pub(super) type SlotId = u64;

/// Type-erased view of a signal's slot list.
///
/// Lets a [`Connection`] remove its slot without knowing the payload type.
pub(super) trait SlotOwner {
    /// Removes the slot. Returns false if it was already gone.
    fn remove_slot(&self, id: SlotId) -> bool;

    /// Returns true if the slot is still registered.
    fn has_slot(&self, id: SlotId) -> bool;
}

//=== Connection ==========================================================

/// Handle returned by [`Signal::connect`](super::Signal::connect).
///
/// Disconnecting is idempotent and tolerates the signal having been
/// dropped already. Dropping a `Connection` does **not** disconnect.
#[derive(Clone)]
pub struct Connection {
    owner: Weak<dyn SlotOwner>,
    id: SlotId,
}

impl Connection {
    pub(super) fn new(owner: Weak<dyn SlotOwner>, id: SlotId) -> Self {
        Self { owner, id }
    }

    /// Removes the handler from its signal. Safe to call more than once.
    pub fn disconnect(&self) {
        if let Some(owner) = self.owner.upgrade() {
            owner.remove_slot(self.id);
        }
    }

    /// Returns true while the handler is still registered.
    pub fn is_connected(&self) -> bool {
        self.owner
            .upgrade()
            .map(|owner| owner.has_slot(self.id))
            .unwrap_or(false)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}
