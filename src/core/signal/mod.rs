//=========================================================================
// Signal System
//=========================================================================
//
// Per-instance publish/subscribe used by every other core component.
//
// Architecture:
//   Signal<T>
//     └─ slots: Vec<Slot<T>>  (handler + id + once flag)
//   Connection
//     └─ Weak<dyn SlotOwner> + id  (type-erased, payload-agnostic)
//
// There is no global bus: each runner, action or scenario owns the
// signals it emits.
//
//=========================================================================

//=== Module Declarations =================================================

mod connection;
mod signal;

//=== Public API ==========================================================

pub use connection::Connection;
pub use signal::Signal;
