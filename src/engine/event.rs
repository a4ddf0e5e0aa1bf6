//=========================================================================
// Engine Events
//
// Messages posted to the engine from outside the flow thread.
//
// Responsibilities:
// - Represent host requests (player skip, shutdown) as plain values
// - Provide a Send handle that UI or network threads can hold
// - Report back-pressure instead of blocking the sender
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{Sender, TrySendError};
use log::warn;

//=== EngineEvent =========================================================

/// Request delivered to the engine on its next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// The player asked to fast-forward the running presentation.
    SkipRequested,

    /// Stop the host loop. The running flow is dropped and its scopes
    /// are disposed.
    Shutdown,
}

//=== TickControl =========================================================

/// Whether the host loop should keep ticking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Exit,
}

//=== EngineHandle ========================================================

/// Cloneable, thread-safe handle for posting [`EngineEvent`]s.
///
/// Sends never block: when the queue is full the event is dropped and
/// the call returns `false`.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    sender: Sender<EngineEvent>,
}

impl EngineHandle {
    pub(crate) fn new(sender: Sender<EngineEvent>) -> Self {
        Self { sender }
    }

    /// Posts `event`. Returns false if it could not be queued.
    pub fn send(&self, event: EngineEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!("Engine event queue full, dropping {:?}", event);
                false
            }
            Err(TrySendError::Disconnected(event)) => {
                warn!("Engine is gone, dropping {:?}", event);
                false
            }
        }
    }

    /// Posts [`EngineEvent::SkipRequested`].
    pub fn request_skip(&self) -> bool {
        self.send(EngineEvent::SkipRequested)
    }

    /// Posts [`EngineEvent::Shutdown`].
    pub fn shutdown(&self) -> bool {
        self.send(EngineEvent::Shutdown)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
