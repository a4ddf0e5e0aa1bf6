//=========================================================================
// Controller Store
//=========================================================================
//
// Keyed registry of background controllers (bets, autoplay, ...).
//
// Controllers react to UI and state changes without blocking flows and
// never trigger flow transitions themselves. Phases add them to the
// shared context and remove them from their scope's cleanup.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::Any;
use std::collections::HashMap;

use log::{debug, warn};

//=== Controller Trait ====================================================

/// Background controller owned by a [`ControllerStore`].
///
/// Only `destroy` is available as a hook; the default does nothing.
pub trait Controller: 'static {
    /// Called when the controller is removed, replaced or the store is cleared.
    fn destroy(&mut self) {}
}

//=== Type Erasure ========================================================

trait StoredController {
    fn destroy(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Controller> StoredController for T {
    fn destroy(&mut self) {
        Controller::destroy(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

//=== ControllerStore =====================================================

/// Owns background controllers by id and destroys them on removal.
#[derive(Default)]
pub struct ControllerStore {
    controllers: HashMap<String, Box<dyn StoredController>>,
}

impl ControllerStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    //--- Registration -----------------------------------------------------

    /// Adds a controller, destroying any controller already stored under `id`.
    pub fn add<T: Controller>(&mut self, id: impl Into<String>, controller: T) {
        let id = id.into();
        if let Some(mut previous) = self.controllers.remove(&id) {
            warn!("Controller {:?} was already registered and has been replaced", id);
            previous.destroy();
        }
        debug!("Adding controller {:?}", id);
        self.controllers.insert(id, Box::new(controller));
    }

    /// Removes and destroys the controller under `id`.
    ///
    /// Returns false if nothing was stored there.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.controllers.remove(id) {
            Some(mut controller) => {
                debug!("Removing controller {:?}", id);
                controller.destroy();
                true
            }
            None => false,
        }
    }

    /// Removes and destroys every controller.
    pub fn clear(&mut self) {
        for (id, mut controller) in self.controllers.drain() {
            debug!("Clearing controller {:?}", id);
            controller.destroy();
        }
    }

    //--- Query API --------------------------------------------------------

    /// Returns the controller under `id` if it has type `T`.
    pub fn get<T: Controller>(&self, id: &str) -> Option<&T> {
        self.controllers.get(id)?.as_any().downcast_ref::<T>()
    }

    /// Mutable variant of [`ControllerStore::get`].
    pub fn get_mut<T: Controller>(&mut self, id: &str) -> Option<&mut T> {
        self.controllers.get_mut(id)?.as_any_mut().downcast_mut::<T>()
    }

    /// Returns true if a controller is stored under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.controllers.contains_key(id)
    }

    /// Number of stored controllers.
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}

impl Drop for ControllerStore {
    fn drop(&mut self) {
        self.clear();
    }
}

//=========================================================================
// Tests
//=========================================================================
