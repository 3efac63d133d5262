//! Shared scenario instances
//!
//! Process-lifetime cache of fixture objects keyed by type. Expensive
//! scenario state is built once and handed to every test that asks for it.

use anyhow::anyhow;
use once_cell::sync::OnceCell;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::config::Bindings;

/// Fixture data built from the run's bindings
pub trait SharedScenario: Send + Sync + Sized + 'static {
    fn from_bindings(bindings: &Bindings) -> anyhow::Result<Self>;
}

type Slot = Arc<OnceCell<Arc<dyn Any + Send + Sync>>>;

/// Type-keyed get-or-create cache.
///
/// Each type has its own slot, so building one instance never blocks
/// lookups of another type, while concurrent first requests for the same
/// type construct it only once.
#[derive(Default)]
pub struct SharedRegistry {
    slots: Mutex<HashMap<TypeId, Slot>>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot<T: 'static>(&self) -> Slot {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(TypeId::of::<T>())
            .or_default()
            .clone()
    }

    /// Return the cached `T`, running `init` only when none exists yet.
    /// A failed `init` leaves the slot empty.
    pub fn get_or_create<T, F>(&self, init: F) -> anyhow::Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> anyhow::Result<T>,
    {
        let slot = self.slot::<T>();
        let instance = slot.get_or_try_init(|| {
            let value = init()?;
            debug!("Created shared instance of {}", std::any::type_name::<T>());
            Ok::<_, anyhow::Error>(Arc::new(value) as Arc<dyn Any + Send + Sync>)
        })?;

        instance
            .clone()
            .downcast::<T>()
            .map_err(|_| anyhow!("shared slot for {} holds another type", std::any::type_name::<T>()))
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .map(|slot| slot.get().is_some())
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for SharedRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("SharedRegistry").field("slots", &count).finish()
    }
}
