//! Typed component stores.
//!
//! A [`ComponentStore`] owns every component of one type, keyed by entity.
//! Components are plain values **copied in and out**: [`ComponentStore::get`]
//! clones, and a system mutates its local copy and writes it back with
//! [`ComponentStore::insert`]. The store is the single source of truth; no
//! long-lived mutable references are ever handed out, so a stale aliased copy
//! cannot masquerade as live state.
//!
//! Stores for different types are independent -- iterating one store while
//! mutating another is always safe. [`ComponentStore::entities`] takes a
//! snapshot for exactly that pattern.

use std::any::Any;
use std::collections::HashMap;

use crate::entity::Entity;

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Marker trait for component types. Blanket-implemented: any clonable,
/// thread-safe `'static` type qualifies.
pub trait Component: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Component for T {}

// ---------------------------------------------------------------------------
// ComponentStore
// ---------------------------------------------------------------------------

/// The per-type table owning all components of type `T`.
#[derive(Debug)]
pub struct ComponentStore<T: Component> {
    values: HashMap<Entity, T>,
}

impl<T: Component> ComponentStore<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Copy out the component for `entity`. O(1).
    ///
    /// `None` means the entity has no component of this type -- either it was
    /// never added, it was removed, or the entity is destroyed. Absence is
    /// not an error.
    pub fn get(&self, entity: Entity) -> Option<T> {
        self.values.get(&entity).cloned()
    }

    /// Insert or overwrite the component for `entity`. O(1).
    ///
    /// This is the write half of the copy-back protocol: get, mutate the
    /// local copy, insert it back.
    pub fn insert(&mut self, entity: Entity, value: T) {
        self.values.insert(entity, value);
    }

    /// Remove the component for `entity`, returning it. No-op (`None`) if
    /// absent.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        self.values.remove(&entity)
    }

    /// Whether `entity` currently holds a component of this type.
    pub fn contains(&self, entity: Entity) -> bool {
        self.values.contains_key(&entity)
    }

    /// Snapshot of all entities currently holding this component type.
    ///
    /// The returned vector is detached from the store: the caller may mutate
    /// this or any other store while iterating it. Mutations made after the
    /// snapshot are, naturally, not reflected.
    pub fn entities(&self) -> Vec<Entity> {
        self.values.keys().copied().collect()
    }

    /// Snapshot of all `(entity, component)` pairs.
    pub fn pairs(&self) -> Vec<(Entity, T)> {
        self.values
            .iter()
            .map(|(&e, v)| (e, v.clone()))
            .collect()
    }

    /// Number of live components in this store.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<T: Component> Default for ComponentStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// AnyStore -- type-erased facade for the world's store registry
// ---------------------------------------------------------------------------

/// Object-safe view of a store, used by the world to cascade entity
/// destruction across every registered component type without knowing `T`.
pub(crate) trait AnyStore: Send {
    /// Remove any component this store holds for `entity`.
    fn remove_entity(&mut self, entity: Entity);

    /// Downcast support.
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> AnyStore for ComponentStore<T> {
    fn remove_entity(&mut self, entity: Entity) {
        self.values.remove(&entity);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
