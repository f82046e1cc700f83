//! The [`World`] is the top-level container: it owns the entity allocator,
//! the per-type component stores, the Position store plus spatial index, the
//! event queue, the shared [`GameState`] block, and the resource map.
//!
//! One simulation thread owns the `World` and performs all mutation; render
//! and monitor threads hold a clone of the `Arc<GameState>` and read it
//! lock-free. The Position store is deliberately private behind read-only
//! accessors -- every placement flows through [`World::place_entity`],
//! [`World::move_entity`], or a committed
//! [`SpatialTransaction`](crate::spatial::SpatialTransaction), which is what
//! keeps the store and the spatial index in lock-step.

use std::any::TypeId;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::entity::{Entity, EntityAllocator};
use crate::event::{Event, EventKind, EventPayload, EventQueue};
use crate::resource::{Resources, TimeResource};
use crate::spatial::{Position, SpatialIndex, SpatialTransaction};
use crate::state::GameState;
use crate::store::{AnyStore, Component, ComponentStore};
use crate::SpatialError;

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Position never flows through the generic store surface; catching it here
/// keeps the spatial index and the Position store in lock-step.
fn debug_assert_not_position<T: Component>() {
    debug_assert!(
        TypeId::of::<T>() != TypeId::of::<Position>(),
        "Position is read through position()/positions() and written through the spatial APIs"
    );
}

/// Container for all runtime state of one game.
pub struct World {
    allocator: EntityAllocator,
    alive: HashSet<Entity>,
    stores: HashMap<TypeId, Box<dyn AnyStore>>,
    positions: ComponentStore<Position>,
    spatial: SpatialIndex,
    events: EventQueue,
    state: Arc<GameState>,
    resources: Resources,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entity_count", &self.alive.len())
            .field("store_count", &self.stores.len())
            .field("occupied_cells", &self.spatial.len())
            .finish()
    }
}

impl World {
    /// Create a world with a default-tuned [`GameState`].
    pub fn new() -> Self {
        Self::with_game_state(GameState::new(GameState::DEFAULT_MAX_HEAT))
    }

    /// Create a world around a custom-tuned [`GameState`] (heat ceiling etc.).
    pub fn with_game_state(state: GameState) -> Self {
        Self {
            allocator: EntityAllocator::new(),
            alive: HashSet::new(),
            stores: HashMap::new(),
            positions: ComponentStore::new(),
            spatial: SpatialIndex::new(),
            events: EventQueue::new(),
            state: Arc::new(state),
            resources: Resources::new(),
        }
    }

    // -- entity lifecycle ---------------------------------------------------

    /// Create a fresh entity. The handle is unique for the process lifetime.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.allocator.create();
        self.alive.insert(entity);
        entity
    }

    /// Destroy an entity: removes its components from every registered
    /// store, frees its spatial cell, and permanently invalidates the
    /// handle. Idempotent -- destroying a stale handle returns `false`.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        if !self.alive.remove(&entity) {
            return false;
        }
        for store in self.stores.values_mut() {
            store.remove_entity(entity);
        }
        self.clear_placement(entity);
        tracing::debug!(%entity, "destroyed entity");
        true
    }

    /// Whether `entity` is currently alive.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.alive.contains(&entity)
    }

    /// Number of currently alive entities.
    pub fn entity_count(&self) -> usize {
        self.alive.len()
    }

    // -- component stores ---------------------------------------------------

    /// Register the component type `T`, creating its store. Registering the
    /// same type twice is a no-op.
    ///
    /// # Panics
    ///
    /// Panics for [`Position`]: positions are managed through the spatial
    /// APIs, never through the generic store surface.
    pub fn register_component<T: Component>(&mut self) {
        assert!(
            TypeId::of::<T>() != TypeId::of::<Position>(),
            "Position is managed through place_entity/move_entity/transactions, \
             not the generic component API"
        );
        self.stores
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(ComponentStore::<T>::new()));
    }

    /// Copy out the `T` component of `entity`. `None` if the entity has no
    /// such component, is destroyed, or `T` was never registered.
    ///
    /// [`Position`] is not served here -- read it through
    /// [`position`](Self::position).
    pub fn get<T: Component>(&self, entity: Entity) -> Option<T> {
        debug_assert_not_position::<T>();
        self.store::<T>()?.get(entity)
    }

    /// Insert or overwrite the `T` component of `entity` (the write half of
    /// the copy-back protocol). Returns `false` without mutating anything if
    /// the entity is not alive.
    ///
    /// # Panics
    ///
    /// Panics if `T` was never registered -- call
    /// [`register_component`](Self::register_component) first.
    pub fn insert<T: Component>(&mut self, entity: Entity, value: T) -> bool {
        if !self.alive.contains(&entity) {
            return false;
        }
        self.store_mut::<T>().insert(entity, value);
        true
    }

    /// Remove the `T` component of `entity`, returning it. `None` if absent.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        debug_assert_not_position::<T>();
        self.stores
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()?
            .remove(entity)
    }

    /// Whether `entity` holds a `T` component.
    pub fn contains<T: Component>(&self, entity: Entity) -> bool {
        debug_assert_not_position::<T>();
        self.store::<T>().is_some_and(|s| s.contains(entity))
    }

    /// Snapshot of every entity holding a `T` component. For positions use
    /// [`positions`](Self::positions)`.entities()`.
    pub fn entities_with<T: Component>(&self) -> Vec<Entity> {
        debug_assert_not_position::<T>();
        self.store::<T>().map_or_else(Vec::new, |s| s.entities())
    }

    /// Read access to the `T` store, if registered.
    pub fn store<T: Component>(&self) -> Option<&ComponentStore<T>> {
        self.stores
            .get(&TypeId::of::<T>())?
            .as_any()
            .downcast_ref::<ComponentStore<T>>()
    }

    fn store_mut<T: Component>(&mut self) -> &mut ComponentStore<T> {
        self.stores
            .get_mut(&TypeId::of::<T>())
            .unwrap_or_else(|| {
                panic!(
                    "component type `{}` not registered -- call world.register_component first",
                    std::any::type_name::<T>()
                )
            })
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
            .expect("store registry holds mismatched type")
    }

    // -- positions & spatial index ------------------------------------------

    /// The position of `entity`, if it occupies a cell.
    pub fn position(&self, entity: Entity) -> Option<Position> {
        self.positions.get(entity)
    }

    /// Read-only view of the Position store.
    pub fn positions(&self) -> &ComponentStore<Position> {
        &self.positions
    }

    /// The entity occupying `(x, y)`, if any. This is the single source of
    /// truth for collision checks; systems must not keep shadow maps.
    pub fn entity_at(&self, x: i32, y: i32) -> Option<Entity> {
        self.spatial.entity_at(x, y)
    }

    /// Whether any entity occupies `(x, y)`.
    pub fn has_any_at(&self, x: i32, y: i32) -> bool {
        self.spatial.is_occupied(x, y)
    }

    /// Place `entity` at `(x, y)` -- uncontested initial placement.
    ///
    /// Fails without mutating anything if the entity is dead or another
    /// entity occupies the cell. Re-placing an entity on its own cell
    /// succeeds. For multi-entity or contended spawns use
    /// [`begin_spatial_transaction`](Self::begin_spatial_transaction).
    pub fn place_entity(&mut self, entity: Entity, x: i32, y: i32) -> Result<(), SpatialError> {
        if !self.alive.contains(&entity) {
            return Err(SpatialError::DeadEntity { entity });
        }
        if let Some(occupant) = self.spatial.entity_at(x, y) {
            if occupant != entity {
                return Err(SpatialError::Occupied { x, y, occupant });
            }
        }
        self.apply_placement(entity, x, y);
        Ok(())
    }

    /// Move `entity` to `(x, y)`, vacating its previous cell. Same failure
    /// contract as [`place_entity`](Self::place_entity).
    pub fn move_entity(&mut self, entity: Entity, x: i32, y: i32) -> Result<(), SpatialError> {
        self.place_entity(entity, x, y)
    }

    /// Remove `entity` from the Position store and the spatial index.
    /// Returns `false` if it had no position. Callers destroying an entity
    /// need not call this first -- destruction cascades it.
    pub fn remove_from_spatial_index(&mut self, entity: Entity) -> bool {
        self.clear_placement(entity)
    }

    /// Read-only view of the spatial index (for renderers and tests).
    pub fn spatial_index(&self) -> &SpatialIndex {
        &self.spatial
    }

    /// Start an optimistic placement batch. Stage placements and removals on
    /// the transaction, then [`commit`](crate::spatial::SpatialTransaction::commit)
    /// it against this world.
    pub fn begin_spatial_transaction(&self) -> SpatialTransaction {
        SpatialTransaction::new()
    }

    /// Apply one placement to store and index together. Validation is the
    /// caller's responsibility.
    pub(crate) fn apply_placement(&mut self, entity: Entity, x: i32, y: i32) {
        if let Some(prev) = self.positions.get(entity) {
            self.spatial.release(prev.x, prev.y);
        }
        self.positions.insert(entity, Position::new(x, y));
        self.spatial.claim(x, y, entity);
    }

    /// Remove one entity from store and index together.
    pub(crate) fn clear_placement(&mut self, entity: Entity) -> bool {
        match self.positions.remove(entity) {
            Some(pos) => {
                self.spatial.release(pos.x, pos.y);
                true
            }
            None => false,
        }
    }

    // -- events -------------------------------------------------------------

    /// Push an event stamped with the current game time. It will be
    /// dispatched during the *next* tick's drain phase.
    pub fn push_event(&mut self, kind: EventKind, payload: EventPayload) {
        let at_ms = self
            .resources
            .get::<TimeResource>()
            .map_or(0, |t| t.game_time_ms);
        self.push_event_at(kind, payload, at_ms);
    }

    /// Push an event with an explicit timestamp.
    pub fn push_event_at(&mut self, kind: EventKind, payload: EventPayload, at_ms: u64) {
        self.events.push(Event {
            kind,
            payload,
            at_ms,
        });
    }

    /// Drain every pending event. Called once per tick by the scheduler;
    /// events pushed after this call wait for the next tick.
    pub fn take_events(&mut self) -> VecDeque<Event> {
        self.events.take_all()
    }

    /// Number of events waiting for the next drain.
    pub fn pending_event_count(&self) -> usize {
        self.events.len()
    }

    // -- shared state & resources -------------------------------------------

    /// The shared atomic state block. Clone the `Arc` to hand it to a render
    /// or monitor thread; all its reads are lock-free.
    pub fn game_state(&self) -> &Arc<GameState> {
        &self.state
    }

    /// Insert or replace a resource singleton.
    pub fn insert_resource<R: std::any::Any + Send>(&mut self, resource: R) {
        self.resources.insert(resource);
    }

    /// The resource of type `R`, if present.
    pub fn resource<R: std::any::Any + Send>(&self) -> Option<&R> {
        self.resources.get::<R>()
    }

    /// The resource of type `R`; panics if absent (programmer error).
    pub fn expect_resource<R: std::any::Any + Send>(&self) -> &R {
        self.resources.expect::<R>()
    }

    /// The full resource map.
    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Mutable access to the resource map.
    pub fn resources_mut(&mut self) -> &mut Resources {
        &mut self.resources
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommitError;

    #[derive(Debug, Clone, PartialEq)]
    struct Glyph(char);

    #[derive(Debug, Clone, PartialEq)]
    struct Decay {
        level: u8,
    }

    fn setup_world() -> World {
        let mut world = World::new();
        world.register_component::<Glyph>();
        world.register_component::<Decay>();
        world
    }

    #[test]
    fn create_insert_get() {
        let mut world = setup_world();
        let e = world.create_entity();
        assert!(world.insert(e, Glyph('x')));
        assert_eq!(world.get::<Glyph>(e), Some(Glyph('x')));
        assert!(world.contains::<Glyph>(e));
    }

    #[test]
    fn insert_on_destroyed_entity_is_rejected() {
        let mut world = setup_world();
        let e = world.create_entity();
        world.destroy_entity(e);
        assert!(!world.insert(e, Glyph('x')));
        assert_eq!(world.get::<Glyph>(e), None);
    }

    #[test]
    fn destroy_cascades_all_stores_and_spatial() {
        let mut world = setup_world();
        let e = world.create_entity();
        world.insert(e, Glyph('g'));
        world.insert(e, Decay { level: 3 });
        world.place_entity(e, 2, 2).unwrap();

        assert!(world.destroy_entity(e));
        assert!(!world.is_alive(e));
        assert_eq!(world.get::<Glyph>(e), None);
        assert_eq!(world.get::<Decay>(e), None);
        assert_eq!(world.position(e), None);
        assert_eq!(world.entity_at(2, 2), None);

        // Second destroy is a stale no-op.
        assert!(!world.destroy_entity(e));
    }

    #[test]
    fn place_and_move_keep_index_consistent() {
        let mut world = setup_world();
        let e = world.create_entity();

        world.place_entity(e, 1, 1).unwrap();
        assert_eq!(world.entity_at(1, 1), Some(e));
        assert!(world.has_any_at(1, 1));

        world.move_entity(e, 4, 4).unwrap();
        assert_eq!(world.entity_at(1, 1), None);
        assert_eq!(world.entity_at(4, 4), Some(e));
        assert_eq!(world.position(e), Some(Position::new(4, 4)));
    }

    #[test]
    fn place_on_occupied_cell_fails() {
        let mut world = setup_world();
        let a = world.create_entity();
        let b = world.create_entity();
        world.place_entity(a, 3, 3).unwrap();

        let err = world.place_entity(b, 3, 3).unwrap_err();
        assert_eq!(err, SpatialError::Occupied { x: 3, y: 3, occupant: a });
        assert_eq!(world.position(b), None);
    }

    #[test]
    fn replace_on_own_cell_is_ok() {
        let mut world = setup_world();
        let e = world.create_entity();
        world.place_entity(e, 3, 3).unwrap();
        world.place_entity(e, 3, 3).unwrap();
        assert_eq!(world.entity_at(3, 3), Some(e));
    }

    #[test]
    fn place_dead_entity_fails() {
        let mut world = setup_world();
        let e = world.create_entity();
        world.destroy_entity(e);
        assert_eq!(
            world.place_entity(e, 0, 0),
            Err(SpatialError::DeadEntity { entity: e })
        );
    }

    #[test]
    fn transaction_commit_places_batch() {
        let mut world = setup_world();
        let a = world.create_entity();
        let b = world.create_entity();

        let mut tx = world.begin_spatial_transaction();
        tx.spawn(a, 5, 5);
        tx.spawn(b, 6, 5);
        tx.commit(&mut world).unwrap();

        assert_eq!(world.entity_at(5, 5), Some(a));
        assert_eq!(world.entity_at(6, 5), Some(b));
    }

    #[test]
    fn conflicting_commit_applies_nothing() {
        let mut world = setup_world();
        let a = world.create_entity();
        world.place_entity(a, 5, 5).unwrap();

        let b = world.create_entity();
        let c = world.create_entity();
        let mut tx = world.begin_spatial_transaction();
        tx.spawn(b, 7, 7);
        tx.spawn(c, 5, 5); // collides with a

        let err = tx.commit(&mut world).unwrap_err();
        assert_eq!(err, CommitError::Conflict { x: 5, y: 5, occupant: a });

        // Nothing from the batch landed.
        assert_eq!(world.entity_at(5, 5), Some(a));
        assert_eq!(world.entity_at(7, 7), None);
        assert_eq!(world.position(b), None);
        assert_eq!(world.position(c), None);

        // Speculative entities are the caller's to clean up.
        world.destroy_entity(b);
        world.destroy_entity(c);
    }

    #[test]
    fn duplicate_staged_cells_conflict() {
        let mut world = setup_world();
        let a = world.create_entity();
        let b = world.create_entity();

        let mut tx = world.begin_spatial_transaction();
        tx.spawn(a, 1, 2);
        tx.spawn(b, 1, 2);
        assert_eq!(
            tx.commit(&mut world),
            Err(CommitError::DuplicateStaged { x: 1, y: 2 })
        );
        assert!(!world.has_any_at(1, 2));
    }

    #[test]
    fn staged_removal_frees_cell_for_placement() {
        let mut world = setup_world();
        let old = world.create_entity();
        world.place_entity(old, 2, 2).unwrap();

        let new = world.create_entity();
        let mut tx = world.begin_spatial_transaction();
        tx.remove(old);
        tx.spawn(new, 2, 2);
        tx.commit(&mut world).unwrap();

        assert_eq!(world.entity_at(2, 2), Some(new));
        assert_eq!(world.position(old), None);
    }

    #[test]
    fn staged_movers_vacate_their_cells() {
        let mut world = setup_world();
        let a = world.create_entity();
        let b = world.create_entity();
        world.place_entity(a, 0, 0).unwrap();
        world.place_entity(b, 1, 0).unwrap();

        // Swap a and b in one batch.
        let mut tx = world.begin_spatial_transaction();
        tx.spawn(a, 1, 0);
        tx.spawn(b, 0, 0);
        tx.commit(&mut world).unwrap();

        assert_eq!(world.entity_at(1, 0), Some(a));
        assert_eq!(world.entity_at(0, 0), Some(b));
    }

    #[test]
    fn events_are_stamped_with_game_time() {
        let mut world = setup_world();
        world.insert_resource(TimeResource {
            game_time_ms: 320,
            delta_ms: 16,
        });
        world.push_event(EventKind::ScoreChanged, EventPayload::Amount(10));

        let events = world.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].at_ms, 320);
        assert_eq!(world.pending_event_count(), 0);
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn insert_unregistered_component_panics() {
        let mut world = World::new();
        let e = world.create_entity();
        world.insert(e, Glyph('x'));
    }

    #[test]
    #[should_panic(expected = "Position is managed")]
    fn position_cannot_be_registered_generically() {
        let mut world = World::new();
        world.register_component::<Position>();
    }

    #[test]
    fn game_state_is_shared() {
        let world = setup_world();
        let state = Arc::clone(world.game_state());
        state.add_score(5);
        assert_eq!(world.game_state().score(), 5);
    }
}
