//! Sluice ECS -- entity-component substrate for a terminal arcade game.
//!
//! This crate provides the data side of the runtime: an entity allocator
//! that never reuses handles, per-type component stores with copy-in/copy-out
//! values, a spatial index with optimistic all-or-nothing placement
//! transactions, a lock-free atomic game-state block shared with render
//! threads, a queued event bus, and typed singleton resources. The driver
//! side (systems, scheduler, tick loop) lives in `sluice-engine`.
//!
//! # Quick Start
//!
//! ```
//! use sluice_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Glyph(char);
//!
//! let mut world = World::new();
//! world.register_component::<Glyph>();
//!
//! let miner = world.create_entity();
//! world.insert(miner, Glyph('@'));
//! world.place_entity(miner, 5, 5).unwrap();
//!
//! assert_eq!(world.entity_at(5, 5), Some(miner));
//!
//! // Batch placement is all-or-nothing.
//! let nugget = world.create_entity();
//! let mut tx = world.begin_spatial_transaction();
//! tx.spawn(nugget, 5, 5); // collides with the miner
//! assert!(tx.commit(&mut world).is_err());
//! assert_eq!(world.entity_at(5, 5), Some(miner));
//! world.destroy_entity(nugget);
//! ```

#![deny(unsafe_code)]

pub mod entity;
pub mod event;
pub mod resource;
pub mod spatial;
pub mod state;
pub mod store;
pub mod world;

use entity::Entity;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a [`SpatialTransaction`](spatial::SpatialTransaction) commit was
/// rejected. A rejected commit applies nothing; the caller destroys any
/// speculatively created entities and may retry elsewhere or abandon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CommitError {
    /// A staged placement targets a cell occupied by a live entity that the
    /// batch does not vacate.
    #[error("cell ({x}, {y}) is already occupied by {occupant}")]
    Conflict {
        /// Column of the contested cell.
        x: i32,
        /// Row of the contested cell.
        y: i32,
        /// The live occupant.
        occupant: Entity,
    },

    /// Two staged placements target the same cell.
    #[error("two staged placements target cell ({x}, {y})")]
    DuplicateStaged {
        /// Column of the doubly-claimed cell.
        x: i32,
        /// Row of the doubly-claimed cell.
        y: i32,
    },
}

/// Why a non-transactional placement was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SpatialError {
    /// The target cell is occupied by another live entity.
    #[error("cell ({x}, {y}) is already occupied by {occupant}")]
    Occupied {
        /// Column of the occupied cell.
        x: i32,
        /// Row of the occupied cell.
        y: i32,
        /// The live occupant.
        occupant: Entity,
    },

    /// The entity being placed has already been destroyed.
    #[error("entity {entity} is not alive")]
    DeadEntity {
        /// The stale handle.
        entity: Entity,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::entity::{Entity, EntityAllocator};
    pub use crate::event::{Event, EventKind, EventPayload, EventQueue};
    pub use crate::resource::{
        AudioPlayer, AudioResource, ConfigResource, GameMode, InputResource, Resources,
        RngResource, TimeResource,
    };
    pub use crate::spatial::{Position, SpatialIndex, SpatialTransaction};
    pub use crate::state::{
        DrainSnapshot, GameState, GoldSnapshot, Phase, TimerSnapshot,
    };
    pub use crate::store::{Component, ComponentStore};
    pub use crate::world::World;
    pub use crate::{CommitError, SpatialError};
}
