//! Positions, the spatial index, and optimistic placement transactions.
//!
//! The spatial index is a derived, cached view over the Position store: a
//! coordinate-to-entity map holding **at most one entity per cell**. The two
//! structures are only ever mutated in lock-step through the world's
//! placement APIs ([`World::place_entity`](crate::world::World::place_entity)
//! and friends) or through a committed [`SpatialTransaction`]; there is no
//! way to write one without the other.
//!
//! Several spawners must place multiple hard-to-relocate entities at once
//! and cannot tolerate a partial placement. The transaction stages a batch
//! of placements (and removals), validates the whole batch against the live
//! index and against itself, and applies everything or nothing.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::entity::Entity;
use crate::world::World;
use crate::CommitError;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Grid-cell position component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Column, in game cells.
    pub x: i32,
    /// Row, in game cells.
    pub y: i32,
}

impl Position {
    /// Construct a position.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

// ---------------------------------------------------------------------------
// SpatialIndex
// ---------------------------------------------------------------------------

/// Coordinate-to-entity lookup, at most one entity per cell.
///
/// This is the single source of truth for occupancy checks; systems must not
/// maintain shadow position maps.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    cells: HashMap<(i32, i32), Entity>,
}

impl SpatialIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            cells: HashMap::new(),
        }
    }

    /// The entity occupying `(x, y)`, if any.
    pub fn entity_at(&self, x: i32, y: i32) -> Option<Entity> {
        self.cells.get(&(x, y)).copied()
    }

    /// Whether any entity occupies `(x, y)`.
    pub fn is_occupied(&self, x: i32, y: i32) -> bool {
        self.cells.contains_key(&(x, y))
    }

    /// Number of occupied cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no cell is occupied.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Snapshot of all occupied cells.
    pub fn occupied_cells(&self) -> Vec<((i32, i32), Entity)> {
        self.cells.iter().map(|(&c, &e)| (c, e)).collect()
    }

    /// Claim a cell. Callers must have validated the cell is free.
    pub(crate) fn claim(&mut self, x: i32, y: i32, entity: Entity) {
        let previous = self.cells.insert((x, y), entity);
        debug_assert!(
            previous.is_none() || previous == Some(entity),
            "spatial index overwrote a live occupant at ({x}, {y})"
        );
    }

    /// Release a cell. No-op if the cell is free.
    pub(crate) fn release(&mut self, x: i32, y: i32) {
        self.cells.remove(&(x, y));
    }
}

// ---------------------------------------------------------------------------
// SpatialTransaction
// ---------------------------------------------------------------------------

/// An optimistic batch of staged placements and removals.
///
/// Obtained from [`World::begin_spatial_transaction`](crate::world::World::begin_spatial_transaction).
/// Nothing touches the live index until [`commit`](Self::commit); commit
/// validates every staged placement against the current index and against
/// the other staged placements, and on any conflict applies **nothing**.
///
/// After a failed commit the caller owns the cleanup of any speculatively
/// created entities (destroy them and retry or abandon the spawn).
#[derive(Debug, Default)]
pub struct SpatialTransaction {
    placements: Vec<(Entity, i32, i32)>,
    removals: Vec<Entity>,
}

impl SpatialTransaction {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stage a placement of `entity` at `(x, y)`.
    ///
    /// If the entity already occupies a cell, a committed transaction moves
    /// it; its old cell is treated as freed during validation.
    pub fn spawn(&mut self, entity: Entity, x: i32, y: i32) {
        self.placements.push((entity, x, y));
    }

    /// Stage the removal of `entity` from the index. The cell it currently
    /// occupies is treated as freed during validation.
    pub fn remove(&mut self, entity: Entity) {
        self.removals.push(entity);
    }

    /// Number of staged placements.
    pub fn placement_count(&self) -> usize {
        self.placements.len()
    }

    /// Whether nothing has been staged.
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty() && self.removals.is_empty()
    }

    /// Validate and apply the batch, all-or-nothing.
    ///
    /// Validation checks, against the *current* live index:
    /// - no two staged placements target the same cell
    ///   ([`CommitError::DuplicateStaged`]);
    /// - no staged placement targets an occupied cell, unless the occupant
    ///   is the placed entity itself, a staged removal, or another staged
    ///   mover vacating that cell ([`CommitError::Conflict`]).
    ///
    /// On success every removal and placement is applied to the Position
    /// store and the spatial index before this returns, so no caller ever
    /// observes a partially applied batch. On failure the world is untouched.
    pub fn commit(self, world: &mut World) -> Result<(), CommitError> {
        // Cells that this batch vacates: removals plus the current cells of
        // entities being moved.
        let mut freed: HashSet<(i32, i32)> = HashSet::new();
        for &entity in &self.removals {
            if let Some(pos) = world.position(entity) {
                freed.insert((pos.x, pos.y));
            }
        }
        for &(entity, _, _) in &self.placements {
            if let Some(pos) = world.position(entity) {
                freed.insert((pos.x, pos.y));
            }
        }

        // Validate before any mutation.
        let mut staged_cells: HashSet<(i32, i32)> = HashSet::new();
        for &(entity, x, y) in &self.placements {
            if !staged_cells.insert((x, y)) {
                tracing::debug!(x, y, "spatial commit rejected: duplicate staged cell");
                return Err(CommitError::DuplicateStaged { x, y });
            }
            if let Some(occupant) = world.entity_at(x, y) {
                if occupant != entity && !freed.contains(&(x, y)) {
                    tracing::debug!(x, y, %occupant, "spatial commit rejected: cell occupied");
                    return Err(CommitError::Conflict { x, y, occupant });
                }
            }
        }

        // Apply. Vacate every involved entity first so movers and swaps
        // cannot clobber each other's cells, then claim the new cells.
        for entity in self.removals {
            world.clear_placement(entity);
        }
        for &(entity, _, _) in &self.placements {
            world.clear_placement(entity);
        }
        for (entity, x, y) in self.placements {
            world.apply_placement(entity, x, y);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
