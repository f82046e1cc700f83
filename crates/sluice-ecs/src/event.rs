//! Game events and the queued event bus.
//!
//! An [`Event`] is a typed tag plus a payload. Producers push onto the
//! world's [`EventQueue`]; the scheduler drains the queue once per tick
//! (before any `update` call) and dispatches each event to subscribed
//! systems in priority order. Events pushed during dispatch or update land
//! in the live queue and are not observed until the next tick's drain -- a
//! deliberate one-tick delay that prevents re-entrant event cascades.
//!
//! Payloads are a closed tagged union rather than an `Any` downcast. A
//! handler that expects the wrong shape gets `None` from the accessor,
//! warns, and returns; dispatch to other subscribers continues.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::entity::Entity;

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// The event vocabulary of the game. Systems subscribe by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventKind {
    /// A character cell decayed one step.
    CellDecayed,
    /// A gold sequence went live.
    GoldSequenceStarted,
    /// A gold sequence was completed in time.
    GoldSequenceCompleted,
    /// A gold sequence timed out.
    GoldSequenceExpired,
    /// A nugget was collected at the cursor.
    NuggetCollected,
    /// A drain entity entered the board.
    DrainSpawned,
    /// A drain entity left the board.
    DrainDespawned,
    /// The heat level changed.
    HeatChanged,
    /// A splash effect was requested.
    SplashTriggered,
    /// A materializer finished forming an entity.
    EntityMaterialized,
    /// The score changed.
    ScoreChanged,
}

// ---------------------------------------------------------------------------
// EventPayload
// ---------------------------------------------------------------------------

/// Typed event payload.
///
/// The `as_*` accessors return `None` on a shape mismatch; handlers treat
/// that as "drop this event locally" (see the module docs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// No payload.
    None,
    /// A single entity.
    Entity(Entity),
    /// A board cell.
    Cell {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },
    /// An entity together with the cell it occupies.
    EntityCell {
        /// The entity.
        entity: Entity,
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },
    /// A scalar delta or total (score, energy, heat).
    Amount(i64),
    /// A gold sequence.
    Sequence {
        /// Sequence identifier.
        id: u32,
        /// Number of cells in the sequence.
        len: u32,
    },
}

impl EventPayload {
    /// The entity carried by this payload, if any.
    pub fn as_entity(&self) -> Option<Entity> {
        match *self {
            Self::Entity(entity) | Self::EntityCell { entity, .. } => Some(entity),
            _ => None,
        }
    }

    /// The cell carried by this payload, if any.
    pub fn as_cell(&self) -> Option<(i32, i32)> {
        match *self {
            Self::Cell { x, y } | Self::EntityCell { x, y, .. } => Some((x, y)),
            _ => None,
        }
    }

    /// The scalar amount carried by this payload, if any.
    pub fn as_amount(&self) -> Option<i64> {
        match *self {
            Self::Amount(amount) => Some(amount),
            _ => None,
        }
    }

    /// The `(id, len)` of the sequence carried by this payload, if any.
    pub fn as_sequence(&self) -> Option<(u32, u32)> {
        match *self {
            Self::Sequence { id, len } => Some((id, len)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A queued game event.
///
/// Events do not own entities: a handler must re-verify any entity in the
/// payload against the stores (the entity may have been destroyed between
/// push and dispatch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// The typed tag systems subscribe to.
    pub kind: EventKind,
    /// The payload.
    pub payload: EventPayload,
    /// Game time at which the event was pushed, in milliseconds.
    pub at_ms: u64,
}

// ---------------------------------------------------------------------------
// EventQueue
// ---------------------------------------------------------------------------

/// FIFO queue of pending events, drained once per tick by the scheduler.
#[derive(Debug, Default)]
pub struct EventQueue {
    queue: VecDeque<Event>,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    /// Take every pending event, leaving the queue empty.
    ///
    /// The swap is what gives pushes made during dispatch their one-tick
    /// delay: they land in the (now empty) live queue and wait for the next
    /// drain.
    pub fn take_all(&mut self) -> VecDeque<Event> {
        std::mem::take(&mut self.queue)
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no events are pending.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
