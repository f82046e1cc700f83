//! The shared, lock-free game-state block.
//!
//! [`GameState`] is a block of independently atomic fields written by
//! simulation systems and read concurrently by the renderer and any
//! auxiliary monitors. It is shared as an `Arc`; every read is a plain
//! atomic load and every write is a store or compare-and-swap -- there are
//! no locks anywhere on this path.
//!
//! Compound snapshots (cursor, gold, boost/ping timers, drain position) are
//! packed into single `u64` words, so one load yields a consistent
//! point-in-time value: a reader can never observe, say, gold "active"
//! paired with a sequence id from the previous round. Fields with
//! time-based expiry use a read-check-swap so that exactly one caller among
//! racing expiry-checkers observes the transition.
//!
//! Every field has one writer-of-record system per tick; the atomics exist
//! for the many concurrent readers and for the handful of CAS-guarded
//! transitions that can race between checkers.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU64, AtomicU8, Ordering};

use crate::entity::Entity;

/// Number of color classes tracked by the per-color counters.
pub const COLOR_CLASSES: usize = 8;
/// Number of brightness levels tracked per color class.
pub const COLOR_LEVELS: usize = 8;

// ---------------------------------------------------------------------------
// Word packing
// ---------------------------------------------------------------------------

// Two i32 coordinates in one word: [x: high 32 | y: low 32].
fn pack_cell(x: i32, y: i32) -> u64 {
    ((x as u32 as u64) << 32) | (y as u32 as u64)
}

fn unpack_cell(word: u64) -> (i32, i32) {
    ((word >> 32) as u32 as i32, word as u32 as i32)
}

// Gold word: [active: bit 63 | sequence_id: bits 32..63 | deadline_ms: low 32].
const GOLD_ACTIVE_BIT: u64 = 1 << 63;

fn pack_gold(sequence_id: u32, deadline_ms: u32) -> u64 {
    GOLD_ACTIVE_BIT | ((sequence_id as u64 & 0x7FFF_FFFF) << 32) | deadline_ms as u64
}

// Timer word: [enabled: bit 63 | end_time_ms: low 63].
const TIMER_ENABLED_BIT: u64 = 1 << 63;

fn pack_timer(end_ms: u64) -> u64 {
    TIMER_ENABLED_BIT | (end_ms & !TIMER_ENABLED_BIT)
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Point-in-time view of the gold-sequence state.
///
/// `active` and `sequence_id` always come from the same atomic load;
/// an active snapshot never carries a zero or stale sequence id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldSnapshot {
    /// Whether a gold sequence is currently live.
    pub active: bool,
    /// Identifier of the live sequence (0 only when inactive).
    pub sequence_id: u32,
    /// Game time at which the sequence was activated, advisory.
    pub started_ms: u64,
    /// Game time at which the sequence expires.
    pub deadline_ms: u64,
}

/// Point-in-time view of the drain state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainSnapshot {
    /// Whether a drain is currently live.
    pub active: bool,
    /// The drain entity, if live.
    pub entity: Option<Entity>,
    /// Column of the drain.
    pub x: i32,
    /// Row of the drain.
    pub y: i32,
}

/// Point-in-time view of a boost/ping style expiring timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    /// Whether the timer is currently enabled.
    pub enabled: bool,
    /// Game time at which it ends (meaningless when disabled).
    pub ends_at_ms: u64,
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Coarse round phase, stored as a single atomic byte.
///
/// The transition *policy* (who moves the phase and when) belongs to
/// gameplay systems; this is only the atomic substrate. The typical cycle is
/// `Idle -> GoldActive -> {GoldComplete | GoldTimeout} -> CleanerPending ->
/// CleanerActive -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Phase {
    /// No round in progress.
    Idle = 0,
    /// A gold sequence is live.
    GoldActive = 1,
    /// The sequence was completed in time.
    GoldComplete = 2,
    /// The sequence expired.
    GoldTimeout = 3,
    /// Cleanup is queued.
    CleanerPending = 4,
    /// Cleanup is running.
    CleanerActive = 5,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::GoldActive,
            2 => Self::GoldComplete,
            3 => Self::GoldTimeout,
            4 => Self::CleanerPending,
            5 => Self::CleanerActive,
            _ => Self::Idle,
        }
    }
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// The block of atomic fields shared between the simulation thread and
/// concurrent readers. Construct once per world and share via `Arc`.
#[derive(Debug)]
pub struct GameState {
    score: AtomicI64,
    energy: AtomicI64,
    heat: AtomicI64,
    max_heat: i64,
    cursor: AtomicU64,
    gold: AtomicU64,
    gold_started_ms: AtomicU64,
    drain_entity: AtomicU64,
    drain_cell: AtomicU64,
    phase: AtomicU8,
    boost: AtomicU64,
    ping: AtomicU64,
    color_counts: [[AtomicI32; COLOR_LEVELS]; COLOR_CLASSES],
}

impl GameState {
    /// Default heat ceiling used by [`GameState::new`] callers that do not
    /// tune it.
    pub const DEFAULT_MAX_HEAT: i64 = 100;

    /// Create a fresh state block. `max_heat` is the inclusive heat ceiling.
    ///
    /// # Panics
    ///
    /// Panics if `max_heat` is negative.
    pub fn new(max_heat: i64) -> Self {
        assert!(max_heat >= 0, "max_heat must be non-negative, got {max_heat}");
        Self {
            score: AtomicI64::new(0),
            energy: AtomicI64::new(0),
            heat: AtomicI64::new(0),
            max_heat,
            cursor: AtomicU64::new(pack_cell(0, 0)),
            gold: AtomicU64::new(0),
            gold_started_ms: AtomicU64::new(0),
            drain_entity: AtomicU64::new(0),
            drain_cell: AtomicU64::new(pack_cell(0, 0)),
            phase: AtomicU8::new(Phase::Idle as u8),
            boost: AtomicU64::new(0),
            ping: AtomicU64::new(0),
            color_counts: std::array::from_fn(|_| std::array::from_fn(|_| AtomicI32::new(0))),
        }
    }

    // -- score / energy -----------------------------------------------------

    /// Current score.
    pub fn score(&self) -> i64 {
        self.score.load(Ordering::Acquire)
    }

    /// Add `delta` (may be negative) to the score, returning the new value.
    pub fn add_score(&self, delta: i64) -> i64 {
        self.score.fetch_add(delta, Ordering::AcqRel) + delta
    }

    /// Current energy -- the gating resource for drains.
    pub fn energy(&self) -> i64 {
        self.energy.load(Ordering::Acquire)
    }

    /// Add `delta` (may be negative) to energy, returning the new value.
    pub fn add_energy(&self, delta: i64) -> i64 {
        self.energy.fetch_add(delta, Ordering::AcqRel) + delta
    }

    /// Atomically spend `amount` of energy if at least that much is
    /// available. Returns `true` if the spend happened. Exactly one of two
    /// racing spenders of the last `amount` succeeds.
    pub fn spend_energy(&self, amount: i64) -> bool {
        self.energy
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current >= amount).then_some(current - amount)
            })
            .is_ok()
    }

    // -- heat ---------------------------------------------------------------

    /// Current heat, always within `[0, max_heat]`.
    pub fn heat(&self) -> i64 {
        self.heat.load(Ordering::Acquire)
    }

    /// The inclusive heat ceiling.
    pub fn max_heat(&self) -> i64 {
        self.max_heat
    }

    /// Add `delta` to heat, clamping the result to `[0, max_heat]`.
    /// Returns the clamped new value.
    pub fn add_heat(&self, delta: i64) -> i64 {
        let mut current = self.heat.load(Ordering::Acquire);
        loop {
            let next = (current + delta).clamp(0, self.max_heat);
            match self.heat.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    /// Set heat directly, clamped to `[0, max_heat]`.
    pub fn set_heat(&self, value: i64) {
        self.heat.store(value.clamp(0, self.max_heat), Ordering::Release);
    }

    // -- cursor -------------------------------------------------------------

    /// Move the cursor.
    pub fn set_cursor(&self, x: i32, y: i32) {
        self.cursor.store(pack_cell(x, y), Ordering::Release);
    }

    /// Consistent `(x, y)` snapshot of the cursor -- both coordinates come
    /// from one load.
    pub fn cursor(&self) -> (i32, i32) {
        unpack_cell(self.cursor.load(Ordering::Acquire))
    }

    // -- gold sequence ------------------------------------------------------

    /// Activate a gold sequence.
    ///
    /// `sequence_id` must be non-zero (zero is the inactive encoding) and
    /// fit in 31 bits; `deadline_ms` saturates at `u32::MAX` milliseconds of
    /// game time.
    pub fn activate_gold(&self, sequence_id: u32, started_ms: u64, deadline_ms: u64) {
        debug_assert!(sequence_id != 0, "sequence id 0 encodes inactive");
        debug_assert!(sequence_id <= 0x7FFF_FFFF, "sequence id exceeds 31 bits");
        let deadline = u32::try_from(deadline_ms).unwrap_or(u32::MAX);
        self.gold_started_ms.store(started_ms, Ordering::Release);
        self.gold
            .store(pack_gold(sequence_id, deadline), Ordering::Release);
    }

    /// Deactivate the gold sequence unconditionally.
    pub fn deactivate_gold(&self) {
        self.gold.store(0, Ordering::Release);
    }

    /// Consistent snapshot of the gold state. `active` and `sequence_id`
    /// always agree; the started stamp is advisory display data.
    pub fn gold(&self) -> GoldSnapshot {
        let word = self.gold.load(Ordering::Acquire);
        GoldSnapshot {
            active: word & GOLD_ACTIVE_BIT != 0,
            sequence_id: ((word >> 32) & 0x7FFF_FFFF) as u32,
            started_ms: self.gold_started_ms.load(Ordering::Acquire),
            deadline_ms: (word as u32) as u64,
        }
    }

    /// Clear the gold sequence only if the live sequence id matches.
    ///
    /// Under racing callers for the same id, exactly one observes `true`.
    /// A stale id (sequence already replaced or cleared) returns `false`.
    pub fn clear_gold_if_matches(&self, sequence_id: u32) -> bool {
        let word = self.gold.load(Ordering::Acquire);
        if word & GOLD_ACTIVE_BIT == 0 || ((word >> 32) & 0x7FFF_FFFF) as u32 != sequence_id {
            return false;
        }
        self.gold
            .compare_exchange(word, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Clear the gold sequence if `now_ms` is past its deadline. Exactly one
    /// racing expiry-checker observes `true`.
    pub fn expire_gold(&self, now_ms: u64) -> bool {
        let word = self.gold.load(Ordering::Acquire);
        if word & GOLD_ACTIVE_BIT == 0 || now_ms < (word as u32) as u64 {
            return false;
        }
        self.gold
            .compare_exchange(word, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    // -- drain --------------------------------------------------------------

    /// Record `entity` as the live drain at `(x, y)`.
    pub fn activate_drain(&self, entity: Entity, x: i32, y: i32) {
        self.drain_cell.store(pack_cell(x, y), Ordering::Release);
        self.drain_entity.store(entity.to_raw(), Ordering::Release);
    }

    /// Update the live drain's position.
    pub fn set_drain_cell(&self, x: i32, y: i32) {
        self.drain_cell.store(pack_cell(x, y), Ordering::Release);
    }

    /// Snapshot of the drain state. Activity and entity always agree (zero
    /// raw id encodes "no drain", which no live entity can collide with).
    pub fn drain(&self) -> DrainSnapshot {
        let entity = Entity::from_raw(self.drain_entity.load(Ordering::Acquire));
        let (x, y) = unpack_cell(self.drain_cell.load(Ordering::Acquire));
        DrainSnapshot {
            active: entity.is_some(),
            entity,
            x,
            y,
        }
    }

    /// Clear the drain slot only if it still refers to `entity`.
    ///
    /// This is the verify-before-use guard for destroy-vs-in-flight races:
    /// exactly one of N racing callers for the same entity observes `true`.
    pub fn clear_drain_if_matches(&self, entity: Entity) -> bool {
        self.drain_entity
            .compare_exchange(entity.to_raw(), 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    // -- phase --------------------------------------------------------------

    /// Current phase.
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Set the phase unconditionally.
    pub fn set_phase(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Move the phase from `from` to `to` only if it still is `from`.
    /// Returns whether this call performed the transition.
    pub fn transition_phase(&self, from: Phase, to: Phase) -> bool {
        self.phase
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    // -- boost / ping timers ------------------------------------------------

    /// Enable the boost until `until_ms` of game time.
    pub fn enable_boost(&self, until_ms: u64) {
        self.boost.store(pack_timer(until_ms), Ordering::Release);
    }

    /// Snapshot of the boost timer.
    pub fn boost(&self) -> TimerSnapshot {
        let word = self.boost.load(Ordering::Acquire);
        TimerSnapshot {
            enabled: word & TIMER_ENABLED_BIT != 0,
            ends_at_ms: word & !TIMER_ENABLED_BIT,
        }
    }

    /// If the boost is enabled and `now_ms` is past its end time, disable it.
    /// Returns whether **this call** performed the transition, so exactly one
    /// caller among racers observes `true`.
    pub fn expire_boost(&self, now_ms: u64) -> bool {
        let word = self.boost.load(Ordering::Acquire);
        if word & TIMER_ENABLED_BIT == 0 || now_ms < (word & !TIMER_ENABLED_BIT) {
            return false;
        }
        self.boost
            .compare_exchange(word, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Enable the ping marker until `until_ms` of game time.
    pub fn enable_ping(&self, until_ms: u64) {
        self.ping.store(pack_timer(until_ms), Ordering::Release);
    }

    /// Snapshot of the ping timer.
    pub fn ping(&self) -> TimerSnapshot {
        let word = self.ping.load(Ordering::Acquire);
        TimerSnapshot {
            enabled: word & TIMER_ENABLED_BIT != 0,
            ends_at_ms: word & !TIMER_ENABLED_BIT,
        }
    }

    /// Expire the ping timer; same exactly-once contract as
    /// [`expire_boost`](Self::expire_boost).
    pub fn expire_ping(&self, now_ms: u64) -> bool {
        let word = self.ping.load(Ordering::Acquire);
        if word & TIMER_ENABLED_BIT == 0 || now_ms < (word & !TIMER_ENABLED_BIT) {
            return false;
        }
        self.ping
            .compare_exchange(word, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    // -- per-color live counters --------------------------------------------

    /// Adjust the live count for `(color, level)` by `delta`, clamping at
    /// zero. These feed UI counts, not authoritative totals, so going
    /// negative is clamped rather than treated as an error. Out-of-range
    /// indices are ignored.
    pub fn add_color_count(&self, color: usize, level: usize, delta: i32) {
        let Some(counter) = self
            .color_counts
            .get(color)
            .and_then(|levels| levels.get(level))
        else {
            tracing::warn!(color, level, "color count index out of range, ignored");
            return;
        };
        let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            Some((current + delta).max(0))
        });
    }

    /// Live count for `(color, level)`. Out-of-range indices read zero.
    pub fn color_count(&self, color: usize, level: usize) -> i32 {
        self.color_counts
            .get(color)
            .and_then(|levels| levels.get(level))
            .map_or(0, |counter| counter.load(Ordering::Acquire))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
