//! Entity identifiers and allocation.
//!
//! An [`Entity`] is an opaque non-zero 64-bit handle. Handles are issued in
//! strictly increasing order and are **never reused** within a process
//! lifetime: destroying an entity permanently invalidates its handle, and
//! every store treats a stale handle as simple absence. Because the inner
//! value is [`NonZeroU64`], `Option<Entity>` is pointer-sized and plays the
//! role of the reserved "no entity" zero.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// An opaque, non-zero handle identifying one game object.
///
/// Carries no data itself; components attached to it live in the per-type
/// stores. Handles compare and hash by value and are safe to copy freely.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Entity(NonZeroU64);

impl Entity {
    /// Raw `u64` representation. Never zero.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0.get()
    }

    /// Reconstruct from a raw `u64`. Returns `None` for zero, the reserved
    /// "no entity" value.
    #[inline]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Issues unique, monotonically increasing [`Entity`] handles.
///
/// There is no deallocate operation here: destruction is a store-level and
/// spatial-index-level concern, and a destroyed id is never handed out again.
#[derive(Debug)]
pub struct EntityAllocator {
    /// The next id to issue. Starts at 1; zero is reserved.
    next: u64,
}

impl EntityAllocator {
    /// Create a new allocator. The first issued handle is id 1.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Issue a fresh, never-before-seen handle. O(1).
    ///
    /// # Panics
    ///
    /// Panics on id-space exhaustion (`u64` overflow). At one entity per
    /// nanosecond that is several centuries of uptime; treating it as fatal
    /// is deliberate, since a wrapped id would silently alias a live handle.
    pub fn create(&mut self) -> Entity {
        let id = self.next;
        self.next = self
            .next
            .checked_add(1)
            .expect("entity id space exhausted");
        Entity(NonZeroU64::new(id).expect("entity ids start at 1"))
    }

    /// Total number of handles issued so far.
    pub fn issued_count(&self) -> u64 {
        self.next - 1
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
