//! The system contract.
//!
//! A system is a free-standing unit of gameplay logic with a numeric
//! priority, optional event subscriptions, and a per-tick update hook. The
//! scheduler is the only caller: it dispatches queued events to subscribed
//! systems and then calls [`System::update`] once per tick, both in
//! ascending priority order. All mutation happens on the single simulation
//! thread, so systems receive `&mut World` and never contend with each
//! other.

use sluice_ecs::event::{Event, EventKind};
use sluice_ecs::world::World;

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// A unit of gameplay logic driven by the scheduler.
pub trait System {
    /// Stable name, used for diagnostics and duplicate detection.
    fn name(&self) -> &str;

    /// Execution priority. Lower values run first.
    fn priority(&self) -> i32;

    /// The event kinds this system wants delivered to
    /// [`handle_event`](Self::handle_event). Default: none.
    fn event_kinds(&self) -> &[EventKind] {
        &[]
    }

    /// Handle one queued event. Called once per subscribed event per tick,
    /// before any `update` runs. A system that receives a payload shape it
    /// does not expect should warn and return -- never panic -- so dispatch
    /// to other subscribers continues.
    fn handle_event(&mut self, _world: &mut World, _event: &Event) {}

    /// Advance this system by one tick of `dt` seconds.
    fn update(&mut self, world: &mut World, dt: f64);
}

// ---------------------------------------------------------------------------
// Conventional priorities
// ---------------------------------------------------------------------------

/// The priority bands used by this game's systems, ascending. Gameplay crates
/// are free to slot between them.
pub mod priority {
    /// Heat accounting.
    pub const HEAT: i32 = 0;
    /// Nugget spawning and collection.
    pub const NUGGET: i32 = 50;
    /// Gold-sequence lifecycle.
    pub const GOLD: i32 = 100;
    /// Drain movement and drain-on-cursor checks.
    pub const DRAIN: i32 = 150;
    /// Materializers forming new entities.
    pub const MATERIALIZER: i32 = 200;
    /// Character decay.
    pub const DECAY: i32 = 220;
    /// Visual effects bookkeeping.
    pub const EFFECTS: i32 = 250;
    /// Splash layout requests.
    pub const SPLASH: i32 = 280;
    /// UI counters, always last.
    pub const UI: i32 = 300;
}
