//! Sluice Engine -- the simulation driver for the Sluice runtime.
//!
//! This crate builds on [`sluice_ecs`] to provide the driving side of the
//! engine: the [`System`](system::System) contract, the priority-ordered
//! [`Scheduler`](scheduler::Scheduler) that drains events and runs updates,
//! and the fixed-timestep [`TickLoop`](tick::TickLoop).
//!
//! # Quick Start
//!
//! ```
//! use sluice_engine::prelude::*;
//!
//! struct Pulse;
//!
//! impl System for Pulse {
//!     fn name(&self) -> &str {
//!         "pulse"
//!     }
//!
//!     fn priority(&self) -> i32 {
//!         priority::EFFECTS
//!     }
//!
//!     fn update(&mut self, world: &mut World, _dt: f64) {
//!         world.game_state().add_score(1);
//!     }
//! }
//!
//! let mut scheduler = Scheduler::new();
//! scheduler.add_system(Box::new(Pulse));
//!
//! let mut tick_loop = TickLoop::new(World::new(), scheduler, TickConfig::default());
//! tick_loop.run_ticks(10);
//!
//! assert_eq!(tick_loop.world().game_state().score(), 10);
//! ```

#![deny(unsafe_code)]

pub mod scheduler;
pub mod system;
pub mod tick;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use sluice_ecs;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Install a `tracing` subscriber reading `RUST_LOG` from the environment.
/// For binaries and examples; safe to call more than once (later calls are
/// no-ops).
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Everything from the ECS prelude.
    pub use sluice_ecs::prelude::*;

    // Engine-specific exports.
    pub use crate::scheduler::{Scheduler, SchedulerReport};
    pub use crate::system::{priority, System};
    pub use crate::tick::{TickConfig, TickDiagnostics, TickLoop};
}
