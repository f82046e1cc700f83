//! Fixed-timestep tick loop.
//!
//! The [`TickLoop`] drives the simulation forward. Each tick:
//!
//! 1. The [`TimeResource`] advances to this tick's simulation time.
//! 2. The scheduler drains queued events and dispatches them, then runs
//!    every system's `update`, all in priority order.
//! 3. The tick counter advances and diagnostics are recorded.
//!
//! Simulation time is derived by multiplying the tick counter by the fixed
//! step rather than accumulating floats, so the same tick always has the
//! same timestamp across runs and platforms. Randomness must come from the
//! seeded [`RngResource`](sluice_ecs::resource::RngResource); with that, the
//! loop is fully deterministic: same initial world + same systems + same
//! inputs = same final state.

use std::time::{Duration, Instant};

use sluice_ecs::resource::TimeResource;
use sluice_ecs::world::World;

use crate::scheduler::Scheduler;

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Configuration for the tick loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Fixed time step in seconds per tick. Must be positive and finite.
    pub fixed_dt: f64,
}

impl Default for TickConfig {
    /// Defaults to 60 Hz.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
        }
    }
}

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Timing and dispatch diagnostics for the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock update time per system, in execution order.
    pub system_times: Vec<(String, Duration)>,
    /// Number of events drained at the start of the tick.
    pub events_drained: usize,
    /// Number of handler invocations performed during the drain.
    pub dispatches: usize,
    /// Total wall-clock time for the tick.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// TickLoop
// ---------------------------------------------------------------------------

/// The fixed-timestep driver owning the world and the scheduler.
pub struct TickLoop {
    world: World,
    scheduler: Scheduler,
    fixed_dt: f64,
    tick_counter: u64,
    last_diagnostics: TickDiagnostics,
}

impl TickLoop {
    /// Create a tick loop. Registers a zeroed [`TimeResource`] on the world
    /// if the caller has not already provided one.
    ///
    /// # Panics
    ///
    /// Panics if `config.fixed_dt` is not positive and finite.
    pub fn new(mut world: World, scheduler: Scheduler, config: TickConfig) -> Self {
        assert!(
            config.fixed_dt > 0.0 && config.fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {}",
            config.fixed_dt
        );
        if world.resource::<TimeResource>().is_none() {
            world.insert_resource(TimeResource::default());
        }
        Self {
            world,
            scheduler,
            fixed_dt: config.fixed_dt,
            tick_counter: 0,
            last_diagnostics: TickDiagnostics::default(),
        }
    }

    /// Simulation time at the end of tick `n`, in milliseconds.
    fn time_at_tick_ms(&self, n: u64) -> u64 {
        (n as f64 * self.fixed_dt * 1000.0).round() as u64
    }

    /// Execute one simulation tick.
    pub fn tick(&mut self) {
        let tick_start = Instant::now();

        // Advance the clock to this tick's time before anything runs, so
        // systems and event stamps see the tick they are part of.
        let now_ms = self.time_at_tick_ms(self.tick_counter + 1);
        let delta_ms = now_ms - self.time_at_tick_ms(self.tick_counter);
        self.world.insert_resource(TimeResource {
            game_time_ms: now_ms,
            delta_ms,
        });

        let report = self.scheduler.run_tick(&mut self.world, self.fixed_dt);
        self.tick_counter += 1;

        self.last_diagnostics = TickDiagnostics {
            system_times: report.update_times,
            events_drained: report.events_drained,
            dispatches: report.dispatches,
            total_time: tick_start.elapsed(),
        };
        tracing::trace!(
            tick = self.tick_counter,
            events = self.last_diagnostics.events_drained,
            "tick complete"
        );
    }

    /// Run `count` ticks in sequence.
    pub fn run_ticks(&mut self, count: u64) {
        for _ in 0..count {
            self.tick();
        }
    }

    /// Number of ticks executed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Current simulation time in milliseconds (time of the last tick).
    pub fn game_time_ms(&self) -> u64 {
        self.time_at_tick_ms(self.tick_counter)
    }

    /// The world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the world (setup, test assertions).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Diagnostics from the last tick.
    pub fn diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

impl std::fmt::Debug for TickLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickLoop")
            .field("tick_counter", &self.tick_counter)
            .field("fixed_dt", &self.fixed_dt)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_advances_by_fixed_step() {
        let config = TickConfig {
            fixed_dt: 1.0 / 60.0,
        };
        let mut tick_loop = TickLoop::new(World::new(), Scheduler::new(), config);

        tick_loop.tick();
        assert_eq!(tick_loop.tick_count(), 1);
        let time = tick_loop.world().expect_resource::<TimeResource>();
        assert_eq!(time.game_time_ms, 17); // round(16.67)
        assert!(time.delta_ms == 16 || time.delta_ms == 17);

        tick_loop.run_ticks(59);
        assert_eq!(tick_loop.tick_count(), 60);
        // One second of 60 Hz ticks is exactly one second, no float drift.
        assert_eq!(tick_loop.game_time_ms(), 1_000);
    }

    #[test]
    #[should_panic(expected = "fixed_dt must be positive")]
    fn zero_dt_is_rejected() {
        let _ = TickLoop::new(
            World::new(),
            Scheduler::new(),
            TickConfig { fixed_dt: 0.0 },
        );
    }

    #[test]
    fn existing_time_resource_is_respected_until_first_tick() {
        let mut world = World::new();
        world.insert_resource(TimeResource {
            game_time_ms: 999,
            delta_ms: 0,
        });
        let tick_loop = TickLoop::new(world, Scheduler::new(), TickConfig::default());
        assert_eq!(
            tick_loop
                .world()
                .expect_resource::<TimeResource>()
                .game_time_ms,
            999
        );
    }
}
