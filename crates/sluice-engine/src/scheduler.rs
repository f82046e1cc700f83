//! Priority-ordered event dispatch and update scheduling.
//!
//! One [`Scheduler`] drives all registered systems. Each tick it:
//!
//! 1. Drains the world's event queue (everything pushed before this tick).
//! 2. Dispatches each drained event, in FIFO order, to every subscribed
//!    system in ascending priority order.
//! 3. Calls [`System::update`] on every system, again in ascending priority
//!    order.
//!
//! Events pushed during (2) or (3) land in the live queue and are not
//! observed until the next tick's drain. That one-tick delay is what makes
//! effect chains deterministic and keeps a handler from recursively feeding
//! itself within a tick.
//!
//! The scheduler runs on the single simulation thread; systems never mutate
//! the world concurrently with each other. Concurrent readers (the renderer)
//! see only the lock-free [`GameState`](sluice_ecs::state::GameState) block.

use std::time::{Duration, Instant};

use sluice_ecs::world::World;

use crate::system::System;

// ---------------------------------------------------------------------------
// SchedulerReport
// ---------------------------------------------------------------------------

/// What one [`Scheduler::run_tick`] call did, for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct SchedulerReport {
    /// Number of events drained at the start of the tick.
    pub events_drained: usize,
    /// Number of (event, system) handler invocations.
    pub dispatches: usize,
    /// Wall-clock update time per system, in execution order.
    pub update_times: Vec<(String, Duration)>,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Owns the registered systems, sorted by ascending priority.
#[derive(Default)]
pub struct Scheduler {
    systems: Vec<Box<dyn System>>,
}

impl Scheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a system. Systems with equal priority run in registration
    /// order.
    ///
    /// # Panics
    ///
    /// Panics if a system with the same name is already registered.
    pub fn add_system(&mut self, system: Box<dyn System>) {
        assert!(
            !self.systems.iter().any(|s| s.name() == system.name()),
            "duplicate system name: {:?}",
            system.name()
        );
        self.systems.push(system);
        // Stable sort keeps registration order within a priority band.
        self.systems.sort_by_key(|s| s.priority());
    }

    /// Number of registered systems.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Whether no systems are registered.
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// System names in execution order.
    pub fn system_names(&self) -> Vec<String> {
        self.systems.iter().map(|s| s.name().to_owned()).collect()
    }

    /// Execute one tick: drain + dispatch, then update sweep.
    pub fn run_tick(&mut self, world: &mut World, dt: f64) -> SchedulerReport {
        let events = world.take_events();
        let mut report = SchedulerReport {
            events_drained: events.len(),
            ..SchedulerReport::default()
        };

        for event in &events {
            for system in &mut self.systems {
                if system.event_kinds().contains(&event.kind) {
                    system.handle_event(world, event);
                    report.dispatches += 1;
                }
            }
        }

        report.update_times.reserve(self.systems.len());
        for system in &mut self.systems {
            let start = Instant::now();
            system.update(world, dt);
            report
                .update_times
                .push((system.name().to_owned(), start.elapsed()));
        }

        report
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("systems", &self.system_names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
