//! Typed singleton resources.
//!
//! Resources are world-scoped singletons (config, time, input, audio, rng)
//! resolved once and read by reference. A missing required resource is a
//! programmer error, not a recoverable condition: [`Resources::expect`]
//! panics with the resource's type name.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Type-keyed singleton map. One value per Rust type.
#[derive(Default)]
pub struct Resources {
    map: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl Resources {
    /// Create an empty resource map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the resource of type `R`.
    pub fn insert<R: Any + Send>(&mut self, resource: R) {
        self.map.insert(TypeId::of::<R>(), Box::new(resource));
    }

    /// The resource of type `R`, if present.
    pub fn get<R: Any + Send>(&self) -> Option<&R> {
        self.map
            .get(&TypeId::of::<R>())
            .and_then(|boxed| boxed.downcast_ref::<R>())
    }

    /// Mutable access to the resource of type `R`, if present.
    pub fn get_mut<R: Any + Send>(&mut self) -> Option<&mut R> {
        self.map
            .get_mut(&TypeId::of::<R>())
            .and_then(|boxed| boxed.downcast_mut::<R>())
    }

    /// The resource of type `R`.
    ///
    /// # Panics
    ///
    /// Panics if the resource was never inserted -- a wiring bug that should
    /// abort loudly, not limp along.
    pub fn expect<R: Any + Send>(&self) -> &R {
        self.get::<R>().unwrap_or_else(|| {
            panic!(
                "required resource `{}` is not registered on this world",
                type_name::<R>()
            )
        })
    }

    /// Mutable variant of [`expect`](Self::expect). Same panic contract.
    pub fn expect_mut<R: Any + Send>(&mut self) -> &mut R {
        self.get_mut::<R>().unwrap_or_else(|| {
            panic!(
                "required resource `{}` is not registered on this world",
                type_name::<R>()
            )
        })
    }

    /// Whether a resource of type `R` is present.
    pub fn contains<R: Any + Send>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<R>())
    }
}

impl std::fmt::Debug for Resources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resources")
            .field("count", &self.map.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Concrete resources
// ---------------------------------------------------------------------------

/// Board and screen dimensions, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigResource {
    /// Playable board width.
    pub game_width: i32,
    /// Playable board height.
    pub game_height: i32,
    /// Terminal surface width.
    pub screen_width: i32,
    /// Terminal surface height.
    pub screen_height: i32,
}

impl ConfigResource {
    /// Whether `(x, y)` lies on the playable board.
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.game_width && y < self.game_height
    }
}

/// Simulation clock. Written by the tick loop, read by systems.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeResource {
    /// Total simulation time since world start, in milliseconds.
    pub game_time_ms: u64,
    /// Duration of the current tick, in milliseconds.
    pub delta_ms: u64,
}

/// High-level input mode. Input *decoding* happens outside the engine; only
/// the resolved mode is visible to systems.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    /// Title / attract screen.
    #[default]
    Title,
    /// A round is in progress.
    Playing,
    /// Paused by the player.
    Paused,
    /// Round over, awaiting restart.
    GameOver,
}

/// The current input mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputResource {
    /// The active mode.
    pub game_mode: GameMode,
}

/// Sound-cue sink. Playback itself lives outside the engine; systems only
/// name cues.
pub trait AudioPlayer: Send {
    /// Play the named cue. Implementations must not block.
    fn play(&mut self, cue: &str);
}

/// Optional audio output. [`AudioResource::muted`] for headless runs and
/// tests.
pub struct AudioResource {
    player: Option<Box<dyn AudioPlayer>>,
}

impl AudioResource {
    /// Wrap a player.
    pub fn new(player: Box<dyn AudioPlayer>) -> Self {
        Self {
            player: Some(player),
        }
    }

    /// No-op audio for headless runs.
    pub fn muted() -> Self {
        Self { player: None }
    }

    /// Play `cue` if a player is attached.
    pub fn play(&mut self, cue: &str) {
        if let Some(player) = self.player.as_mut() {
            player.play(cue);
        }
    }

    /// Whether no player is attached.
    pub fn is_muted(&self) -> bool {
        self.player.is_none()
    }
}

impl std::fmt::Debug for AudioResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioResource")
            .field("muted", &self.is_muted())
            .finish()
    }
}

/// Seeded random number generator. All engine randomness flows through this
/// resource so that a run is reproducible from its seed.
#[derive(Debug, Clone)]
pub struct RngResource {
    rng: Pcg32,
    seed: u64,
}

impl RngResource {
    /// Create from a seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            seed,
        }
    }

    /// The seed this resource was built from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The underlying generator.
    pub fn rng(&mut self) -> &mut Pcg32 {
        &mut self.rng
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
