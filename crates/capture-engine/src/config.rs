//! Simulation configuration.
//!
//! Room, tick and path parameters plus per-species footprint overrides.
//! Configuration can be loaded from and saved to a TOML file.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use capture_gameplay::{PathTuning, SimulationSettings};
use capture_kernel::{Footprint, FootprintTable, TerrainBounds, COLLISION_THRESHOLD};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "capture.toml";

/// Simulation configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Room ===
    /// Room id; terrain bounds are derived from it
    pub room_id: String,
    /// User this process resolves collisions for
    pub authority_id: String,
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Ticks to run before exiting (0 = run forever)
    pub max_ticks: u64,
    /// Bots controlled by the authority
    pub bot_count: u32,
    /// Idle groups spawned at start
    pub initial_npc_groups: u32,
    /// Ticks between bot throws
    pub throw_interval: u64,

    // === Collision ===
    /// Fraction of the width trimmed from each collision box
    pub collision_threshold: f32,

    // === Paths ===
    /// Speed of a thrown group, units/s
    pub throw_speed: f32,
    /// Speed of a returning group, units/s
    pub return_speed: f32,
    /// Seconds a group flees after reaching its target
    pub flee_duration: f32,
    /// Seconds a group bounces after hitting the terrain edge
    pub bounce_duration: f32,

    // === Species ===
    /// Footprint overrides keyed by species
    pub footprints: BTreeMap<String, Footprint>,
}

impl Default for SimConfig {
    fn default() -> Self {
        let tuning = PathTuning::default();
        Self {
            // Room
            room_id: "lobby".to_string(),
            authority_id: "host".to_string(),
            tick_rate: 60,
            max_ticks: 600,
            bot_count: 3,
            initial_npc_groups: 12,
            throw_interval: 90,

            // Collision
            collision_threshold: COLLISION_THRESHOLD,

            // Paths
            throw_speed: tuning.throw_speed,
            return_speed: tuning.return_speed,
            flee_duration: tuning.flee_duration,
            bounce_duration: tuning.bounce_duration,

            // Species
            footprints: BTreeMap::new(),
        }
    }
}

impl SimConfig {
    /// Load configuration from `capture.toml` in the working directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific path.
    /// Returns default config if the file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        if self.authority_id.trim().is_empty() {
            self.authority_id = Self::default().authority_id;
        }
        self.tick_rate = self.tick_rate.clamp(1, 240);
        self.bot_count = self.bot_count.min(64);
        self.initial_npc_groups = self.initial_npc_groups.min(512);
        self.throw_interval = self.throw_interval.max(1);

        self.collision_threshold = self.collision_threshold.clamp(0.0, 0.45);

        self.throw_speed = self.throw_speed.clamp(0.1, 200.0);
        self.return_speed = self.return_speed.clamp(0.1, 200.0);
        self.flee_duration = self.flee_duration.clamp(0.0, 30.0);
        self.bounce_duration = self.bounce_duration.clamp(0.0, 30.0);

        self.footprints
            .retain(|_, fp| fp.width > 0.0 && fp.height > 0.0);
    }

    /// Seconds per tick.
    #[must_use]
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Path motion parameters.
    #[must_use]
    pub fn path_tuning(&self) -> PathTuning {
        PathTuning {
            throw_speed: self.throw_speed,
            return_speed: self.return_speed,
            flee_duration: self.flee_duration,
            bounce_duration: self.bounce_duration,
            ..PathTuning::default()
        }
    }

    /// Settings for the authority's simulation.
    #[must_use]
    pub fn settings(&self) -> SimulationSettings {
        SimulationSettings {
            collision_threshold: self.collision_threshold,
            path_tuning: self.path_tuning(),
            ..SimulationSettings::new(self.authority_id.as_str())
        }
    }

    /// Footprint table with the configured overrides.
    #[must_use]
    pub fn footprint_table(&self) -> FootprintTable {
        FootprintTable::with_overrides(self.footprints.iter().map(|(k, v)| (k, *v)))
    }

    /// Terrain bounds of the configured room.
    #[must_use]
    pub fn bounds(&self) -> TerrainBounds {
        TerrainBounds::from_room_id(&self.room_id)
    }
}
