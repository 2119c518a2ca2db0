//! Configuration loading and typed config structures for the Gridkeeper simulation.
//!
//! The canonical configuration lives in `gridkeeper-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure, and provides a loader that reads and validates the file.
//! Every field has a default, so a partial (or empty) file is valid.

use std::path::Path;
use std::time::Duration;

use gridkeeper_types::EventKind;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is out of range or inconsistent with another value.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Upper bound for the tick and event-check intervals (one day).
pub const MAX_INTERVAL_MS: u64 = 86_400_000;

/// Top-level configuration.
///
/// Mirrors the structure of `gridkeeper-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GameConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Energy range, decay, gain, and tick cadence.
    #[serde(default)]
    pub grid: GridConfig,

    /// Safe band, danger bands, and their timers.
    #[serde(default)]
    pub zones: ZoneConfig,

    /// Stabilize action tuning.
    #[serde(default)]
    pub stabilize: StabilizeConfig,

    /// Steal action tuning.
    #[serde(default)]
    pub steal: StealConfig,

    /// Emergency adjust action tuning.
    #[serde(default)]
    pub emergency: EmergencyConfig,

    /// Random event scheduler tuning.
    #[serde(default)]
    pub events: EventConfig,
}

impl GameConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for the listener:
    /// - `GRIDKEEPER_HOST` overrides `server.host`
    /// - `PORT` overrides `server.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.server.apply_env_overrides();
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let grid = &self.grid;
        let zones = &self.zones;

        for (name, value) in self.levels() {
            if !value.is_finite() {
                return Err(ConfigError::Invalid {
                    reason: format!("{name} must be a finite number"),
                });
            }
        }
        for (name, value) in self.rates() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    reason: format!("{name} must be a finite, non-negative number"),
                });
            }
        }

        if grid.min_energy >= grid.max_energy {
            return Err(invalid("grid.min_energy must be below grid.max_energy"));
        }
        if !(grid.min_energy..=grid.max_energy).contains(&grid.initial_energy) {
            return Err(invalid("grid.initial_energy must lie within the energy range"));
        }
        if grid.tick_interval_ms == 0 || grid.tick_interval_ms > MAX_INTERVAL_MS {
            return Err(invalid("grid.tick_interval_ms must be within 1..=86400000"));
        }
        if zones.safe_min > zones.safe_max {
            return Err(invalid("zones.safe_min must not exceed zones.safe_max"));
        }
        if zones.safe_min < grid.min_energy || zones.safe_max > grid.max_energy {
            return Err(invalid("the safe band must lie within the energy range"));
        }
        if zones.danger_low_threshold >= zones.danger_high_threshold {
            return Err(invalid(
                "zones.danger_low_threshold must be below zones.danger_high_threshold",
            ));
        }
        if self.events.check_interval_ms == 0 || self.events.check_interval_ms > MAX_INTERVAL_MS {
            return Err(invalid("events.check_interval_ms must be within 1..=86400000"));
        }
        if !(0.0..=100.0).contains(&self.events.chance_percent) {
            return Err(invalid("events.chance_percent must be within 0..=100"));
        }
        if self.events.kinds.is_empty() {
            return Err(invalid("events.kinds must name at least one event"));
        }
        Ok(())
    }

    /// Energy levels and band edges, in field order.
    const fn levels(&self) -> [(&'static str, f64); 7] {
        [
            ("grid.min_energy", self.grid.min_energy),
            ("grid.max_energy", self.grid.max_energy),
            ("grid.initial_energy", self.grid.initial_energy),
            ("zones.safe_min", self.zones.safe_min),
            ("zones.safe_max", self.zones.safe_max),
            ("zones.danger_low_threshold", self.zones.danger_low_threshold),
            ("zones.danger_high_threshold", self.zones.danger_high_threshold),
        ]
    }

    /// Rates, multipliers and amounts applied to the grid.
    const fn rates(&self) -> [(&'static str, f64); 11] {
        [
            ("grid.base_decay_rate", self.grid.base_decay_rate),
            ("grid.base_gain_per_click", self.grid.base_gain_per_click),
            ("stabilize.decay_multiplier", self.stabilize.decay_multiplier),
            ("stabilize.gain_multiplier", self.stabilize.gain_multiplier),
            ("steal.grid_cost", self.steal.grid_cost),
            ("emergency.boost_amount", self.emergency.boost_amount),
            ("emergency.coolant_amount", self.emergency.coolant_amount),
            ("emergency.wrong_zone_penalty", self.emergency.wrong_zone_penalty),
            ("events.chance_percent", self.events.chance_percent),
            ("events.surge_decay_multiplier", self.events.surge_decay_multiplier),
            (
                "events.efficiency_gain_multiplier",
                self.events.efficiency_gain_multiplier,
            ),
        ]
    }

    /// Midpoint of the energy range, used to pick the misuse direction.
    pub fn energy_midpoint(&self) -> f64 {
        (self.grid.min_energy + self.grid.max_energy) / 2.0
    }

    /// Tick cadence as a [`Duration`].
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.grid.tick_interval_ms)
    }

    /// Event check cadence as a [`Duration`].
    pub const fn event_check_interval(&self) -> Duration {
        Duration::from_millis(self.events.check_interval_ms)
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSection {
    /// Override listener settings with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("GRIDKEEPER_HOST") {
            self.host = val;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|v| v.parse().ok()) {
            self.port = port;
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Fallback filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Grid energy configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GridConfig {
    /// Lower clamp for the grid value.
    #[serde(default = "default_min_energy")]
    pub min_energy: f64,

    /// Upper clamp for the grid value.
    #[serde(default = "default_max_energy")]
    pub max_energy: f64,

    /// Grid value at start and after every reset.
    #[serde(default = "default_initial_energy")]
    pub initial_energy: f64,

    /// Energy lost per second before multipliers.
    #[serde(default = "default_base_decay_rate")]
    pub base_decay_rate: f64,

    /// Energy gained per generate action before multipliers.
    #[serde(default = "default_base_gain")]
    pub base_gain_per_click: f64,

    /// Milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            min_energy: default_min_energy(),
            max_energy: default_max_energy(),
            initial_energy: default_initial_energy(),
            base_decay_rate: default_base_decay_rate(),
            base_gain_per_click: default_base_gain(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Zone and win/loss timing configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ZoneConfig {
    /// Lower bound of the safe band (inclusive).
    #[serde(default = "default_safe_min")]
    pub safe_min: f64,

    /// Upper bound of the safe band (inclusive).
    #[serde(default = "default_safe_max")]
    pub safe_max: f64,

    /// Cumulative safe-band seconds for a cooperative win.
    #[serde(default = "default_coop_win_seconds")]
    pub coop_win_duration_seconds: u64,

    /// Levels strictly below this are in the low danger band.
    #[serde(default = "default_danger_low")]
    pub danger_low_threshold: f64,

    /// Levels strictly above this are in the high danger band.
    #[serde(default = "default_danger_high")]
    pub danger_high_threshold: f64,

    /// Continuous seconds allowed in either danger band.
    #[serde(default = "default_danger_time_limit")]
    pub danger_time_limit_seconds: u64,
}

impl ZoneConfig {
    /// Cooperative win target in milliseconds.
    pub const fn coop_target_ms(&self) -> u64 {
        self.coop_win_duration_seconds.saturating_mul(1000)
    }

    /// Danger time limit in milliseconds.
    pub const fn danger_limit_ms(&self) -> u64 {
        self.danger_time_limit_seconds.saturating_mul(1000)
    }
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            safe_min: default_safe_min(),
            safe_max: default_safe_max(),
            coop_win_duration_seconds: default_coop_win_seconds(),
            danger_low_threshold: default_danger_low(),
            danger_high_threshold: default_danger_high(),
            danger_time_limit_seconds: default_danger_time_limit(),
        }
    }
}

/// Stabilize action configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StabilizeConfig {
    /// How long the global effect lasts.
    #[serde(default = "default_stabilize_duration_ms")]
    pub duration_ms: u64,

    /// Per-session reuse interval.
    #[serde(default = "default_stabilize_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Decay multiplier while the effect is active.
    #[serde(default = "default_stabilize_decay_multiplier")]
    pub decay_multiplier: f64,

    /// Generate gain multiplier while the effect is active.
    #[serde(default = "default_stabilize_gain_multiplier")]
    pub gain_multiplier: f64,
}

impl Default for StabilizeConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_stabilize_duration_ms(),
            cooldown_ms: default_stabilize_cooldown_ms(),
            decay_multiplier: default_stabilize_decay_multiplier(),
            gain_multiplier: default_stabilize_gain_multiplier(),
        }
    }
}

/// Steal action configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StealConfig {
    /// Energy removed from the grid per steal.
    #[serde(default = "default_steal_cost")]
    pub grid_cost: f64,

    /// Stash gained per steal.
    #[serde(default = "default_steal_stash_gain")]
    pub stash_gain: u32,

    /// Per-session reuse interval.
    #[serde(default = "default_steal_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Stash needed for an individual win.
    #[serde(default = "default_stash_win_target")]
    pub stash_win_target: u32,
}

impl Default for StealConfig {
    fn default() -> Self {
        Self {
            grid_cost: default_steal_cost(),
            stash_gain: default_steal_stash_gain(),
            cooldown_ms: default_steal_cooldown_ms(),
            stash_win_target: default_stash_win_target(),
        }
    }
}

/// Emergency adjust action configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmergencyConfig {
    /// Per-session reuse interval.
    #[serde(default = "default_emergency_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Energy added when used in the low danger band.
    #[serde(default = "default_boost_amount")]
    pub boost_amount: f64,

    /// Energy removed when used in the high danger band.
    #[serde(default = "default_coolant_amount")]
    pub coolant_amount: f64,

    /// Energy shifted toward the nearer boundary when misused.
    #[serde(default = "default_wrong_zone_penalty")]
    pub wrong_zone_penalty: f64,
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_emergency_cooldown_ms(),
            boost_amount: default_boost_amount(),
            coolant_amount: default_coolant_amount(),
            wrong_zone_penalty: default_wrong_zone_penalty(),
        }
    }
}

/// Random event configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventConfig {
    /// Milliseconds between activation trials.
    #[serde(default = "default_event_check_interval_ms")]
    pub check_interval_ms: u64,

    /// Probability (0-100) that a trial activates an event.
    #[serde(default = "default_event_chance_percent")]
    pub chance_percent: f64,

    /// How long an activated event lasts.
    #[serde(default = "default_event_duration_ms")]
    pub duration_ms: u64,

    /// Decay multiplier during a surge.
    #[serde(default = "default_surge_decay_multiplier")]
    pub surge_decay_multiplier: f64,

    /// Generate gain multiplier during an efficiency drive.
    #[serde(default = "default_efficiency_gain_multiplier")]
    pub efficiency_gain_multiplier: f64,

    /// Catalog the scheduler draws from.
    #[serde(default = "default_event_kinds")]
    pub kinds: Vec<EventKind>,

    /// Seed for the trial RNG. Unset means seeded from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: default_event_check_interval_ms(),
            chance_percent: default_event_chance_percent(),
            duration_ms: default_event_duration_ms(),
            surge_decay_multiplier: default_surge_decay_multiplier(),
            efficiency_gain_multiplier: default_efficiency_gain_multiplier(),
            kinds: default_event_kinds(),
            seed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_min_energy() -> f64 {
    0.0
}

const fn default_max_energy() -> f64 {
    100.0
}

const fn default_initial_energy() -> f64 {
    50.0
}

const fn default_base_decay_rate() -> f64 {
    0.5
}

const fn default_base_gain() -> f64 {
    1.0
}

const fn default_tick_interval_ms() -> u64 {
    500
}

const fn default_safe_min() -> f64 {
    40.0
}

const fn default_safe_max() -> f64 {
    70.0
}

const fn default_coop_win_seconds() -> u64 {
    60
}

const fn default_danger_low() -> f64 {
    20.0
}

const fn default_danger_high() -> f64 {
    85.0
}

const fn default_danger_time_limit() -> u64 {
    10
}

const fn default_stabilize_duration_ms() -> u64 {
    5_000
}

const fn default_stabilize_cooldown_ms() -> u64 {
    15_000
}

const fn default_stabilize_decay_multiplier() -> f64 {
    0.2
}

const fn default_stabilize_gain_multiplier() -> f64 {
    0.5
}

const fn default_steal_cost() -> f64 {
    5.0
}

const fn default_steal_stash_gain() -> u32 {
    2
}

const fn default_steal_cooldown_ms() -> u64 {
    10_000
}

const fn default_stash_win_target() -> u32 {
    25
}

const fn default_emergency_cooldown_ms() -> u64 {
    20_000
}

const fn default_boost_amount() -> f64 {
    15.0
}

const fn default_coolant_amount() -> f64 {
    20.0
}

const fn default_wrong_zone_penalty() -> f64 {
    5.0
}

const fn default_event_check_interval_ms() -> u64 {
    15_000
}

const fn default_event_chance_percent() -> f64 {
    50.0
}

const fn default_event_duration_ms() -> u64 {
    10_000
}

const fn default_surge_decay_multiplier() -> f64 {
    2.5
}

const fn default_efficiency_gain_multiplier() -> f64 {
    2.0
}

fn default_event_kinds() -> Vec<EventKind> {
    vec![EventKind::Surge, EventKind::Efficiency]
}
