// Configuration loading and validation (config/zonecast.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use zonecast_core::prediction::PredictorSettings;
use zonecast_core::rating::TraitSettings;
use zonecast_core::squad::best_xi::SelectorSettings;
use zonecast_core::zones::{Blend, ZoneSettings};

/// Shipped defaults, also written out when no `defaults/` directory exists.
pub const DEFAULT_CONFIG: &str = include_str!("../defaults/zonecast.toml");

const CONFIG_FILE: &str = "zonecast.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rating: RatingConfig,
    #[serde(default)]
    pub traits: TraitSettings,
    #[serde(default)]
    pub best_xi: SelectorSettings,
    #[serde(default)]
    pub zones: ZoneSettings,
    #[serde(default)]
    pub prediction: PredictorSettings,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// How player `rating` is produced before zones and best-XI selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingStrategy {
    #[default]
    Performance,
    LineScore,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    pub strategy: RatingStrategy,
    pub line_score_min_minutes: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        RatingConfig {
            strategy: RatingStrategy::Performance,
            line_score_min_minutes: 910.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file. Empty means `zonecast.db` in the platform data directory.
    pub db_path: String,
    /// Profile key used when a command does not name one.
    pub profile: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            db_path: String::new(),
            profile: "default".into(),
        }
    }
}

impl StoreConfig {
    pub fn resolve_db_path(&self) -> Result<PathBuf, ConfigError> {
        if !self.db_path.is_empty() {
            return Ok(PathBuf::from(&self.db_path));
        }
        let dirs = directories::ProjectDirs::from("", "", "zonecast").ok_or_else(|| {
            ConfigError::ValidationError {
                field: "store.db_path".into(),
                message: "no platform data directory available; set an explicit path".into(),
            }
        })?;
        Ok(dirs.data_dir().join("zonecast.db"))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory of per-team JSON snapshots.
    pub teams_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            teams_dir: "data/teams".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub recompute_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            recompute_interval_secs: 86_400,
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.recompute_interval_secs)
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/zonecast.toml` relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let config = parse_config(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

pub fn parse_config(text: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(text)
}

/// Ensure `config/` holds every file from `defaults/`, copying the missing
/// ones. Without a `defaults/` directory the embedded default config is
/// written instead. Returns the files created.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    if !defaults_dir.exists() {
        let target = config_dir.join(CONFIG_FILE);
        return match create_new(&target, DEFAULT_CONFIG.as_bytes())? {
            true => Ok(vec![target]),
            false => Ok(vec![]),
        };
    }

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }

        let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        let target = config_dir.join(file_name);
        if create_new(&target, &content)? {
            copied.push(target);
        }
    }

    Ok(copied)
}

/// Load config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// Write `content` to `target` unless it already exists. Returns whether the
/// file was created.
fn create_new(target: &Path, content: &[u8]) -> Result<bool, ConfigError> {
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
    {
        Ok(mut dest) => {
            std::io::Write::write_all(&mut dest, content).map_err(|e| {
                ConfigError::DefaultsCopyError {
                    message: format!("failed to write {}: {e}", target.display()),
                }
            })?;
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", target.display()),
        }),
    }
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

const BLEND_TOLERANCE: f64 = 1e-6;

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let minutes: &[(&str, f64)] = &[
        ("rating.line_score_min_minutes", config.rating.line_score_min_minutes),
        ("traits.min_minutes", config.traits.min_minutes),
        ("best_xi.min_minutes", config.best_xi.min_minutes),
    ];
    for (name, val) in minutes {
        if !val.is_finite() || *val < 0.0 {
            return Err(invalid(name, format!("must be >= 0, got {val}")));
        }
    }

    for (formation, weight) in &config.best_xi.formation_weights {
        if !weight.is_finite() || *weight <= 0.0 {
            return Err(invalid(
                &format!("best_xi.formation_weights.{formation}"),
                format!("must be > 0, got {weight}"),
            ));
        }
    }

    // Zones
    let blend = &config.zones.blend;
    let rows: [(&str, Blend); 3] = [
        ("zones.blend.def", blend.def),
        ("zones.blend.mid", blend.mid),
        ("zones.blend.att", blend.att),
    ];
    for (name, row) in rows {
        if [row.team, row.against, row.players]
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            return Err(invalid(name, "weights must be finite and >= 0".into()));
        }
        if (row.sum() - 1.0).abs() > BLEND_TOLERANCE {
            return Err(invalid(name, format!("must sum to 1.0, got {}", row.sum())));
        }
    }

    let penalty = config.zones.fallback_penalty;
    if !(penalty > 0.0 && penalty <= 1.0) {
        return Err(invalid(
            "zones.fallback_penalty",
            format!("must be in (0, 1], got {penalty}"),
        ));
    }
    if config.zones.max_fallback_depth == 0 {
        return Err(invalid("zones.max_fallback_depth", "must be > 0".into()));
    }

    // Prediction multipliers must all be positive
    let p = &config.prediction;
    let prediction_fields: &[(&str, f64)] = &[
        ("prediction.xg_multiplier", p.xg_multiplier),
        ("prediction.delta_cap", p.delta_cap),
        ("prediction.exponent", p.exponent),
        ("prediction.scale", p.scale),
    ];
    for (name, val) in prediction_fields {
        if !val.is_finite() || *val <= 0.0 {
            return Err(invalid(name, format!("must be > 0, got {val}")));
        }
    }
    for (name, val) in [
        ("prediction.boost_factor", p.boost_factor),
        ("prediction.even_threshold", p.even_threshold),
    ] {
        if !val.is_finite() || val < 0.0 {
            return Err(invalid(name, format!("must be >= 0, got {val}")));
        }
    }

    if config.store.profile.trim().is_empty() {
        return Err(invalid("store.profile", "must not be empty".into()));
    }
    if config.schedule.recompute_interval_secs == 0 {
        return Err(invalid("schedule.recompute_interval_secs", "must be > 0".into()));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
