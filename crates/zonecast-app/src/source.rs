// Team stat snapshots: JSON files normalized into core types.
//
// Scraped files are loose: seasons arrive as strings or numbers, metric
// values as numbers, numeric strings or null. Everything is normalized here
// so the scoring code only ever sees finite f64 values and typed stat blocks.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use zonecast_core::squad::player::PlayerRecord;
use zonecast_core::stats::{StatRow, StatType, TeamStatBlock};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid team JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unknown stat type `{stat_type}` in {path}")]
    UnknownStatType { path: PathBuf, stat_type: String },
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One team's season: its players and both team stat lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSnapshot {
    pub league: String,
    pub season: String,
    pub team: String,
    pub players: Vec<PlayerRecord>,
    pub stats: Vec<TeamStatBlock>,
    pub stats_against: Vec<TeamStatBlock>,
}

// ---------------------------------------------------------------------------
// Raw serde structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawTeam {
    league: String,
    season: Value,
    team: String,
    #[serde(default)]
    players: Vec<RawPlayer>,
    #[serde(default)]
    stats: Vec<RawBlock>,
    #[serde(default)]
    stats_against: Vec<RawBlock>,
}

#[derive(Debug, Deserialize)]
struct RawPlayer {
    name: String,
    #[serde(default)]
    position: String,
    #[serde(default)]
    position_text: String,
    #[serde(default)]
    stats: BTreeMap<String, BTreeMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    stat_type: String,
    #[serde(default)]
    rows: Vec<RawRow>,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    label: String,
    #[serde(default)]
    val: Value,
    #[serde(default)]
    rank: Value,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A finite number from a JSON number or numeric string (`"1,204"`).
fn numeric(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

fn season_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn convert_blocks(raw: Vec<RawBlock>, path: &Path) -> Result<Vec<TeamStatBlock>, SourceError> {
    raw.into_iter()
        .map(|block| {
            let stat_type =
                StatType::from_name(&block.stat_type).ok_or_else(|| SourceError::UnknownStatType {
                    path: path.to_path_buf(),
                    stat_type: block.stat_type.clone(),
                })?;
            let rows = block
                .rows
                .into_iter()
                .map(|row| StatRow {
                    val: numeric(&row.val),
                    rank: numeric(&row.rank)
                        .filter(|r| *r >= 1.0)
                        .map(|r| r as u32),
                    label: row.label,
                })
                .collect();
            Ok(TeamStatBlock::new(stat_type, rows))
        })
        .collect()
}

fn convert_player(raw: RawPlayer, team: &RawTeam, season: &str) -> PlayerRecord {
    let mut player = PlayerRecord::new(&raw.name, &team.team, &team.league, season, &raw.position)
        .with_position_text(&raw.position_text);
    for (group, metrics) in &raw.stats {
        for (metric, value) in metrics {
            match numeric(value) {
                Some(v) => player.set_stat(group, metric, v),
                None => debug!(
                    player = %raw.name,
                    key = %format!("{group}:{metric}"),
                    value = %value,
                    "non-numeric stat dropped"
                ),
            }
        }
    }
    player
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parse one team file's contents. `path` only labels errors.
pub fn parse_team(text: &str, path: &Path) -> Result<TeamSnapshot, SourceError> {
    let mut raw: RawTeam = serde_json::from_str(text).map_err(|e| SourceError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    let season = season_string(&raw.season);
    let stats = convert_blocks(std::mem::take(&mut raw.stats), path)?;
    let stats_against = convert_blocks(std::mem::take(&mut raw.stats_against), path)?;
    let players = std::mem::take(&mut raw.players)
        .into_iter()
        .map(|p| convert_player(p, &raw, &season))
        .collect();

    Ok(TeamSnapshot {
        league: raw.league,
        season,
        team: raw.team,
        players,
        stats,
        stats_against,
    })
}

pub fn load_team_file(path: &Path) -> Result<TeamSnapshot, SourceError> {
    let text = std::fs::read_to_string(path).map_err(|e| SourceError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_team(&text, path)
}

/// Load every `*.json` file in `dir`, in file-name order. Files that fail to
/// load are logged and skipped.
pub fn load_dir(dir: &Path) -> Result<Vec<TeamSnapshot>, SourceError> {
    let entries = std::fs::read_dir(dir).map_err(|e| SourceError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut teams = Vec::with_capacity(paths.len());
    for path in &paths {
        match load_team_file(path) {
            Ok(team) => teams.push(team),
            Err(e) => warn!(error = %e, "team file skipped"),
        }
    }
    info!(dir = %dir.display(), loaded = teams.len(), files = paths.len(), "team snapshots loaded");
    Ok(teams)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
