// SQLite persistence for zone profiles and the latest team analyses.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use zonecast_core::rating::default_rank_weights;

use crate::profile::ZoneProfile;

/// Profile key every lookup falls back to.
pub const DEFAULT_PROFILE: &str = "default";

/// One row of `list_profiles`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored analysis payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub team_key: String,
    pub profile: String,
    pub payload: serde_json::Value,
    pub computed_at: DateTime<Utc>,
}

/// SQLite-backed store of per-key zone profiles and recomputed analyses.
pub struct ConfigStore {
    conn: Mutex<Connection>,
}

impl ConfigStore {
    /// Open (or create) the store at `path`. Pass `":memory:"` for an
    /// ephemeral database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open store at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS profiles (
                key            TEXT PRIMARY KEY,
                zone_config    TEXT NOT NULL,
                zone_scalers   TEXT NOT NULL,
                rank_weights   TEXT,
                score_config   TEXT NOT NULL,
                compound_roles TEXT NOT NULL,
                created_at     TEXT NOT NULL,
                updated_at     TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS team_analyses (
                team_key    TEXT PRIMARY KEY,
                profile     TEXT NOT NULL,
                payload     TEXT NOT NULL,
                computed_at TEXT NOT NULL
            );
            ",
        )
        .context("failed to create store schema")?;

        // Migration: rank_weights arrived after the first schema. A NULL
        // value loads as the built-in table.
        conn.execute_batch("ALTER TABLE profiles ADD COLUMN rank_weights TEXT;")
            .ok(); // fails with "duplicate column name" once present

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection. Panics if the mutex is poisoned, which only
    /// happens after another thread panicked mid-query.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("store mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------

    /// Insert or replace the profile under `key`. The last write wins;
    /// `created_at` of an existing row is kept.
    pub fn save_profile(&self, key: &str, profile: &ZoneProfile) -> Result<()> {
        let zone_config =
            serde_json::to_string(&profile.zone_config).context("failed to serialize zone_config")?;
        let zone_scalers = serde_json::to_string(&profile.zone_scalers)
            .context("failed to serialize zone_scalers")?;
        let rank_weights = serde_json::to_string(&profile.rank_weights)
            .context("failed to serialize rank_weights")?;
        let score_config = serde_json::to_string(&profile.score_config)
            .context("failed to serialize score_config")?;
        let compound_roles = serde_json::to_string(&profile.compound_roles)
            .context("failed to serialize compound_roles")?;
        let now = Utc::now().to_rfc3339();

        self.conn()
            .execute(
                "INSERT INTO profiles
                    (key, zone_config, zone_scalers, rank_weights, score_config, compound_roles,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                 ON CONFLICT(key) DO UPDATE SET
                    zone_config    = excluded.zone_config,
                    zone_scalers   = excluded.zone_scalers,
                    rank_weights   = excluded.rank_weights,
                    score_config   = excluded.score_config,
                    compound_roles = excluded.compound_roles,
                    updated_at     = excluded.updated_at",
                params![key, zone_config, zone_scalers, rank_weights, score_config, compound_roles, now],
            )
            .context("failed to save profile")?;
        info!(key, "profile saved");
        Ok(())
    }

    /// Load the profile stored under `key`, or `None`.
    pub fn load_profile(&self, key: &str) -> Result<Option<ZoneProfile>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT zone_config, zone_scalers, rank_weights, score_config, compound_roles
                 FROM profiles WHERE key = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()
            .context("failed to query profile")?;

        let Some((zone_config, zone_scalers, rank_weights, score_config, compound_roles)) = row else {
            return Ok(None);
        };
        let rank_weights = match rank_weights {
            Some(json) => {
                serde_json::from_str(&json).context("failed to deserialize rank_weights")?
            }
            None => default_rank_weights(),
        };
        let profile = ZoneProfile {
            zone_config: serde_json::from_str(&zone_config)
                .context("failed to deserialize zone_config")?,
            zone_scalers: serde_json::from_str(&zone_scalers)
                .context("failed to deserialize zone_scalers")?,
            rank_weights,
            score_config: serde_json::from_str(&score_config)
                .context("failed to deserialize score_config")?,
            compound_roles: serde_json::from_str(&compound_roles)
                .context("failed to deserialize compound_roles")?,
        };
        Ok(Some(profile))
    }

    /// Profile for `key`, else the `"default"` profile, else the built-in
    /// tables.
    pub fn load_or_default(&self, key: &str) -> Result<ZoneProfile> {
        if let Some(profile) = self.load_profile(key)? {
            return Ok(profile);
        }
        if key != DEFAULT_PROFILE {
            if let Some(profile) = self.load_profile(DEFAULT_PROFILE)? {
                debug!(key, "profile not found, using stored default");
                return Ok(profile);
            }
        }
        debug!(key, "profile not found, using built-in tables");
        Ok(ZoneProfile::default())
    }

    /// Delete the profile under `key`. Returns whether a row was removed.
    pub fn delete_profile(&self, key: &str) -> Result<bool> {
        let removed = self
            .conn()
            .execute("DELETE FROM profiles WHERE key = ?1", params![key])
            .context("failed to delete profile")?;
        Ok(removed > 0)
    }

    pub fn list_profiles(&self) -> Result<Vec<ProfileSummary>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT key, created_at, updated_at FROM profiles ORDER BY key")
            .context("failed to prepare list_profiles query")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .context("failed to query profiles")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map profile rows")?;

        rows.into_iter()
            .map(|(key, created_at, updated_at)| {
                Ok(ProfileSummary {
                    key,
                    created_at: parse_timestamp(&created_at)?,
                    updated_at: parse_timestamp(&updated_at)?,
                })
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Analyses
    // ------------------------------------------------------------------

    /// Replace the stored analysis for `team_key`.
    pub fn save_analysis<T: Serialize>(&self, team_key: &str, profile: &str, payload: &T) -> Result<()> {
        let json = serde_json::to_string(payload).context("failed to serialize analysis")?;
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO team_analyses (team_key, profile, payload, computed_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![team_key, profile, json, now],
            )
            .context("failed to save analysis")?;
        Ok(())
    }

    pub fn load_analysis(&self, team_key: &str) -> Result<Option<StoredAnalysis>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT profile, payload, computed_at FROM team_analyses WHERE team_key = ?1",
                params![team_key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()
            .context("failed to query analysis")?;

        let Some((profile, payload, computed_at)) = row else {
            return Ok(None);
        };
        Ok(Some(StoredAnalysis {
            team_key: team_key.to_string(),
            profile,
            payload: serde_json::from_str(&payload).context("failed to deserialize analysis")?,
            computed_at: parse_timestamp(&computed_at)?,
        }))
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("invalid timestamp {s}"))?
        .with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use zonecast_core::squad::roles::{BaseRole, Role};
    use zonecast_core::zones::ZoneId;

    fn test_store() -> ConfigStore {
        ConfigStore::open(":memory:").expect("in-memory store should open")
    }

    fn custom_profile(scaler: f64) -> ZoneProfile {
        let mut profile = ZoneProfile::default();
        profile.set_scaler(ZoneId::DefCentral, "Tkl+Int", scaler);
        profile.compound_roles.insert("SW".into(), Role::CB);
        profile
    }

    #[test]
    fn open_creates_tables() {
        let store = test_store();
        let conn = store.conn();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('profiles', 'team_analyses')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn save_and_load_profile() {
        let store = test_store();
        let profile = custom_profile(0.5);
        store.save_profile("alice", &profile).unwrap();
        assert_eq!(store.load_profile("alice").unwrap(), Some(profile));
        assert_eq!(store.load_profile("bob").unwrap(), None);
    }

    #[test]
    fn last_write_wins_and_created_at_is_kept() {
        let store = test_store();
        store.save_profile("alice", &custom_profile(0.5)).unwrap();
        let first = store.list_profiles().unwrap()[0].clone();

        store.save_profile("alice", &custom_profile(2.0)).unwrap();
        let loaded = store.load_profile("alice").unwrap().unwrap();
        assert_eq!(loaded.zone_scalers[&ZoneId::DefCentral]["Tkl+Int"], 2.0);

        let listed = store.list_profiles().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].created_at, first.created_at);
        assert!(listed[0].updated_at >= first.updated_at);
    }

    #[test]
    fn load_or_default_falls_back_in_order() {
        let store = test_store();
        assert_eq!(store.load_or_default("alice").unwrap(), ZoneProfile::default());

        let shared = custom_profile(0.7);
        store.save_profile(DEFAULT_PROFILE, &shared).unwrap();
        assert_eq!(store.load_or_default("alice").unwrap(), shared);

        let own = custom_profile(1.3);
        store.save_profile("alice", &own).unwrap();
        assert_eq!(store.load_or_default("alice").unwrap(), own);
    }

    #[test]
    fn rank_weights_round_trip() {
        let store = test_store();
        let mut profile = ZoneProfile::default();
        profile
            .rank_weights
            .insert(BaseRole::CF, BTreeMap::from([("shooting:Expected_xG".to_string(), 3.0)]));
        store.save_profile("alice", &profile).unwrap();

        let loaded = store.load_profile("alice").unwrap().unwrap();
        assert_eq!(loaded.rank_weights[&BaseRole::CF].len(), 1);
        assert_eq!(loaded.rank_weights[&BaseRole::CF]["shooting:Expected_xG"], 3.0);
        assert_eq!(loaded, profile);
    }

    #[test]
    fn row_without_rank_weights_loads_builtin_table() {
        let store = test_store();
        store.save_profile("legacy", &custom_profile(0.5)).unwrap();
        store
            .conn()
            .execute("UPDATE profiles SET rank_weights = NULL WHERE key = 'legacy'", [])
            .unwrap();
        let loaded = store.load_profile("legacy").unwrap().unwrap();
        assert_eq!(loaded.rank_weights, default_rank_weights());
    }

    #[test]
    fn reopening_runs_the_migration_again_harmlessly() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("zonecast.db");
        let path = path.to_str().unwrap();
        ConfigStore::open(path).unwrap();
        let store = ConfigStore::open(path).unwrap();
        store.save_profile("alice", &ZoneProfile::default()).unwrap();
        assert!(store.load_profile("alice").unwrap().is_some());
    }

    #[test]
    fn delete_and_list_profiles() {
        let store = test_store();
        store.save_profile("b", &ZoneProfile::default()).unwrap();
        store.save_profile("a", &ZoneProfile::default()).unwrap();
        let keys: Vec<String> = store.list_profiles().unwrap().into_iter().map(|p| p.key).collect();
        assert_eq!(keys, vec!["a", "b"]);

        assert!(store.delete_profile("a").unwrap());
        assert!(!store.delete_profile("a").unwrap());
        assert_eq!(store.list_profiles().unwrap().len(), 1);
    }

    #[test]
    fn analysis_is_replaced_per_team() {
        let store = test_store();
        assert!(store.load_analysis("L|2024|Rovers").unwrap().is_none());

        store
            .save_analysis("L|2024|Rovers", "default", &serde_json::json!({"zones": 1}))
            .unwrap();
        store
            .save_analysis("L|2024|Rovers", "alice", &serde_json::json!({"zones": 2}))
            .unwrap();

        let stored = store.load_analysis("L|2024|Rovers").unwrap().unwrap();
        assert_eq!(stored.profile, "alice");
        assert_eq!(stored.payload["zones"], 2);
    }

    #[test]
    fn store_persists_across_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("zonecast.db");
        let path = path.to_str().unwrap();
        {
            let store = ConfigStore::open(path).unwrap();
            store.save_profile("alice", &custom_profile(0.9)).unwrap();
        }
        let store = ConfigStore::open(path).unwrap();
        assert_eq!(store.load_profile("alice").unwrap(), Some(custom_profile(0.9)));
    }
}
