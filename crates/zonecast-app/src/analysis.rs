// Analysis service: scores league pools once and serves team analyses and
// match predictions from the cache.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use zonecast_core::prediction::{MatchPrediction, MatchPredictor, PredictorSettings, TeamZones};
use zonecast_core::rating::line_score::{ImpactWeights, LineScoreRater};
use zonecast_core::rating::traits::{summarize_team, TeamMentalSummary};
use zonecast_core::rating::{normalize_performance, TraitScorer, TraitSettings};
use zonecast_core::squad::best_xi::{BestXi, BestXiSelector, SelectorSettings};
use zonecast_core::squad::player::PlayerRecord;
use zonecast_core::zones::{ZoneMap, ZoneSettings};

use crate::config::{Config, RatingConfig, RatingStrategy};
use crate::profile::ZoneProfile;
use crate::source::TeamSnapshot;

// ---------------------------------------------------------------------------
// Keys and payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamKey {
    pub league: String,
    pub season: String,
    pub team: String,
}

impl TeamKey {
    pub fn new(league: &str, season: &str, team: &str) -> Self {
        TeamKey {
            league: league.to_string(),
            season: season.to_string(),
            team: team.to_string(),
        }
    }

    pub fn of(snapshot: &TeamSnapshot) -> Self {
        TeamKey::new(&snapshot.league, &snapshot.season, &snapshot.team)
    }
}

/// `league|season|team`, the key analyses are stored under.
impl fmt::Display for TeamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.league, self.season, self.team)
    }
}

/// Everything computed for one team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAnalysis {
    pub key: TeamKey,
    /// The team's players after role resolution, rating and trait scoring.
    pub players: Vec<PlayerRecord>,
    pub zones: ZoneMap,
    pub best_xi: Option<BestXi>,
    /// Why no XI could be picked, when `best_xi` is `None`.
    pub best_xi_error: Option<String>,
    pub mental: Option<TeamMentalSummary>,
}

/// The scoring parameters taken from the app config.
#[derive(Debug, Clone, Default)]
pub struct AnalysisSettings {
    pub rating: RatingConfig,
    pub traits: TraitSettings,
    pub best_xi: SelectorSettings,
    pub zones: ZoneSettings,
    pub prediction: PredictorSettings,
}

impl AnalysisSettings {
    pub fn from_config(config: &Config) -> Self {
        AnalysisSettings {
            rating: config.rating.clone(),
            traits: config.traits.clone(),
            best_xi: config.best_xi.clone(),
            zones: config.zones.clone(),
            prediction: config.prediction,
        }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// (league, season, scoring fingerprint of the profile)
type PoolKey = (String, String, u64);

/// Holds the loaded snapshots and a cache of scored league pools.
///
/// Construct once per process and share by reference (or `Arc`).
pub struct AnalysisService {
    teams: Vec<TeamSnapshot>,
    settings: AnalysisSettings,
    pools: Mutex<HashMap<PoolKey, Arc<Vec<PlayerRecord>>>>,
}

impl AnalysisService {
    pub fn new(teams: Vec<TeamSnapshot>, settings: AnalysisSettings) -> Self {
        AnalysisService {
            teams,
            settings,
            pools: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Keys of every loaded team, sorted.
    pub fn team_keys(&self) -> Vec<TeamKey> {
        let mut keys: Vec<TeamKey> = self.teams.iter().map(TeamKey::of).collect();
        keys.sort();
        keys.dedup();
        keys
    }

    fn snapshot(&self, key: &TeamKey) -> Result<&TeamSnapshot> {
        self.teams
            .iter()
            .find(|t| t.league == key.league && t.season == key.season && t.team == key.team)
            .ok_or_else(|| anyhow!("no snapshot for team {key}"))
    }

    /// Drop every cached pool so the next request rescores from snapshots.
    pub fn invalidate(&self) {
        let mut pools = self.lock_pools();
        let dropped = pools.len();
        pools.clear();
        info!(dropped, "scored pools invalidated");
    }

    fn lock_pools(&self) -> std::sync::MutexGuard<'_, HashMap<PoolKey, Arc<Vec<PlayerRecord>>>> {
        // a poisoned cache only holds fully scored pools, so keep using it
        self.pools.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every player of a league/season, scored under `profile`. Cached.
    pub fn scored_pool(&self, league: &str, season: &str, profile: &ZoneProfile) -> Result<Arc<Vec<PlayerRecord>>> {
        let key = (league.to_string(), season.to_string(), scoring_fingerprint(profile));
        if let Some(pool) = self.lock_pools().get(&key) {
            return Ok(Arc::clone(pool));
        }

        let mut players: Vec<PlayerRecord> = self
            .teams
            .iter()
            .filter(|t| t.league == league && t.season == season)
            .flat_map(|t| t.players.iter().cloned())
            .collect();
        if players.is_empty() {
            return Err(anyhow!("no players loaded for {league} {season}"));
        }
        self.score_players(&mut players, profile);

        let pool = Arc::new(players);
        self.lock_pools().insert(key, Arc::clone(&pool));
        Ok(pool)
    }

    fn score_players(&self, players: &mut [PlayerRecord], profile: &ZoneProfile) {
        for player in players.iter_mut() {
            player.clear_scores();
        }
        let unresolved = profile.resolver().resolve_players(players);
        let report = profile.ranking_engine().rank(players);
        match self.settings.rating.strategy {
            RatingStrategy::Performance => normalize_performance(players),
            RatingStrategy::LineScore => {
                LineScoreRater::new(
                    profile.score_config.clone(),
                    ImpactWeights::default(),
                    self.settings.rating.line_score_min_minutes,
                )
                .rate(players);
            }
        }
        let traits = TraitScorer::with_settings(self.settings.traits.clone()).score(players);
        info!(
            players = players.len(),
            unresolved,
            ranked = report.ranked,
            trait_scored = traits.scored,
            strategy = ?self.settings.rating.strategy,
            "pool scored"
        );
    }

    /// Zones, best XI and mental summary for one team.
    pub fn analyze_team(&self, key: &TeamKey, profile: &ZoneProfile) -> Result<TeamAnalysis> {
        let snapshot = self.snapshot(key)?;
        let pool = self.scored_pool(&key.league, &key.season, profile)?;
        let players: Vec<PlayerRecord> = pool
            .iter()
            .filter(|p| p.team == key.team)
            .cloned()
            .collect();

        let zones = profile
            .aggregator(&self.settings.zones)
            .compute(&players, &snapshot.stats, &snapshot.stats_against);

        let (best_xi, best_xi_error) =
            match BestXiSelector::new(self.settings.best_xi.clone()).select(&players) {
                Ok(xi) => (Some(xi), None),
                Err(e) => {
                    warn!(team = %key, error = %e, "no best XI");
                    (None, Some(e.to_string()))
                }
            };
        let mental = summarize_team(&key.team, &players);

        Ok(TeamAnalysis {
            key: key.clone(),
            players,
            zones,
            best_xi,
            best_xi_error,
            mental,
        })
    }

    pub fn predict(&self, home: &TeamKey, away: &TeamKey, profile: &ZoneProfile) -> Result<MatchPrediction> {
        let home_analysis = self.analyze_team(home, profile)?;
        let away_analysis = self.analyze_team(away, profile)?;
        let prediction = MatchPredictor::new(self.settings.prediction).predict(
            TeamZones {
                name: &home.team,
                zones: &home_analysis.zones,
            },
            TeamZones {
                name: &away.team,
                zones: &away_analysis.zones,
            },
        );
        info!(home = %home, away = %away, score = %prediction.score_prediction, "match predicted");
        Ok(prediction)
    }

    /// Rescore every pool and analyze every team. A team that fails is
    /// logged and skipped.
    pub fn recompute_all(&self, profile: &ZoneProfile) -> Vec<TeamAnalysis> {
        self.invalidate();
        let keys = self.team_keys();
        let mut analyses = Vec::with_capacity(keys.len());
        for key in &keys {
            match self.analyze_team(key, profile) {
                Ok(analysis) => analyses.push(analysis),
                Err(e) => warn!(team = %key, error = %e, "team analysis failed"),
            }
        }
        info!(teams = keys.len(), analysed = analyses.len(), "recompute complete");
        analyses
    }
}

/// Hash of the profile fields that change player scores.
fn scoring_fingerprint(profile: &ZoneProfile) -> u64 {
    let mut hasher = DefaultHasher::new();
    profile.compound_roles.hash(&mut hasher);
    profile.score_config.hash(&mut hasher);
    for (role, weights) in &profile.rank_weights {
        role.hash(&mut hasher);
        for (key, weight) in weights {
            key.hash(&mut hasher);
            weight.to_bits().hash(&mut hasher);
        }
    }
    hasher.finish()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
