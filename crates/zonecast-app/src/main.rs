// zonecast command-line entry point.
//
// Every command:
// 1. Initializes tracing (log file, stdout stays clean for payloads)
// 2. Loads config/zonecast.toml (copying defaults on first run)
// 3. Opens the profile store
// Commands that score players also load the team snapshots and build the
// analysis service.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

use zonecast_app::analysis::{AnalysisService, AnalysisSettings, TeamKey};
use zonecast_app::config::{self, Config};
use zonecast_app::export;
use zonecast_app::profile::ZoneProfile;
use zonecast_app::scheduler::{self, RecomputeJob};
use zonecast_app::source;
use zonecast_app::store::ConfigStore;
use zonecast_core::benchmarks::compute_benchmarks;
use zonecast_core::rating::traits::summarize_team;

#[derive(Parser)]
#[command(name = "zonecast")]
#[command(about = "Zone ratings, best XI and match predictions from season stats", long_about = None)]
struct Cli {
    /// Profile key (defaults to `store.profile` from the config)
    #[arg(long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Zones, best XI and mental summary for one team
    Analyze {
        #[arg(long)]
        league: String,
        #[arg(long)]
        season: String,
        #[arg(long)]
        team: String,
    },

    /// Predict a match between two teams of the same league/season
    Predict {
        #[arg(long)]
        league: String,
        #[arg(long)]
        season: String,
        #[arg(long)]
        home: String,
        #[arg(long)]
        away: String,
    },

    /// Recompute and store every team's analysis once
    Recompute,

    /// Recompute on the configured interval until Ctrl+C
    Watch,

    /// Write scored players of a league/season to CSV
    Export {
        #[arg(long)]
        league: String,
        #[arg(long)]
        season: String,
        /// Only this team
        #[arg(long)]
        team: Option<String>,
        #[arg(long)]
        out: PathBuf,
    },

    /// Best value of every stat per position group
    Benchmarks {
        #[arg(long)]
        league: String,
        #[arg(long)]
        season: String,
    },

    /// Mental scores of one team's players
    Mental {
        #[arg(long)]
        league: String,
        #[arg(long)]
        season: String,
        #[arg(long)]
        team: String,
    },

    /// Manage stored zone profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print the effective profile (stored, default or built-in)
    Show,
    /// Store a profile from a JSON file; missing fields take built-in tables
    Set {
        #[arg(long)]
        file: PathBuf,
    },
    Delete,
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    let config = config::load_config().context("failed to load configuration")?;
    let store = Arc::new(open_store(&config)?);
    let profile_key = cli
        .profile
        .clone()
        .unwrap_or_else(|| config.store.profile.clone());
    info!(profile = %profile_key, "zonecast starting");

    match cli.command {
        Commands::Profile { action } => run_profile(&store, &profile_key, action),

        Commands::Analyze {
            league,
            season,
            team,
        } => {
            let service = load_service(&config)?;
            let profile = store.load_or_default(&profile_key)?;
            let analysis = service.analyze_team(&TeamKey::new(&league, &season, &team), &profile)?;
            print_json(&analysis)
        }

        Commands::Predict {
            league,
            season,
            home,
            away,
        } => {
            let service = load_service(&config)?;
            let profile = store.load_or_default(&profile_key)?;
            let prediction = service.predict(
                &TeamKey::new(&league, &season, &home),
                &TeamKey::new(&league, &season, &away),
                &profile,
            )?;
            print_json(&prediction)
        }

        Commands::Recompute => {
            let job = recompute_job(&config, store, profile_key)?;
            let saved = scheduler::run_pass(&job).await?;
            println!("stored {saved} team analyses");
            Ok(())
        }

        Commands::Watch => {
            let job = recompute_job(&config, store, profile_key)?;
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let handle = tokio::spawn(scheduler::run(job, shutdown_rx));

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl+C")?;
            info!("shutdown requested");
            let _ = shutdown_tx.send(true);

            let passes = handle.await.context("recompute job panicked")?;
            println!("ran {passes} recompute passes");
            Ok(())
        }

        Commands::Export {
            league,
            season,
            team,
            out,
        } => {
            let service = load_service(&config)?;
            let profile = store.load_or_default(&profile_key)?;
            let pool = service.scored_pool(&league, &season, &profile)?;
            let players: Vec<_> = pool
                .iter()
                .filter(|p| team.as_deref().map_or(true, |t| p.team == t))
                .cloned()
                .collect();
            let rows = export::export_players(&out, &players)?;
            println!("wrote {rows} players to {}", out.display());
            Ok(())
        }

        Commands::Benchmarks { league, season } => {
            let service = load_service(&config)?;
            let profile = store.load_or_default(&profile_key)?;
            let pool = service.scored_pool(&league, &season, &profile)?;
            print_json(&compute_benchmarks(&pool))
        }

        Commands::Mental {
            league,
            season,
            team,
        } => {
            let service = load_service(&config)?;
            let profile = store.load_or_default(&profile_key)?;
            let pool = service.scored_pool(&league, &season, &profile)?;
            let players: Vec<_> = pool.iter().filter(|p| p.team == team).collect();
            let scores: Vec<_> = players
                .iter()
                .map(|p| (p.name.as_str(), p.role_tag(), p.mental.as_ref()))
                .collect();
            let summary = summarize_team(&team, &pool);
            print_json(&serde_json::json!({ "summary": summary, "players": scores }))
        }
    }
}

fn run_profile(store: &ConfigStore, key: &str, action: ProfileAction) -> anyhow::Result<()> {
    match action {
        ProfileAction::Show => print_json(&store.load_or_default(key)?),
        ProfileAction::Set { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let profile: ZoneProfile = serde_json::from_str(&text)
                .with_context(|| format!("invalid profile JSON in {}", file.display()))?;
            store.save_profile(key, &profile)?;
            println!("saved profile {key}");
            Ok(())
        }
        ProfileAction::Delete => {
            if store.delete_profile(key)? {
                println!("deleted profile {key}");
            } else {
                println!("no profile {key}");
            }
            Ok(())
        }
        ProfileAction::List => print_json(&store.list_profiles()?),
    }
}

fn open_store(config: &Config) -> anyhow::Result<ConfigStore> {
    let path = config.store.resolve_db_path()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let path = path.to_str().context("store path is not valid UTF-8")?;
    let store = ConfigStore::open(path).context("failed to open profile store")?;
    info!(path, "profile store opened");
    Ok(store)
}

fn load_service(config: &Config) -> anyhow::Result<AnalysisService> {
    let teams = source::load_dir(Path::new(&config.data.teams_dir))
        .context("failed to load team snapshots")?;
    Ok(AnalysisService::new(teams, AnalysisSettings::from_config(config)))
}

fn recompute_job(config: &Config, store: Arc<ConfigStore>, profile: String) -> anyhow::Result<RecomputeJob> {
    Ok(RecomputeJob {
        service: Arc::new(load_service(config)?),
        store,
        profile,
        interval: config.schedule.interval(),
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{text}");
    Ok(())
}

/// Log to `logs/zonecast.log`; stdout carries the command output.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("zonecast.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("zonecast_core=info,zonecast_app=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
