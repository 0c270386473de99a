//! oilwatch server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store named by `store_path`, and serves the JSON API under `/api`. Without
//! a `store_path` everything is kept in memory and lost on exit.
//!
//! ```text
//! oilwatch serve
//! oilwatch migrate
//! oilwatch seed --file facilities.json [--force]
//! oilwatch ring --border border.json --distance 300
//! ```

mod settings;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use axum::{Json, Router, routing::get};
use clap::{Parser, Subcommand};
use oilwatch_api::{AppState, api_router};
use oilwatch_core::{
  document::SeedData,
  geometry::{LatLon, range_ring, validate_ring_input},
  memory::MemoryStore,
  store::FacilityStore,
};
use oilwatch_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

use crate::settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Oilwatch facility tracker")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Apply pending database migrations and exit.
  Migrate,
  /// Import facility and hit documents from a JSON file.
  Seed {
    /// `{"facilities": [...], "hits": [...]}`
    #[arg(long)]
    file:  PathBuf,
    /// Import even if the store already holds facilities.
    #[arg(long)]
    force: bool,
  },
  /// Print one range ring as JSON.
  Ring {
    /// JSON array of `[lat, lon]` border points.
    #[arg(long)]
    border:   PathBuf,
    /// Distance in kilometres.
    #[arg(long)]
    distance: f64,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = settings::load(&cli.config)?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => match &cfg.store_path {
      Some(path) => serve(open_sqlite(path).await?, &cfg).await,
      None => {
        warn!("no store_path configured, running on an in-memory store");
        serve(MemoryStore::new(), &cfg).await
      }
    },
    Command::Migrate => {
      let path = cfg.store_path.as_deref().context("migrate needs a store_path")?;
      let store = open_sqlite(path).await?;
      let version = store.schema_version().await?;
      info!(version, path = %path.display(), "database is up to date");
      Ok(())
    }
    Command::Seed { file, force } => {
      let path = cfg.store_path.as_deref().context("seed needs a store_path")?;
      let store = open_sqlite(path).await?;
      seed(&store, &file, force).await
    }
    Command::Ring { border, distance } => {
      let raw = std::fs::read_to_string(&border)
        .with_context(|| format!("failed to read {}", border.display()))?;
      let points: Vec<LatLon> =
        serde_json::from_str(&raw).context("border must be a JSON array of [lat, lon]")?;
      validate_ring_input(&points, &[distance])?;
      let ring = range_ring(&points, distance, &cfg.range_ring.to_config());
      println!("{}", serde_json::to_string(&ring)?);
      Ok(())
    }
  }
}

async fn open_sqlite(path: &Path) -> anyhow::Result<SqliteStore> {
  SqliteStore::open(path)
    .await
    .with_context(|| format!("failed to open store at {path:?}"))
}

/// Import `file` into `store`. Refuses a non-empty store unless `force`.
async fn seed<S: FacilityStore>(store: &S, file: &Path, force: bool) -> anyhow::Result<()> {
  let existing = store.list_facilities().await?.len();
  if existing > 0 && !force {
    info!(existing, "store already holds facilities, skipping seed (use --force to import anyway)");
    return Ok(());
  }

  let raw = std::fs::read_to_string(file)
    .with_context(|| format!("failed to read seed file {}", file.display()))?;
  let data: SeedData = serde_json::from_str(&raw).context("failed to parse seed file")?;
  let summary = store.import_documents(data).await?;
  info!(
    facilities = summary.facilities,
    hits = summary.hits,
    skipped = summary.skipped,
    "seed imported"
  );
  Ok(())
}

async fn serve<S: FacilityStore + 'static>(store: S, cfg: &ServerConfig) -> anyhow::Result<()> {
  if let Some(file) = &cfg.seed_file {
    seed(&store, file, false).await?;
  }

  let state = AppState::new(store, cfg.range_ring.to_config());
  let app = Router::new()
    .route("/", get(index))
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http());

  let address = format!("{}:{}", cfg.host, cfg.port);
  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

async fn index() -> Json<Value> {
  Json(json!({
    "message": "Oilwatch API",
    "version": env!("CARGO_PKG_VERSION"),
    "endpoints": {
      "facilities": "/api/facilities",
      "hits": "/api/hits",
      "map": "/api/map",
      "rangeRings": "/api/range-rings",
    }
  }))
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  info!("shutting down");
}
