//! wall-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, brings its schema up to date, and serves the JSON API over
//! HTTP. One-shot subcommands run the schema step or print statistics
//! without starting the server.
//!
//! ```text
//! wall-server --config config.toml serve
//! wall-server migrate
//! wall-server reset
//! wall-server stats --scope 123456 --version all
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use wall_core::store::{VersionFilter, WallStore};
use wall_server::ServerConfig;
use wall_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Wall record server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Bring the schema up to date and serve the API (default).
  Serve,
  /// Bring the schema up to date and exit.
  Migrate,
  /// Drop every subject and record and re-create the schema.
  Reset,
  /// Print the per-version statistics for a scope as JSON.
  Stats {
    /// Scope to aggregate; defaults to the configured default scope.
    #[arg(long)]
    scope:   Option<String>,
    /// A version, or `all`.
    #[arg(long, default_value = "all")]
    version: VersionFilter,
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

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("WALL"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  let store = SqliteStore::connect(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let command = cli.command.unwrap_or(Command::Serve);

  // Reset rebuilds from scratch, so it is also the way out of schema drift.
  if let Command::Reset = command {
    let state = store.reset().await.context("failed to reset store")?;
    tracing::info!("store reset; schema at version {}", state.version());
    return Ok(());
  }

  // Every other path is gated on a known-good schema.
  let state = store
    .ensure_schema()
    .await
    .context("schema initialisation failed")?;
  tracing::info!(?state, "schema ready");

  match command {
    Command::Serve => serve(store, &server_cfg).await,
    Command::Migrate | Command::Reset => Ok(()),
    Command::Stats { scope, version } => {
      let scope = scope.unwrap_or_else(|| server_cfg.default_scope.clone());
      let stats = store
        .compute_top_stats(&scope, &version)
        .await
        .context("failed to compute statistics")?;
      let buckets: Vec<wall_api::stats::StatsBucket> =
        stats.into_iter().map(Into::into).collect();
      println!("{}", serde_json::to_string_pretty(&buckets)?);
      Ok(())
    }
  }
}

async fn serve(store: SqliteStore, server_cfg: &ServerConfig) -> anyhow::Result<()> {
  let app = wall_server::router(Arc::new(store), server_cfg);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
