//! `royale-etl` binary: one full sync run, then exit.
//!
//! Reads `royale.toml` (or the path given with `--config`), layered under
//! `ROYALE__*` environment variables, opens the SQLite warehouse, and runs
//! every stage once. Meant to be invoked by a scheduler; the exit status is
//! non-zero only when a stage failed.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use royale_client::{ClientConfig, RoyaleClient};
use royale_core::{
  quarantine::{QuarantineRepository, QuarantineTracker},
  season::SeasonCalendar,
};
use royale_etl::{
  EtlConfig, Pipeline, PipelineSettings,
  config::{QuarantineBackend, expand_tilde},
  fetch::Fetcher,
  logging,
  quarantine_file::JsonFileQuarantine,
};
use royale_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Sync Clash Royale ranked-ladder data into SQLite")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "royale.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("ROYALE").separator("__"))
    .build()
    .context("failed to read config file")?;

  let cfg: EtlConfig = settings
    .try_deserialize()
    .context("failed to deserialise EtlConfig")?;

  let log_dir = cfg.log_dir.as_deref().map(expand_tilde);
  let log_file = logging::init(log_dir.as_deref()).context("failed to set up logging")?;
  if let Some(path) = log_file {
    tracing::info!(path = %path.display(), "writing run log");
  }

  // Open SQLite store.
  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let client = RoyaleClient::new(ClientConfig {
    base_url: cfg.api_base_url.clone(),
    token:    cfg.api_token.clone(),
    timeout:  cfg.request_timeout(),
  })
  .context("failed to build HTTP client")?;

  match cfg.quarantine.backend {
    QuarantineBackend::Store => run(&cfg, store.clone(), client, store).await,
    QuarantineBackend::File => {
      let path = expand_tilde(&cfg.quarantine.path);
      run(&cfg, store, client, JsonFileQuarantine::new(path)).await
    }
  }
}

async fn run<Q: QuarantineRepository>(
  cfg: &EtlConfig,
  store: SqliteStore,
  client: RoyaleClient,
  quarantine: Q,
) -> anyhow::Result<()> {
  let tracker = QuarantineTracker::load(quarantine)
    .await
    .context("failed to load quarantine set")?;
  let calendar = SeasonCalendar::new(cfg.season_start_hour).context("invalid season_start_hour")?;

  let mut pipeline = Pipeline::new(
    store,
    Fetcher::new(client, cfg.request_delay()),
    tracker,
    calendar,
    PipelineSettings {
      ranking_limit:         cfg.ranking_limit,
      past_seasons:          cfg.past_seasons,
      lookup_future_seasons: cfg.lookup_future_seasons,
      policy:                cfg.quarantine.policy,
    },
  );

  pipeline
    .run(chrono::Utc::now())
    .await
    .context("ETL run aborted")?;
  Ok(())
}
