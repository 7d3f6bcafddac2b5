//! Tracing subscriber setup: stdout always, plus one log file per run when a
//! log directory is configured.

use std::{
  fs::File,
  io,
  path::{Path, PathBuf},
  sync::Mutex,
};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// File name of the log for a run started now, e.g.
/// `etl_log_2024-05-01_09-00-00.log`.
pub fn run_log_name() -> String {
  format!("etl_log_{}.log", chrono::Local::now().format("%Y-%m-%d_%H-%M-%S"))
}

/// Install the global subscriber. Returns the path of the run log file, if
/// one was created.
///
/// `RUST_LOG` overrides the default `INFO` level for both outputs.
pub fn init(log_dir: Option<&Path>) -> io::Result<Option<PathBuf>> {
  let filter = EnvFilter::builder()
    .with_default_directive(LevelFilter::INFO.into())
    .from_env_lossy();

  let (file_layer, path) = match log_dir {
    Some(dir) => {
      std::fs::create_dir_all(dir)?;
      let path = dir.join(run_log_name());
      let file = File::create(&path)?;
      let layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
      (Some(layer), Some(path))
    }
    None => (None, None),
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer())
    .with(file_layer)
    .init();

  Ok(path)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn run_log_name_is_timestamped() {
    let name = run_log_name();
    assert!(name.starts_with("etl_log_"));
    assert!(name.ends_with(".log"));
    // etl_log_ + YYYY-mm-dd_HH-MM-SS + .log
    assert_eq!(name.len(), 8 + 19 + 4);
  }
}
