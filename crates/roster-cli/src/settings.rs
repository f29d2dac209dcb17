//! Runtime configuration: an optional TOML file layered under `ROSTER_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use roster_core::district::Districts;
use serde::Deserialize;

/// Shape of the configuration, deserialised from `roster.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
  /// SQLite database file; a leading `~/` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  /// District names offered by the entry form. Falls back to the built-in
  /// list when absent or empty.
  #[serde(default)]
  pub districts:  Option<Vec<String>>,
}

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/roster/roster.db") }

impl Settings {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("ROSTER"))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise settings")
  }

  pub fn districts(&self) -> Districts {
    self
      .districts
      .clone()
      .map(Districts::new)
      .filter(|districts| !districts.is_empty())
      .unwrap_or_default()
  }
}
