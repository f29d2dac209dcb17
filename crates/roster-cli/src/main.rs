//! `roster` — command-line front end for the roster person store.
//!
//! # Usage
//!
//! ```text
//! roster add --name "Ana García" --document 12345678 --phone 987654321 \
//!   --address "Av. Arequipa 123" --district Lince
//! roster list --search García
//! roster watch
//! ```

mod commands;
mod form;
mod render;
mod settings;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use roster_query::PersonController;
use roster_store_sqlite::SqliteStore;
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Person roster backed by SQLite")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "roster.toml")]
  config: PathBuf,

  /// Database file; overrides `store_path` from the configuration.
  #[arg(long, value_name = "FILE")]
  db: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Register a new person.
  Add(NewPersonArgs),

  /// Edit an existing person. The document id cannot be changed.
  Edit {
    id: i64,
    #[command(flatten)]
    changes: EditArgs,
  },

  /// Delete a person.
  Delete { id: i64 },

  /// Print every field of a person.
  Show { id: i64 },

  /// List persons, optionally filtered by name or document id.
  List {
    /// Case-sensitive substring of the full name or document id.
    #[arg(short, long)]
    search: Option<String>,

    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
  },

  /// Live search: every line read from stdin becomes the search text.
  Watch,

  /// Print the configured district names.
  Districts,
}

/// Fields for `add`. Missing values are reported together, not by clap.
#[derive(Args)]
struct NewPersonArgs {
  #[arg(long)]
  name:         Option<String>,
  #[arg(long)]
  document:     Option<String>,
  #[arg(long)]
  phone:        Option<String>,
  #[arg(long)]
  address:      Option<String>,
  /// Defaults to the first configured district.
  #[arg(long)]
  district:     Option<String>,
  #[arg(long)]
  civil_status: Option<String>,
}

#[derive(Args)]
struct EditArgs {
  #[arg(long)]
  name:               Option<String>,
  #[arg(long)]
  phone:              Option<String>,
  #[arg(long)]
  address:            Option<String>,
  #[arg(long)]
  district:           Option<String>,
  #[arg(long, conflicts_with = "clear_civil_status")]
  civil_status:       Option<String>,
  /// Mark the civil status as not specified.
  #[arg(long)]
  clear_civil_status: bool,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr so they never mix with command output.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;
  let districts = settings.districts();

  let store_path = cli
    .db
    .unwrap_or_else(|| expand_tilde(&settings.store_path));
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }

  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );
  let controller = PersonController::new(store.clone());
  let ctx = commands::Context { store, controller, districts };

  match cli.command {
    Command::Add(args) => commands::add(&ctx, args).await,
    Command::Edit { id, changes } => commands::edit(&ctx, id, changes).await,
    Command::Delete { id } => commands::delete(&ctx, id).await,
    Command::Show { id } => commands::show(&ctx, id).await,
    Command::List { search, json } => commands::list(&ctx, search, json).await,
    Command::Watch => commands::watch(&ctx).await,
    Command::Districts => {
      print!("{}", render::districts(&ctx.districts));
      Ok(())
    }
  }
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
