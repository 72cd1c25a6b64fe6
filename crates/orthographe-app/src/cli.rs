//! Command-line arguments.
//!
//! Priority for every setting: CLI flag > environment variable > config
//! file > built-in default.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use orthographe_core::config::expand_home;
use orthographe_core::error::Result;
use orthographe_core::types::{CollectionKind, DifficultyLevel};

/// Orthographe: French dictation practice for the brevet.
#[derive(Parser, Debug)]
#[command(name = "orthographe", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the progress database.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level or filter directive (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Disable colored output.
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the works of a collection.
    Catalog {
        #[command(flatten)]
        collection: CollectionArgs,
        /// Ask the generator for more works if the catalog is short.
        #[arg(long)]
        refresh: bool,
    },
    /// Show completion per level and for the brevet collection.
    Progress,
    /// Take a dictation.
    Dictate {
        #[command(flatten)]
        collection: CollectionArgs,
        /// Catalog item id, e.g. `level-1-text-3`. Defaults to the first
        /// item not yet completed.
        #[arg(long)]
        item: Option<String>,
        /// Start with the slow reading.
        #[arg(long)]
        slow: bool,
    },
    /// Grade a text against a reference without touching progress.
    /// Prefix an argument with `@` to read it from a file.
    Evaluate { original: String, submission: String },
    /// Write the current configuration, defaults included, to the config
    /// file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Forget all completions and generated catalogs.
    Reset {
        /// Do not ask for confirmation.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct CollectionArgs {
    /// Training level (1 to 4).
    #[arg(long, conflicts_with = "brevet")]
    pub level: Option<u8>,
    /// Use the brevet collection.
    #[arg(long)]
    pub brevet: bool,
}

impl CollectionArgs {
    /// Selected collection; level 1 when nothing is given.
    pub fn resolve(&self) -> Result<CollectionKind> {
        if self.brevet {
            return Ok(CollectionKind::Exam);
        }
        let level = match self.level {
            Some(n) => DifficultyLevel::new(n)?,
            None => DifficultyLevel::default(),
        };
        Ok(CollectionKind::Training(level))
    }
}

impl CliArgs {
    /// Priority: --config > ORTHOGRAPHE_CONFIG > ~/.orthographe/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("ORTHOGRAPHE_CONFIG") {
            return PathBuf::from(p);
        }
        expand_home("~/.orthographe/config.toml")
    }

    /// `--data-dir` if given.
    pub fn resolve_data_dir(&self) -> Option<String> {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    /// Priority: --log-level > RUST_LOG > config value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        if let Some(ref level) = self.log_level {
            return level.clone();
        }
        match std::env::var("RUST_LOG") {
            Ok(filter) if !filter.trim().is_empty() => filter,
            _ => config_level.to_string(),
        }
    }

    /// Command to run; a bare invocation starts a level-1 dictation.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Dictate {
            collection: CollectionArgs::default(),
            item: None,
            slow: false,
        })
    }
}
