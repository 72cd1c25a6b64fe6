//! Orthographe application binary - composition root.
//!
//! 1. Parse the command line and load configuration from TOML
//! 2. Open the progress database and the progress store
//! 3. Connect to the Gemini generation service when the command needs it
//! 4. Run the requested command

mod cli;
mod dictate;
mod render;

use std::io::{IsTerminal, Write};
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use orthographe_core::config::TrainerConfig;
use orthographe_gemini::{GeminiClient, GenerationService};
use orthographe_review::ScoringPolicy;
use orthographe_storage::{Database, ProgressStore};
use orthographe_trainer::{ProgressSummary, Trainer};

use cli::{CliArgs, Command};
use render::Palette;

/// Exit status when the API key is missing.
const EXIT_NO_API_KEY: i32 = 2;

fn init_tracing(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}

/// Build the Gemini client or exit with a hint about the API key.
fn connect(config: &TrainerConfig) -> GeminiClient {
    match GeminiClient::from_config(&config.gemini) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Erreur : {e}");
            eprintln!(
                "Définissez la variable d'environnement {} avec votre clé API Gemini.",
                config.gemini.api_key_env
            );
            std::process::exit(EXIT_NO_API_KEY);
        }
    }
}

/// Argument value, or the contents of the file it names when prefixed by `@`.
fn read_arg(arg: &str) -> std::io::Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path),
        None => Ok(arg.to_string()),
    }
}

fn confirm(question: &str) -> std::io::Result<bool> {
    print!("{question} [o/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "o" | "oui" | "y" | "yes"))
}

fn open_store(data_dir: &Path) -> Result<ProgressStore, Box<dyn std::error::Error>> {
    let db_path = data_dir.join("orthographe.db");
    let db = Database::open(&db_path)?;
    tracing::info!(path = %db_path.display(), "progress database opened");
    Ok(ProgressStore::open(Arc::new(db))?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = TrainerConfig::load_or_default(&config_file);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }

    // Tracing.
    init_tracing(&args.resolve_log_level(&config.general.log_level));
    tracing::info!("Starting Orthographe v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!(path = %config_file.display(), "configuration resolved");

    let palette = Palette {
        color: !args.no_color && std::io::stdout().is_terminal(),
    };

    // Storage.
    let data_dir = config.general.resolved_data_dir();
    let store = open_store(&data_dir)?;
    let target = config.catalog.texts_per_level;

    match args.command() {
        Command::InitConfig { force } => {
            if config_file.exists() && !force {
                println!(
                    "{} existe déjà (--force pour l'écraser).",
                    config_file.display()
                );
            } else {
                config.save(&config_file)?;
                println!("Configuration écrite dans {}.", config_file.display());
            }
        }
        Command::Progress => {
            print!("{}", render::progress_report(&ProgressSummary::from_store(&store, target)));
        }
        Command::Reset { yes } => {
            let mut store = store;
            if yes || confirm("Effacer toute la progression et les catalogues générés ?")? {
                store.reset()?;
                println!("Progression réinitialisée.");
            } else {
                println!("Annulé.");
            }
        }
        Command::Catalog { collection, refresh } => {
            let kind = collection.resolve()?;
            let store = if refresh {
                let mut trainer = Trainer::new(Arc::new(connect(&config)), store, &config);
                trainer.ensure_catalog(kind).await?;
                trainer.into_store()
            } else {
                store
            };
            let catalog = store.catalog(kind);
            if catalog.is_empty() {
                println!("Catalogue {} vide. Essayez --refresh.", kind.key());
            }
            for item in catalog {
                println!(
                    "{}",
                    render::catalog_line(palette, item, store.is_completed(kind, &item.id))
                );
            }
        }
        Command::Evaluate {
            original,
            submission,
        } => {
            let original = read_arg(&original)?;
            let submission = read_arg(&submission)?;
            let client = connect(&config);
            let policy = ScoringPolicy::from(&config.scoring);

            let mut evaluation = client.evaluate(&original, &submission).await?;
            evaluation.score = policy.normalized_score(evaluation.score);
            println!(
                "{}",
                render::annotated_submission(palette, &submission, &evaluation.errors)
            );
            print!("{}", render::error_list(&evaluation.errors));
            println!(
                "{}",
                render::score_line(
                    palette,
                    evaluation.score,
                    policy.band(evaluation.score),
                    &policy.breakdown(&evaluation),
                )
            );
            if !evaluation.comment.is_empty() {
                println!("{}", evaluation.comment);
            }
        }
        Command::Dictate {
            collection,
            item,
            slow,
        } => {
            let kind = collection.resolve()?;
            let mut trainer = Trainer::new(Arc::new(connect(&config)), store, &config);
            dictate::run(&mut trainer, &config, palette, kind, item, slow).await?;
        }
    }

    Ok(())
}
