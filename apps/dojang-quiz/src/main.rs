//! dojang-quiz - study and test Taekwondo terminology in the terminal.

mod app;
mod config;
mod content;
mod store;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, Subcommand};
use config::Config;
use dojang_engine::{Engine, LearningMode, TestKind};
use std::io::Write;
use std::path::PathBuf;
use store::ProfileStore;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dojang-quiz", version, about = "Taekwondo terminology trainer")]
struct Cli {
    /// Terminology file or directory of JSON files.
    #[arg(long, global = true)]
    content: Option<PathBuf>,

    /// Learner profile name.
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Current rank id, e.g. 7th_keup.
    #[arg(long, global = true)]
    rank: Option<String>,

    /// progression or mastery.
    #[arg(long, global = true)]
    mode: Option<LearningMode>,

    /// Number of items to draw.
    #[arg(long, short = 'n', global = true)]
    count: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Review flashcards, due items first.
    Study {
        /// Only study this category.
        #[arg(long)]
        category: Option<String>,
    },
    /// Take a multiple-choice test.
    Test {
        /// Short test of a handful of questions.
        #[arg(long)]
        quick: bool,
    },
    /// Continue a saved session.
    Resume,
    /// Show box distribution, mastery summary and trend.
    Stats,
    /// Write the current configuration to the config file.
    InitConfig,
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_app(config: Config) -> Result<App> {
    let engine = Engine::new(config.engine.clone()).context("Invalid engine configuration")?;
    let content_path = config
        .study
        .content_path
        .clone()
        .context("No content configured; pass --content or set study.content_path")?;
    let catalog = content::load_catalog(&content_path)
        .with_context(|| format!("Failed to load content from {}", content_path.display()))?;
    catalog
        .ladder()
        .require(&config.study.rank)
        .context("Configured rank is not in the rank ladder")?;

    let store = ProfileStore::new(&Config::data_dir(), &config.study.profile);
    tracing::debug!(dir = %store.dir().display(), "using profile store");
    Ok(App::new(engine, catalog, store, config.study))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load();
    init_tracing(&config.logging.level);

    if let Some(content) = cli.content {
        config.study.content_path = Some(content);
    }
    if let Some(profile) = cli.profile {
        config.study.profile = profile;
    }
    if let Some(rank) = cli.rank {
        config.study.rank = rank;
    }
    if let Some(mode) = cli.mode {
        config.study.learning_mode = mode;
    }
    if let Some(count) = cli.count {
        config.study.question_count = count;
    }

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout().lock();
    let mut rng = rand::thread_rng();

    match cli.command {
        Command::InitConfig => {
            let path = config.save().context("Failed to write config")?;
            writeln!(output, "Wrote {}", path.display())?;
        }
        Command::Study { category } => {
            build_app(config)?.study(category.as_deref(), &mut rng, &mut input, &mut output)?;
        }
        Command::Test { quick } => {
            let kind = if quick { TestKind::Quick } else { TestKind::Comprehensive };
            build_app(config)?.test(kind, &mut rng, &mut input, &mut output)?;
        }
        Command::Resume => {
            build_app(config)?.resume(&mut input, &mut output)?;
        }
        Command::Stats => build_app(config)?.stats(&mut output)?,
    }
    Ok(())
}
