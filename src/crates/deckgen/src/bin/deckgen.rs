//! deckgen CLI - generate outlines, slides, images and decks from the terminal.
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use deckgen::{
    switch_layout, Credentials, DeckOrchestrator, DeckgenConfig, InstructionalLevel, Layout, SlideContent,
    Topic,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deckgen")]
#[command(about = "Generate educational slide decks with language and image models", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true, env = "DECKGEN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a topic outline
    Outline {
        /// Subject or free-text context
        context: String,
        /// Number of topics (1-20)
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
        /// elementary, middle_school, high_school, university, professional
        #[arg(short, long, default_value = "high_school")]
        level: String,
    },

    /// Generate content for one slide
    Slide {
        /// Slide title
        title: String,
        /// Key points (repeat for each point)
        #[arg(short = 'p', long = "point", required = true)]
        points: Vec<String>,
        #[arg(short, long, default_value = "high_school")]
        level: String,
        /// bullets, body, two_column, image_bullets, image_caption
        #[arg(long, default_value = "bullets")]
        layout: String,
    },

    /// Generate one image
    Image {
        prompt: String,
    },

    /// Generate a complete deck and export it
    Deck {
        context: String,
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
        #[arg(short, long, default_value = "high_school")]
        level: String,
        #[arg(long, default_value = "image_bullets")]
        layout: String,
    },

    /// Re-map a slide JSON file onto another layout
    Relayout {
        /// Slide file produced by `deckgen slide`
        file: PathBuf,
        #[arg(long)]
        layout: String,
    },

    /// List models available from the chat provider
    Models,

    /// Show the configured quota policy
    Quota,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn orchestrator(config: &DeckgenConfig) -> anyhow::Result<DeckOrchestrator> {
    let credentials = Credentials::from_env(&config.providers)?;
    Ok(DeckOrchestrator::from_config(config, &credentials)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(rust_log)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = DeckgenConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Outline {
            context,
            count,
            level,
        } => {
            let level: InstructionalLevel = level.parse()?;
            let outline = orchestrator(&config)?
                .generate_outline(&context, count, level)
                .await?;
            print_json(&outline)?;
        }
        Commands::Slide {
            title,
            points,
            level,
            layout,
        } => {
            let level: InstructionalLevel = level.parse()?;
            let layout: Layout = layout.parse()?;
            let slide = orchestrator(&config)?
                .generate_slide(&Topic::new(title, points), level, layout)
                .await?;
            print_json(&slide)?;
        }
        Commands::Image { prompt } => {
            let asset = orchestrator(&config)?.generate_image(&prompt).await?;
            print_json(&asset)?;
        }
        Commands::Deck {
            context,
            count,
            level,
            layout,
        } => {
            let level: InstructionalLevel = level.parse()?;
            let layout: Layout = layout.parse()?;
            let deck = orchestrator(&config)?
                .generate_deck(&context, count, level, layout)
                .await?;
            for warning in &deck.warnings {
                eprintln!("warning: {warning}");
            }
            print_json(&deck)?;
        }
        Commands::Relayout { file, layout } => {
            let layout: Layout = layout.parse()?;
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read slide file {}", file.display()))?;
            let slide: SlideContent = serde_json::from_str(&content)
                .with_context(|| format!("Invalid slide file {}", file.display()))?;
            print_json(&switch_layout(&slide, layout))?;
        }
        Commands::Models => {
            let models = orchestrator(&config)?.list_models().await?;
            print_json(&models)?;
        }
        Commands::Quota => {
            print_json(&config.quota_policy())?;
        }
    }

    Ok(())
}
