//! Pictogram lookup from the command line
//!
//! # Usage
//!
//! ```bash
//! # Chunk mode, lexical scorer, built-in catalog
//! text2picto お茶をのみましょう。それから病院にいきます。
//!
//! # Sentence mode with the Candle model, JSON output
//! text2picto --scorer embedding --mode sentence --json "ここで食べないでください"
//!
//! # Text from stdin, custom catalog
//! echo "薬を飲みます" | text2picto --catalog my_catalog.json
//! ```
//!
//! Logs go to stderr (`RUST_LOG`, default `info`); results go to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Read};
use std::path::PathBuf;
use text2picto::{
    load_configured_catalog, EngineConfig, GranularityMode, MatchResult, PictogramPipeline,
    ScorerKind, UnitMatches, PROHIBITION_LABEL,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "text2picto")]
#[command(version)]
#[command(about = "Match text units against a pictogram catalog")]
struct Cli {
    /// YAML configuration file
    #[arg(long, env = "TEXT2PICTO_CONFIG")]
    config: Option<PathBuf>,

    /// JSON catalog (built-in catalog if omitted)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Similarity backend: embedding, hashing, lexical
    #[arg(long)]
    scorer: Option<ScorerKind>,

    /// Granularity: sentence, chunk, word
    #[arg(long, short)]
    mode: Option<GranularityMode>,

    /// Matches per unit
    #[arg(long, short = 'k')]
    top_k: Option<usize>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Text to convert (reads stdin if not provided)
    text: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    config.apply_env_overrides()?;
    if let Some(scorer) = cli.scorer {
        config.scorer = scorer;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(top_k) = cli.top_k {
        config.top_k = top_k;
    }
    if let Some(path) = cli.catalog {
        config.catalog_path = Some(path);
    }

    let text = if cli.text.is_empty() {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        cli.text.join(" ")
    };

    let catalog = load_configured_catalog(&config)?;
    let pipeline = PictogramPipeline::from_config(&config)?;
    pipeline.prepare(&catalog)?;

    info!(
        "Processing {} chars ({} mode, top {})",
        text.chars().count(),
        config.mode,
        config.top_k
    );
    let units = pipeline.process(&text, config.mode, config.top_k, &catalog)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&units)?);
    } else {
        print_units(&units);
    }
    Ok(())
}

fn print_units(units: &[UnitMatches]) {
    if units.is_empty() {
        println!("(no units)");
        return;
    }
    for (i, unit) in units.iter().enumerate() {
        println!("[{}] {}", i + 1, unit.unit);
        for m in &unit.matches {
            println!("    {}", describe(m, unit.prohibitive));
        }
    }
}

fn describe(m: &MatchResult, prohibitive: bool) -> String {
    let mut line = format!("{:<12} {:.2}", m.label(), m.score);
    if let Some(path) = m.image_ref() {
        line.push_str(&format!("  {}", path));
    }
    if m.is_placeholder {
        if let Some(nearest) = &m.nearest_label {
            line.push_str(&format!("  (placeholder, nearest: {})", nearest));
        } else {
            line.push_str("  (placeholder)");
        }
    } else if prohibitive && m.label() == PROHIBITION_LABEL && m.score >= 1.0 {
        line.push_str("  (prohibition)");
    }
    line
}
