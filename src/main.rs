//! yaoline CLI
//!
//! - `analyze TEXT`: select one line for a text
//! - `batch`: one query per stdin line, then statistics
//! - `check`: build and validate the corpus
//! - `config`: print the effective configuration

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use yaoline::{AnalyzeOptions, CorpusSource, EngineConfig, MatchEngine, MatchResult};

#[derive(Parser)]
#[command(name = "yaoline")]
#[command(version)]
#[command(about = "Deterministic text-to-line matching over the 386 lines of the I Ching")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// YAML configuration file; missing keys keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON corpus source with the texts of all 386 lines
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select the best matching line for TEXT
    Analyze {
        text: String,
        /// Bypass the cache read
        #[arg(long)]
        skip_cache: bool,
        /// Ignore session history; no usage update, no cache write
        #[arg(long)]
        deterministic: bool,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Analyze each stdin line, print one JSON result per line, then statistics
    Batch {
        #[arg(long)]
        deterministic: bool,
    },
    /// Build and validate the corpus, then print a summary
    Check,
    /// Print the effective configuration as YAML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if let Commands::Config = cli.command {
        print!("{}", config.to_yaml().context("serializing config")?);
        return Ok(());
    }

    let engine = MatchEngine::new(config).context("invalid configuration")?;
    let source = cli
        .corpus
        .as_deref()
        .map(|path| CorpusSource::load(path).with_context(|| format!("loading corpus {}", path.display())))
        .transpose()?;
    engine
        .initialize(source.as_ref())
        .context("initializing corpus")?;

    match cli.command {
        Commands::Analyze {
            text,
            skip_cache,
            deterministic,
            json,
        } => {
            let options = AnalyzeOptions {
                skip_cache,
                deterministic_mode: deterministic,
            };
            let result = engine.analyze(&text, options)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }
        }
        Commands::Batch { deterministic } => {
            let options = AnalyzeOptions {
                skip_cache: false,
                deterministic_mode: deterministic,
            };
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let mut count = 0usize;
            for line in io::stdin().lock().lines() {
                let line = line.context("reading stdin")?;
                if line.trim().is_empty() {
                    continue;
                }
                let result = engine.analyze(&line, options)?;
                writeln!(out, "{}", serde_json::to_string(&result)?)?;
                count += 1;
            }
            info!(queries = count, "batch finished");
            writeln!(out, "{}", serde_json::to_string_pretty(&engine.statistics())?)?;
        }
        Commands::Check => {
            let summary = engine
                .summary()
                .context("engine reported no corpus after initialization")?;
            println!(
                "corpus ok: {} lines ({} regular, {} boundary), vocabulary {} terms over {} documents",
                summary.lines,
                summary.regular,
                summary.boundary,
                summary.vocabulary_size,
                summary.documents
            );
            let config = engine.config();
            println!(
                "tokenizer: {}, cache capacity {}, boundary rate cap {}",
                if engine.has_analyzer() { "external analyzer" } else { "built-in" },
                config.cache.capacity,
                config.boundary.rate_cap
            );
        }
        Commands::Config => {}
    }
    Ok(())
}

fn print_result(result: &MatchResult) {
    println!("{} [{}] score {:.3}", result.label, result.candidate_id, result.score);
    if let Some(i) = &result.interpretation {
        println!("  {} / {} / {}", i.phase, i.energy, i.position);
    }
    if !result.matched_keywords.is_empty() {
        println!("  keywords: {}", result.matched_keywords.join(", "));
    }
    for alt in &result.alternatives {
        println!("  alt {} [{}] {:.3}", alt.label, alt.candidate_id, alt.score);
    }
    for w in &result.warnings {
        println!("  warning: {w}");
    }
}
