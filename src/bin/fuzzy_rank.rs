use anyhow::Result;
use clap::{Parser, Subcommand};
use fuzzy_rank::{load_entities, Ranker};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn";

/// Fuzzy relevance ranking over JSON entity records
#[derive(Parser)]
#[command(name = "fuzzy-rank", version, about)]
struct Cli {
    /// Expand terms locally instead of calling Gemini
    #[arg(long, global = true)]
    offline: bool,

    /// Kind of record being searched, passed to term expansion as a hint
    #[arg(short, long, global = true, default_value = "items")]
    model: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rank records from a JSON array file and print the top matches
    Search {
        query: String,

        /// Path to a JSON array of records, each with an `id`
        #[arg(short, long)]
        entities: PathBuf,
    },

    /// Print the expanded term set for a query
    Expand { query: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ranker = build_ranker(cli.offline)?;

    match cli.command {
        Command::Search { query, entities } => {
            let entities = load_entities(&entities)?;
            let result = ranker.rank(&query, &cli.model, &entities).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Expand { query } => {
            let terms = ranker.expand(&query, &cli.model).await;
            println!("{}", serde_json::to_string_pretty(&terms)?);
        }
    }
    Ok(())
}

fn build_ranker(offline: bool) -> Result<Ranker> {
    if offline {
        return Ok(Ranker::offline());
    }
    Ranker::from_env()
}

/// `RUST_LOG` when set and valid, otherwise warnings only.
fn log_filter(spec: Option<String>) -> EnvFilter {
    spec.and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}
