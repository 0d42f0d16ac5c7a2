use anyhow::Context;
use clap::{Parser, Subcommand};
use logbook_search::{
    config::{Config, ObservabilityConfig},
    models::LogEntry,
    query::{QueryCompiler, SearchParameters},
    repository::LogRepository,
    search::SearchService,
    sequence::SequenceAllocator,
    state::create_store,
};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "logbook-search")]
#[command(about = "Logbook search and entry management", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (overrides LOGBOOK_CONFIG)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search entries with KEY=VALUE parameters (a bare KEY is a flag)
    Search {
        #[arg(value_name = "KEY=VALUE")]
        parameters: Vec<String>,
    },

    /// Print the compiled query for KEY=VALUE parameters without running it
    Compile {
        #[arg(value_name = "KEY=VALUE")]
        parameters: Vec<String>,
    },

    /// Create an entry from JSON (file or stdin)
    Create {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Update an existing entry from JSON (file or stdin)
    Update {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Get an entry by id
    Get {
        #[arg(value_name = "ENTRY_ID")]
        id: i64,
    },

    /// List archived versions of an entry
    Archived {
        #[arg(value_name = "ENTRY_ID")]
        id: i64,
    },

    /// Rebuild the search index from the entry store
    Reindex,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    init_tracing(&config.observability);

    tracing::debug!(
        backend = ?config.storage.backend,
        index_path = ?config.search.index_path,
        "Configuration loaded"
    );

    // compiling needs neither the store nor the index
    if let Commands::Compile { parameters } = &cli.command {
        let compiler = QueryCompiler::new(&config.search)?;
        let compiled = compiler.compile(&parse_parameters(parameters))?;
        return print_json(&compiled);
    }

    let repository = build_repository(&config).await?;

    match cli.command {
        Commands::Search { parameters } => {
            let result = repository.search(&parse_parameters(&parameters)).await?;
            print_json(&result)?;
        }
        Commands::Create { file } => {
            let entry = repository.create(read_entry(file)?).await?;
            print_json(&entry)?;
        }
        Commands::Update { file } => {
            let entry = repository.update(read_entry(file)?).await?;
            print_json(&entry)?;
        }
        Commands::Get { id } => {
            let entry = repository
                .find_by_id(id)
                .await?
                .with_context(|| format!("Log entry {} not found", id))?;
            print_json(&entry)?;
        }
        Commands::Archived { id } => {
            print_json(&repository.find_archived(id).await?)?;
        }
        Commands::Reindex => {
            let indexed = repository.reindex().await?;
            println!("Indexed {} entries", indexed);
        }
        Commands::Compile { .. } => {}
    }

    Ok(())
}

fn init_tracing(observability: &ObservabilityConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("logbook_search={}", observability.log_level).into());

    // stdout carries command output
    let json_layer = observability
        .json_logs
        .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!observability.json_logs)
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn build_repository(config: &Config) -> anyhow::Result<LogRepository> {
    let store = create_store(&config.storage)?;
    let search = Arc::new(SearchService::new(&config.search).await?);
    let sequence = Arc::new(SequenceAllocator::bootstrap(store.as_ref()).await);

    if sequence.is_degraded() {
        tracing::warn!("Entry identifiers may collide with entries from a previous run");
    }

    Ok(LogRepository::new(store, search, sequence))
}

fn parse_parameters(raw: &[String]) -> SearchParameters {
    let mut parameters = SearchParameters::new();
    for argument in raw {
        match argument.split_once('=') {
            Some((key, value)) => parameters.insert(key, value),
            None => parameters.insert_flag(argument),
        }
    }
    parameters
}

fn read_entry(file: Option<PathBuf>) -> anyhow::Result<LogEntry> {
    let json = match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read entry from stdin")?;
            buffer
        }
    };
    serde_json::from_str(&json).context("Entry is not valid JSON")
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
