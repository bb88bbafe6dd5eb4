use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

mod config;
mod logging;

use ampdesk_cli::{
    EXIT_COMMAND, confirm, display_banner, print_help, print_reply, print_stats,
    read_input_with_history,
};
use ampdesk_core::{ConversationTurn, EntryId, VectorIndex};
use ampdesk_openai::OpenAiClient;
use ampdesk_rag::{
    EngineConfig, FlatVectorIndex, SqliteVectorIndex, SupportEngine, load_drafts, migrate_entries,
};
use config::{IndexBackend, IndexConfig};

type Engine = SupportEngine<dyn VectorIndex, OpenAiClient>;

#[derive(Parser)]
#[command(name = "ampdesk")]
#[command(about = "Support assistant for the UA2-125 amplifier", long_about = None)]
struct Cli {
    /// Index backend
    #[arg(long, value_enum, default_value_t = IndexBackend::Sqlite)]
    index: IndexBackend,

    /// Index file or database path
    #[arg(long)]
    index_path: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive support chat (default)
    Chat,
    /// Answer a single question
    Ask { question: String },
    /// Add entries from a JSON array or JSON lines file
    Ingest { file: PathBuf },
    /// Copy a flat index file into the database index
    Migrate {
        /// Flat index file to read
        #[arg(long)]
        from: PathBuf,
    },
    /// Show index statistics and health
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Delete one entry
    Delete {
        id: EntryId,
        /// Remove the row instead of deactivating it
        #[arg(long)]
        hard: bool,
    },
    /// Remove every entry
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

async fn open_index(config: &IndexConfig, client: Arc<OpenAiClient>) -> Result<Arc<dyn VectorIndex>> {
    let index: Arc<dyn VectorIndex> = match config.backend {
        IndexBackend::Flat => Arc::new(
            FlatVectorIndex::open(&config.path, client)?.with_batch_size(config.batch_size),
        ),
        IndexBackend::Sqlite => Arc::new(
            SqliteVectorIndex::connect(&config.path, client)
                .await?
                .with_batch_size(config.batch_size),
        ),
    };
    info!("Opened {:?} index at {}", config.backend, config.path.display());
    Ok(index)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let index_config = IndexConfig::resolve(cli.index, cli.index_path)?;
    let client = Arc::new(OpenAiClient::from_env()?);
    let index = open_index(&index_config, client.clone()).await?;
    let engine: Engine = SupportEngine::new(index, client.clone(), EngineConfig::from_env()?);

    let outcome = run(cli.command.unwrap_or(Commands::Chat), &engine, &index_config, client).await;
    engine.shutdown().await;
    outcome
}

async fn run(
    command: Commands,
    engine: &Engine,
    index_config: &IndexConfig,
    client: Arc<OpenAiClient>,
) -> Result<()> {
    match command {
        Commands::Chat => chat_loop(engine).await,
        Commands::Ask { question } => {
            let reply = engine.chat(&question, &[]).await?;
            print_reply(&reply);
            Ok(())
        }
        Commands::Ingest { file } => {
            let drafts = load_drafts(&file)?;
            let outcome = engine.index().upsert_batch(drafts).await;
            println!(
                "{} Added {}/{} entries",
                "✅".green(),
                outcome.succeeded,
                outcome.attempted
            );
            if outcome.failed() > 0 {
                println!("{} {} entries failed to embed", "⚠️".yellow(), outcome.failed());
            }
            Ok(())
        }
        Commands::Migrate { from } => {
            if index_config.backend != IndexBackend::Sqlite {
                bail!("migrate writes to the database index; run it with --index sqlite");
            }
            let source = FlatVectorIndex::open(&from, client)?;
            let outcome = migrate_entries(source.entries()?, engine.index().as_ref()).await;
            println!(
                "{} Migrated {}/{} entries from {}",
                "✅".green(),
                outcome.succeeded,
                outcome.attempted,
                from.display()
            );
            Ok(())
        }
        Commands::Stats { json } => {
            let health = engine.health().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&health)?);
                return Ok(());
            }
            let stats = engine.index().stats().await?;
            print_stats(&stats);
            println!("  {:<12} {:?}", "status", health.status);
            Ok(())
        }
        Commands::Delete { id, hard } => {
            if engine.index().delete(id, !hard).await {
                println!("{} Deleted entry {}", "✅".green(), id);
                Ok(())
            } else {
                bail!("entry {} not found", id)
            }
        }
        Commands::Clear { yes } => {
            let confirmed = yes || confirm("Delete every entry in the knowledge base?")?;
            if engine.index().clear(confirmed).await {
                println!("{} Knowledge base cleared", "✅".green());
            } else {
                println!("Nothing deleted");
            }
            Ok(())
        }
    }
}

async fn chat_loop(engine: &Engine) -> Result<()> {
    let health = engine.health().await;
    display_banner(health.documents_count);

    let mut conversation: Vec<ConversationTurn> = Vec::new();
    let mut input_history = Vec::new();

    loop {
        let input = read_input_with_history(&mut input_history)?;
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            EXIT_COMMAND | "quit" => {
                println!("{}", "👋 Goodbye!".green());
                break;
            }
            "help" => {
                print_help();
                continue;
            }
            "reset" => {
                conversation.clear();
                println!("{}", "Started a new conversation".dimmed());
                continue;
            }
            "stats" => {
                match engine.index().stats().await {
                    Ok(stats) => print_stats(&stats),
                    Err(e) => println!("{} {}", "❌".red(), e),
                }
                continue;
            }
            _ => {}
        }

        println!("{}", "Searching the documentation...".dimmed());
        match engine.chat(&input, &conversation).await {
            Ok(reply) => {
                print_reply(&reply);
                conversation.push(ConversationTurn::user(input));
                conversation.push(ConversationTurn::assistant(reply.answer));
            }
            Err(e) => println!("{} {}", "❌".red(), e),
        }
    }

    Ok(())
}
