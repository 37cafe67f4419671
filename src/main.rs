//! # DocAgent
//!
//! Earnings-report question answering over documents stored in Box.
//!
//! Usage:
//!   docagent init                              # Upload sample data, build the index
//!   docagent tools --vector "..." --text "..." # Try both retrieval tools
//!   docagent plan "..."                        # Show which tools the model would call
//!   docagent ask --thread 001 "..."            # Run the agent on a thread
//!   docagent resume --thread 001               # Finish an interrupted turn
//!   docagent history --thread 001              # Print a thread's messages
//!   docagent reset --thread 001                # Delete a thread's checkpoints
//!   docagent threads                           # List known threads

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docagent_agent::{AgentGraph, GraphRun, ToolAugmentedModel};
use docagent_core::DocAgentConfig;
use docagent_core::traits::{ChatProvider, Checkpointer, DocumentStore, EmbeddingProvider, SearchBackend};
use docagent_core::types::Message;
use docagent_ingest::RecursiveTextSplitter;
use docagent_index::IndexBuilder;
use docagent_store::BoxClient;
use docagent_tools::{FullTextSearchTool, NOT_FOUND, ToolRegistry, VectorSearchTool};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "docagent",
    version,
    about = "📊 DocAgent: tool-calling agent over tech earnings reports"
)]
struct Cli {
    /// Config file (default: ~/.docagent/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload the sample folder to Box, then load, split and index it
    Init {
        /// Local folder to upload (default: box.sample_data_path)
        #[arg(long)]
        local: Option<PathBuf>,
        /// Box folder to upload into (default: box.parent_folder_id)
        #[arg(long)]
        parent: Option<String>,
    },
    /// Run the retrieval tools directly
    Tools {
        #[arg(long, default_value = "What are the challenges facing tech companies in 2026?")]
        vector: String,
        #[arg(long, default_value = "largest driver of expense growth")]
        text: String,
    },
    /// One model call: print the tool calls it requests
    Plan { query: String },
    /// Ask a question on a conversation thread
    Ask {
        /// Thread id (a new one is generated when omitted)
        #[arg(short, long)]
        thread: Option<String>,
        query: String,
    },
    /// Continue a thread whose last turn did not finish
    Resume {
        #[arg(short, long)]
        thread: String,
    },
    /// Print the stored messages of a thread
    History {
        #[arg(short, long)]
        thread: String,
    },
    /// Delete every checkpoint of a thread
    Reset {
        #[arg(short, long)]
        thread: String,
    },
    /// List known threads
    Threads,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "info,docagent=debug,docagent_core=debug,docagent_providers=debug,docagent_store=debug,\
         docagent_ingest=debug,docagent_index=debug,docagent_tools=debug,docagent_memory=debug,\
         docagent_agent=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => DocAgentConfig::load_path(path),
        None => DocAgentConfig::load(),
    }
    .context("loading configuration")?;
    config.validate()?;

    match cli.command {
        Command::Init { local, parent } => init(&config, local, parent).await,
        Command::Tools { vector, text } => tools(&config, &vector, &text).await,
        Command::Plan { query } => plan(&config, &query).await,
        Command::Ask { thread, query } => {
            let thread = thread.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let graph = build_graph(&config).await?;
            println!("🧵 Thread: {thread}");
            print_run(&graph.invoke(&thread, &query).await?)
        }
        Command::Resume { thread } => {
            let graph = build_graph(&config).await?;
            print_run(&graph.resume(&thread).await?)
        }
        Command::History { thread } => {
            let checkpointer = docagent_memory::open_checkpointer(&config).await?;
            match checkpointer.latest(&thread).await? {
                Some(cp) => {
                    println!("🧵 Thread {thread} (step {}, next: {})", cp.step, cp.next);
                    for message in &cp.messages {
                        print_message(message);
                    }
                }
                None => println!("No checkpoints for thread '{thread}'."),
            }
            Ok(())
        }
        Command::Reset { thread } => {
            let checkpointer = docagent_memory::open_checkpointer(&config).await?;
            checkpointer.delete_thread(&thread).await?;
            println!("🗑️  Thread '{thread}' reset");
            Ok(())
        }
        Command::Threads => {
            let checkpointer = docagent_memory::open_checkpointer(&config).await?;
            let threads = checkpointer.list_threads().await?;
            if threads.is_empty() {
                println!("No threads yet.");
            }
            for id in threads {
                println!("{id}");
            }
            Ok(())
        }
    }
}

async fn init(config: &DocAgentConfig, local: Option<PathBuf>, parent: Option<String>) -> Result<()> {
    let client = BoxClient::new(config)?;
    let user = client.current_user().await.context("connecting to Box")?;
    println!("Connected to Box as user: {} (ID: {})", user.name, user.id);

    let local = local.unwrap_or_else(|| PathBuf::from(&config.box_store.sample_data_path));
    let parent = parent.unwrap_or_else(|| config.box_store.parent_folder_id.clone());
    let report = docagent_ingest::upload_folder(&client, &parent, &local).await?;
    println!("Created folder: {} ({})", report.folder.name, report.folder.id);
    println!(
        "📤 {} uploaded, {} already present, {} failed",
        report.uploaded.len(),
        report.skipped.len(),
        report.failed.len()
    );
    for (name, error) in &report.failed {
        println!("   ⚠️  {name}: {error}");
    }

    let docs = docagent_ingest::load_documents(&client, &report.folder.id).await?;
    println!("📄 Loaded {} documents", docs.len());
    let splitter = RecursiveTextSplitter::from_config(&config.chunking)?;
    let chunks = splitter.split_documents(&docs);
    println!("✂️  Split into {} chunks", chunks.len());

    let (backend, embedder) = open_search(config).await?;
    let built = IndexBuilder::from_config(config, backend, embedder)
        .rebuild(&chunks)
        .await?;
    println!(
        "✅ Indexed {} records ({} dimensions) into {}",
        built.records, built.dimensions, config.index.collection
    );
    Ok(())
}

async fn tools(config: &DocAgentConfig, vector: &str, text: &str) -> Result<()> {
    let (backend, embedder) = open_search(config).await?;

    println!("\nTesting vector search tool...");
    println!("{}", "--".repeat(40));
    let tool = VectorSearchTool::new(backend.clone(), embedder, config.index.vector_k);
    println!("{}", tool.search(vector).await?);
    println!("{}", "--".repeat(40));

    println!("\n\nTesting full search tool...");
    println!("{}", "--".repeat(40));
    match FullTextSearchTool::new(backend).search(text).await? {
        Some(hit) => println!("{}", serde_json::to_string_pretty(&hit)?),
        None => println!("{NOT_FOUND}"),
    }
    Ok(())
}

async fn plan(config: &DocAgentConfig, query: &str) -> Result<()> {
    let (backend, embedder) = open_search(config).await?;
    let registry = docagent_tools::retrieval_registry(config, backend, embedder);
    let model = ToolAugmentedModel::from_config(config, chat_provider(config)?, &registry);

    let reply = model.invoke(&[Message::user(query)], true).await?;
    if reply.has_tool_calls() {
        println!("{}", serde_json::to_string_pretty(reply.requested_tools())?);
    } else {
        println!("(no tool calls) {}", reply.content);
    }
    Ok(())
}

async fn open_search(
    config: &DocAgentConfig,
) -> Result<(Arc<dyn SearchBackend>, Arc<dyn EmbeddingProvider>)> {
    let backend = docagent_index::open_backend(config).await?;
    let embedder: Arc<dyn EmbeddingProvider> = Arc::from(docagent_providers::create_embedder(config)?);
    Ok((backend, embedder))
}

fn chat_provider(config: &DocAgentConfig) -> Result<Arc<dyn ChatProvider>> {
    Ok(Arc::from(docagent_providers::create_provider(config)?))
}

async fn build_graph(config: &DocAgentConfig) -> Result<AgentGraph> {
    let (backend, embedder) = open_search(config).await?;
    let registry: ToolRegistry = docagent_tools::retrieval_registry(config, backend, embedder);
    let model = ToolAugmentedModel::from_config(config, chat_provider(config)?, &registry);
    let checkpointer = docagent_memory::open_checkpointer(config).await?;
    Ok(AgentGraph::from_config(config, model, registry, checkpointer))
}

fn print_run(run: &GraphRun) -> Result<()> {
    for update in &run.steps {
        println!("Node {}:", update.node);
        for message in &update.messages {
            print_message(message);
        }
    }
    println!("\n---FINAL ANSWER---");
    println!("{}", run.answer);
    Ok(())
}

fn print_message(message: &Message) {
    match (&message.tool_call_id, message.requested_tools()) {
        (Some(id), _) => println!("  [tool {id}] {}", message.content),
        (None, []) => println!("  [{}] {}", message.role, message.content),
        (None, calls) => {
            for call in calls {
                println!(
                    "  [{} → {}] {}({})",
                    message.role, call.id, call.function.name, call.function.arguments
                );
            }
        }
    }
}
