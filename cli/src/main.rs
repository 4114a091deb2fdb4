use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use ragloop_core::{
    AgentLoop, Config, ContextBuilder, Embedder, HttpEmbedder, OpenAIProvider, OpenSearchClient,
    RagSearchTool, ToolRegistry, VectorStore,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn,ragloop=info,ragloop_core=info";

#[derive(Parser)]
#[command(name = "ragloop")]
#[command(about = "ragloop - answer one question with tool-driven retrieval over OpenSearch", long_about = None)]
struct Cli {
    /// Config file (default: ~/.ragloop/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Question to answer; read from stdin when omitted
    #[arg(short, long)]
    message: Option<String>,

    /// Log level for ragloop (trace, debug, info, warn, error); overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    /// Do not verify that the search index exists before answering
    #[arg(long)]
    skip_index_check: bool,
}

fn setup_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(format!("warn,ragloop={level},ragloop_core={level}")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_question() -> Result<String> {
    print!("{} ", style("User:").cyan().bold());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read question from stdin")?;
    Ok(input.trim().to_string())
}

async fn ensure_index(store: &dyn VectorStore) -> Result<()> {
    let exists = store
        .index_exists()
        .await
        .with_context(|| format!("OpenSearch connection/index check failed for '{}'", store.index()))?;

    if !exists {
        anyhow::bail!("OpenSearch index does not exist: {}", store.index());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref());

    let config = Config::load(cli.config.as_deref())?;
    tracing::info!(
        model = %config.llm.model,
        index = %config.search.index,
        max_tool_calls = config.agent.max_tool_calls,
        "Configuration loaded"
    );

    let store: Arc<dyn VectorStore> = Arc::new(OpenSearchClient::from_config(&config.search));
    if cli.skip_index_check {
        tracing::debug!("Index check skipped");
    } else {
        ensure_index(store.as_ref()).await?;
    }

    let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::from_config(&config.embedding));
    let rag_search = RagSearchTool::from_config(embedder, store, &config.search);
    let tool_registry = Arc::new(ToolRegistry::new().with_tool(Arc::new(rag_search)));

    let mut context_builder =
        ContextBuilder::new().with_tool_specs(tool_registry.get_specs().to_vec());
    if let Some(prompt) = &config.agent.system_prompt {
        context_builder = context_builder.with_system_prompt(prompt);
    }

    let provider = Arc::new(OpenAIProvider::from_config(&config.llm));
    let agent_loop = AgentLoop::new(provider, context_builder, tool_registry)
        .with_max_tool_calls(config.agent.max_tool_calls);

    let question = match cli.message {
        Some(message) => message.trim().to_string(),
        None => read_question()?,
    };
    if question.is_empty() {
        println!("Input is empty. Exiting.");
        return Ok(());
    }

    match agent_loop.process(&question).await {
        Ok(answer) => {
            println!("\n{}", style("Assistant:").green().bold());
            println!("{}", answer);
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            anyhow::bail!("Turn failed: {}", e);
        }
    }
}
