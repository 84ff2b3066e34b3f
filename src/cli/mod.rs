//! TaskClaw command-line interface.
//!
//! Thin wiring only: load config, build the provider, assemble an agent with
//! the default tools, run the instruction. The orchestration core lives in
//! the library modules.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::agent::{AgentDirectory, AgentIdentity, AgentLoop, ContextBuilder};
use crate::config::Config;
use crate::memory::{CheckpointStore, ContextCompactor};
use crate::providers::{ClaudeProvider, LLMProvider};
use crate::rpc::{load_server_tools, ServerSpec};
use crate::session::ConversationStore;
use crate::tools::{DelegateTool, EchoTool, RecallTool};
use crate::utils::logging::init_logging;

#[derive(Parser)]
#[command(name = "taskclaw", version, about = "Autonomous LLM task agent")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run one instruction through an agent and print the final answer
    Run {
        /// Agent id (also the conversation key)
        #[arg(long, default_value = "main")]
        agent: String,
        /// Override the persona system prompt
        #[arg(long)]
        persona: Option<String>,
        /// Require confirmation for destructive tools (auto-denied in
        /// non-interactive runs)
        #[arg(long)]
        safe_mode: bool,
        /// The instruction for the agent
        instruction: Vec<String>,
    },
    /// Print the resolved configuration
    Config,
}

/// CLI entry point, called from `main`.
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::load().context("loading configuration")?;
    init_logging(&config.logging);

    let cli = Cli::parse();
    match cli.command {
        CliCommand::Run {
            agent,
            persona,
            safe_mode,
            instruction,
        } => run_instruction(config, agent, persona, safe_mode, instruction).await,
        CliCommand::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn run_instruction(
    config: Config,
    agent_id: String,
    persona: Option<String>,
    safe_mode: bool,
    instruction: Vec<String>,
) -> anyhow::Result<()> {
    let instruction = instruction.join(" ");
    if instruction.trim().is_empty() {
        anyhow::bail!("no instruction given");
    }

    let provider = build_provider(&config)?;
    let store = Arc::new(ConversationStore::new().context("opening conversation store")?);
    let checkpoints = Arc::new(
        CheckpointStore::with_dir(Config::dir().join("checkpoints"))
            .context("opening checkpoint store")?,
    );
    let compactor = ContextCompactor::new(&config.memory, Arc::clone(&checkpoints))
        .with_snapshot_dir(Config::dir().join("snapshots"));
    let directory = Arc::new(AgentDirectory::new());

    let mut context_builder = ContextBuilder::new();
    if let Some(persona_text) = &persona {
        context_builder = context_builder.with_system_prompt(persona_text);
    }

    let identity = AgentIdentity::new(&agent_id)
        .with_safe_mode(safe_mode || config.agents.defaults.safe_mode);
    let agent = AgentLoop::new(identity, config.clone(), provider, store, compactor)
        .with_context_builder(context_builder);

    agent.register_tool(Box::new(EchoTool)).await;
    agent
        .register_tool(Box::new(RecallTool::new(Arc::clone(&checkpoints))))
        .await;
    agent
        .register_tool(Box::new(DelegateTool::new(Arc::clone(&directory))))
        .await;

    for server in &config.rpc_servers {
        let spec = ServerSpec::from(server);
        match load_server_tools(&spec).await {
            Ok(tools) => {
                for tool in tools {
                    agent.register_tool(Box::new(tool)).await;
                }
            }
            Err(e) => warn!(server = %server.name, error = %e, "Skipping tool server"),
        }
    }

    let agent = Arc::new(agent);
    directory.register(Arc::clone(&agent)).await;

    let answer = agent.run_turn(&instruction).await?;
    println!("{}", answer);
    Ok(())
}

/// Build the configured LLM provider.
fn build_provider(config: &Config) -> anyhow::Result<Arc<dyn LLMProvider>> {
    let anthropic = config
        .providers
        .anthropic
        .as_ref()
        .context("no provider configured; set ANTHROPIC_API_KEY or providers.anthropic in config")?;
    let api_key = anthropic
        .api_key
        .as_deref()
        .context("providers.anthropic.api_key is not set")?;

    let mut provider = ClaudeProvider::new(api_key);
    if let Some(api_base) = &anthropic.api_base {
        provider = provider.with_api_base(api_base);
    }
    Ok(Arc::new(provider))
}
