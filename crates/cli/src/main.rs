//! Onager CLI — the main entry point.
//!
//! Commands:
//! - `onboard` — write a default config file
//! - `run`     — execute one objective through the agent loop

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use onager_config::AppConfig;
use onager_core::{CapabilityProvider, CompletionService, MemoryService};
use onager_engine::{
    CapabilitySetting, ControlLoop, ExecutionState, LoopConfig, StepEvent,
};
use onager_memory::{InMemoryStore, NoopMemory};
use onager_providers::OpenAiCompatService;

#[derive(Parser)]
#[command(
    name = "onager",
    about = "Onager — an autonomous LLM agent runtime",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file to ~/.onager/config.toml
    Onboard,

    /// Run one objective through the agent loop
    Run {
        /// The objective, in natural language
        objective: String,

        /// Override the configured model
        #[arg(short, long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => onboard(),
        Commands::Run { objective, model } => run(&objective, model).await,
    }
}

fn onboard() -> anyhow::Result<()> {
    let dir = AppConfig::config_dir();
    let path = dir.join("config.toml");
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating {}", dir.display()))?;
    std::fs::write(&path, AppConfig::default_toml())
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    println!("Set your API key there or export ONAGER_API_KEY.");
    Ok(())
}

async fn run(objective: &str, model_override: Option<String>) -> anyhow::Result<()> {
    let mut config = AppConfig::load()?;
    if let Some(model) = model_override {
        config.model = model;
    }

    let completion = build_completion(&config)?;
    let memory = build_memory(&config);
    let capability_settings: HashMap<String, serde_json::Value> = config
        .capabilities
        .iter()
        .map(|(name, cap)| {
            (
                name.clone(),
                serde_json::to_value(&cap.settings).unwrap_or_default(),
            )
        })
        .collect();
    let capabilities: Arc<dyn CapabilityProvider> = Arc::new(
        onager_capabilities::default_registry_with(&capability_settings),
    );
    tracing::debug!(
        provider = %config.provider,
        model = %config.model,
        memory = %config.memory.backend,
        "collaborators wired"
    );

    let loop_config = LoopConfig {
        error_streak_limit: config.loop_settings.error_streak_limit,
        output_max_chars: config.loop_settings.output_max_chars,
        chat_history_window: config.loop_settings.chat_history_window,
        planner_history_window: config.loop_settings.planner_history_window,
        log_window: config.loop_settings.log_window,
        chat_recall_k: config.loop_settings.chat_recall_k,
        planner_recall_k: config.loop_settings.planner_recall_k,
        classifier_temperature: config.loop_settings.classifier_temperature,
        planner_temperature: config.loop_settings.planner_temperature,
        critic_temperature: config.loop_settings.critic_temperature,
        chat_temperature: config.loop_settings.chat_temperature,
        auto_save: config.memory.auto_save,
    };

    let control = ControlLoop::new(completion, capabilities, memory).with_config(loop_config);

    let active: HashMap<String, CapabilitySetting> = config
        .capabilities
        .iter()
        .map(|(name, cap)| (name.clone(), CapabilitySetting { enabled: cap.enabled }))
        .collect();

    let state = ExecutionState::new(objective).with_capabilities(active);
    let (_abort, mut events) = control.run_stream_state(state);

    while let Some(event) = events.recv().await {
        render(&event);
    }

    Ok(())
}

fn build_completion(config: &AppConfig) -> anyhow::Result<Arc<dyn CompletionService>> {
    let service: OpenAiCompatService = match config.provider.as_str() {
        "ollama" => OpenAiCompatService::ollama(config.base_url.as_deref(), &config.model),
        name @ ("openrouter" | "openai") => {
            let Some(api_key) = &config.api_key else {
                bail!(
                    "No API key configured for {name}. Set it in {} or export ONAGER_API_KEY.",
                    AppConfig::config_dir().join("config.toml").display()
                );
            };
            match (name, &config.base_url) {
                (_, Some(url)) => OpenAiCompatService::new(name, url, api_key, &config.model),
                ("openai", None) => OpenAiCompatService::openai(api_key, &config.model),
                _ => OpenAiCompatService::openrouter(api_key, &config.model),
            }
        }
        other => bail!("Unknown provider '{other}' (expected openrouter, openai, or ollama)"),
    };
    Ok(Arc::new(service.with_max_tokens(config.max_tokens)))
}

fn build_memory(config: &AppConfig) -> Arc<dyn MemoryService> {
    match config.memory.backend.as_str() {
        "none" => Arc::new(NoopMemory),
        _ => Arc::new(InMemoryStore::new()),
    }
}

fn render(event: &StepEvent) {
    match event {
        StepEvent::Classified { mode, thought } => {
            println!("◆ mode: {mode:?} — {thought}");
        }
        StepEvent::Thought { content } => {
            println!("💭 {content}");
        }
        StepEvent::ActionPlanned { capability, arguments } => {
            println!("→ {capability}({arguments})");
        }
        StepEvent::ActionDispatched { capability, output } => {
            let preview: String = output.chars().take(200).collect();
            println!("⚙ {capability}: {preview}");
        }
        StepEvent::Critiqued { is_error, feedback } => {
            let marker = if *is_error { "✗" } else { "✓" };
            println!("{marker} {feedback}");
        }
        StepEvent::Error { message } => {
            eprintln!("! {message}");
        }
        StepEvent::Finished { response } => {
            println!("\n{response}");
        }
        StepEvent::Aborted { run_id } => {
            eprintln!("run {run_id} aborted");
        }
    }
}
