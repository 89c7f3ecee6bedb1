use anima_core::{ActionSet, AnimaConfig, DesireStatus, MemoryStore, SharedTraits, TraitProfile};
use anima_memory::{embedding, SqliteStore};
use anima_reasoning::api_types::{ContentBlock, Message, Role};
use anima_reasoning::{
    prompts, providers, CognitiveCycle, CompletionParams, LlmClient, LlmGenerator,
};
use anyhow::Context;
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod recall_action;

use recall_action::RecallAction;

/// Conversation turns kept as context for the next answer.
const HISTORY_TURNS: usize = 8;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "anima.toml", env = "ANIMA_CONFIG")]
    config: String,

    /// Path to the memory database (overrides the config file)
    #[arg(short, long)]
    db: Option<String>,

    /// Personality preset (overrides the config file)
    #[arg(short, long)]
    preset: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn prompt() -> std::io::Result<()> {
    print!("> ");
    std::io::stdout().flush()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let mut config = AnimaConfig::load_or_default(&args.config);
    if let Some(db) = args.db {
        config.memory.db_path = db;
    }
    if let Some(preset) = args.preset {
        config.traits.preset = preset;
    }

    info!("Initializing Anima...");
    let profile: TraitProfile = config.traits.to_profile().with_context(|| {
        format!(
            "Invalid personality (presets: {})",
            TraitProfile::preset_names().join(", ")
        )
    })?;
    info!("Personality: {}", profile.describe());
    let traits = SharedTraits::new(profile);

    info!("Loading {} embedder...", config.memory.embedder);
    let embedder = embedding::from_config(&config.memory)?;

    info!("Connecting to memory at {}...", config.memory.db_path);
    let store = Arc::new(SqliteStore::new(&config.memory.db_path, embedder).await?);

    info!(
        "Starting {} provider with model {}...",
        config.llm.provider, config.llm.model
    );
    let client = providers::from_config(&config.llm)?;
    let params = CompletionParams::from_config(&config.llm);
    let generator = Arc::new(LlmGenerator::new(
        client.clone(),
        params.clone(),
        config.initiative.max_tool_rounds,
    ));

    let mut actions = ActionSet::new();
    actions.register(Arc::new(RecallAction::new(store.clone())));

    let cycle = CognitiveCycle::new(generator, store.clone(), traits, actions, &config);

    let retried = cycle.retry_pending().await;
    if retried > 0 {
        info!("Resumed {} interrupted initiative(s)", retried);
    }

    println!("Anima online. Type 'quit' to exit, '/mood', '/traits' or '/desires' to inspect.");
    prompt()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut history: Vec<Message> = Vec::new();

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();

        match trimmed {
            "quit" | "exit" => break,
            "" => {
                prompt()?;
                continue;
            }
            "/mood" => {
                let pad = cycle.mood().pad();
                let voice = cycle.mood().current_voice_parameters();
                println!(
                    "P={:.2} A={:.2} D={:.2} ({}) | voice length_scale={:.3} noise_scale={:.3} noise_w={:.2}",
                    pad.pleasure,
                    pad.arousal,
                    pad.dominance,
                    pad.describe(),
                    voice.length_scale,
                    voice.noise_scale,
                    voice.noise_w
                );
                prompt()?;
                continue;
            }
            "/traits" => {
                println!("{}", cycle.traits().snapshot().describe());
                prompt()?;
                continue;
            }
            "/desires" => {
                let mut listed = 0;
                for status in [DesireStatus::Active, DesireStatus::Pending] {
                    match store.desires_with_status(status).await {
                        Ok(desires) => {
                            for d in desires {
                                println!(
                                    "- [{}] {} ({:.2}) {}",
                                    d.status, d.label, d.intensity, d.description
                                );
                                listed += 1;
                            }
                        }
                        Err(e) => error!("Failed to list {} desires: {:#}", status, e),
                    }
                }
                if listed == 0 {
                    println!("(no open desires)");
                }
                prompt()?;
                continue;
            }
            _ => {}
        }

        let system = prompts::conversation_system(&cycle.traits().snapshot(), &cycle.mood().pad());
        history.push(Message::user_text(trimmed));
        match client
            .complete(&system, history.clone(), vec![], params.clone())
            .await
        {
            Ok(response) => {
                let answer = response.joined_text();
                println!("\nAnima: {}\n", answer);
                history.push(Message {
                    role: Role::Assistant,
                    content: vec![ContentBlock::Text {
                        text: answer.clone(),
                    }],
                });
                if history.len() > HISTORY_TURNS * 2 {
                    history.drain(..history.len() - HISTORY_TURNS * 2);
                }

                let report = cycle.turn(trimmed, &answer).await;
                info!(
                    "Turn touched {} opinion(s), {} desire(s)",
                    report.opinions.len(),
                    report.desires.len()
                );
            }
            Err(e) => {
                history.pop();
                error!("Error answering: {:#}", e);
                println!("\n[System Error]: {}\n", e);
            }
        }

        cycle.retry_pending().await;
        prompt()?;
    }

    Ok(())
}
