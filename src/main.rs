mod ai_client;
mod api;
mod config;
mod db;
mod error;
mod models;
mod parser;
mod pipeline;
mod plan_store;
mod profile;
mod prompts;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::AppConfig;
use crate::db::Database;
use crate::pipeline::WorkoutPlanGenerator;
use crate::plan_store::InMemoryPlanStore;

#[derive(Parser)]
#[command(name = "fit-ai")]
#[command(about = "Generates personalized workout plans from user profiles with an LLM")]
#[command(version)]
struct Cli {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve,

    /// Generate a plan for a profile document on disk and print it
    Generate {
        #[arg(long)]
        profile: PathBuf,
    },

    /// Print the prompt a profile would produce without calling a provider
    Prompt {
        #[arg(long)]
        profile: PathBuf,
    },

    /// Store a profile document in the local profile database
    ImportProfile {
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        profile: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let config = AppConfig::load().context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Generate { profile } => {
            let document = read_profile(&profile)?;
            let generator = build_generator(&config)?;
            let plan = generator.generate_workout_plan(&document).await?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(())
        }
        Commands::Prompt { profile: path } => {
            let document = read_profile(&path)?;
            let user = profile::translate(&document)?;
            println!("{}\n", prompts::SYSTEM_INSTRUCTION);
            println!("{}", prompts::build_prompt(&user));
            Ok(())
        }
        Commands::ImportProfile { user_id, profile } => {
            let document = read_profile(&profile)?;
            let database = Database::open(&config.database_url)
                .with_context(|| format!("Failed to open {}", config.database_url))?;
            database
                .upsert_profile(&user_id, &document)
                .context("Failed to store profile")?;
            info!("Stored profile for {}", user_id);
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    let database = Database::open(&config.database_url)
        .with_context(|| format!("Failed to open {}", config.database_url))?;
    let generator = build_generator(&config)?;
    info!(
        "Starting Fit AI API with the {} backend",
        generator.provider_name()
    );

    let state = api::ApiState {
        database: Arc::new(Mutex::new(database)),
        generator,
        plans: Arc::new(InMemoryPlanStore::new()),
    };
    api::run_server(state, &config.api_bind_addr, &config.cors_allowed_origins).await
}

fn build_generator(config: &AppConfig) -> Result<WorkoutPlanGenerator> {
    let provider_config = config.provider_config()?;
    let provider = ai_client::build_provider(&provider_config)?;
    Ok(WorkoutPlanGenerator::new(provider).with_debug_prompt(config.fitness_debug_prompt))
}

fn read_profile(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}
