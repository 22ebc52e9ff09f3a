//! DebateCoach server
//!
//! Serves a four-round debate between a human and an AI opponent, with an
//! AI judge scoring the finished debate.

mod routes;

use clap::Parser;
use colored::Colorize;
use debatecoach_core::config::LlmConfig;
use debatecoach_core::{
    Config, DebateLogger, DebateOrchestrator, InMemorySessionStore, TracingLogger, default_config,
};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "debatecoach",
    version,
    about = "Debate practice server - argue a topic against an AI and get scored",
    long_about = "Runs an HTTP API for four-round debates against an AI opponent using an OpenAI-compatible API, with rubric-based scoring."
)]
struct Cli {
    /// Path to a TOML config file (built-in defaults are used otherwise)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Maximum words per argument
    #[arg(short, long, value_name = "WORDS")]
    word_cap: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => default_config(),
    };
    apply_env(&mut config.llm);
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(word_cap) = cli.word_cap {
        config.debate.word_cap = word_cap;
    }
    config.validate()?;

    if !config.llm.is_configured() {
        eprintln!(
            "{}",
            "Warning: OPENAI_API_KEY not set. Arguments and grading will use fallbacks.".yellow()
        );
    }

    let logger: Arc<dyn DebateLogger> = Arc::new(TracingLogger);
    let orchestrator = DebateOrchestrator::from_config(
        &config,
        Arc::new(InMemorySessionStore::new()),
        logger.clone(),
    )?;
    let app = routes::router(routes::AppState::new(orchestrator, logger));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    print_banner(&config, &addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Pull API settings from the environment.
fn apply_env(llm: &mut LlmConfig) {
    if let Ok(base) = env::var("OPENAI_API_BASE").or_else(|_| env::var("OPENAI_BASE_URL")) {
        llm.api_base = base;
    }
    if let Ok(model) = env::var("DEBATECOACH_MODEL") {
        llm.model = model;
    }
    llm.api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty());
}

fn print_banner(config: &Config, addr: &str) {
    println!();
    println!("{}", "═".repeat(60).bright_blue());
    println!("{}", "  DebateCoach".bright_blue().bold());
    println!("{}", "═".repeat(60).bright_blue());
    println!("{} http://{}", "Listening:".bold(), addr.bright_white());
    println!(
        "{} {}",
        "Model:".bold(),
        if config.llm.is_configured() {
            config.llm.model.bright_cyan()
        } else {
            "fallback only".yellow()
        }
    );
    println!("{} {} words", "Word cap:".bold(), config.debate.word_cap);
    println!("{}", "─".repeat(60).dimmed());
}
