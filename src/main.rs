use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fromptly::cli;

#[derive(Parser)]
#[command(name = "fromptly", version)]
#[command(about = "Refine code-generation prompts with an LLM", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refine a prompt and print the service reply as JSON
    Refine {
        /// The raw prompt to refine
        prompt: String,

        /// Ask for short additive options instead of a full rewrite
        #[arg(long)]
        options: bool,

        /// Path to config file (defaults to ./fromptly.toml or ~/.config/fromptly/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Override LLM provider (gemini, anthropic, openai, openai-compatible, mock)
        #[arg(long)]
        provider: Option<String>,

        /// Override LLM model (e.g., "gemini-2.5-flash", "claude-sonnet-4-5-20250929")
        #[arg(long)]
        model: Option<String>,

        /// Use mock LLM client for testing
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; logs go to stderr so stdout stays pure JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Refine {
            prompt,
            options,
            config,
            provider,
            model,
            dry_run,
        } => {
            let reply = cli::refine::run(prompt, options, config, provider, model, dry_run).await?;
            println!("{}", reply);
        }
    }

    Ok(())
}
