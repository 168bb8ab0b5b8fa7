//! Secret Dating Bot - main entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use secret_dating_bot::{bot, Config};

#[derive(Parser)]
#[command(name = "secret_dating_bot")]
#[command(about = "Anonymous 1:1 dating chat bot for Telegram", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to expose metrics and health checks (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    /// Path to config.yml (defaults to ./config.yml, then ../config.yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot with long polling (default)
    Run,

    /// Load and validate the configuration, then exit
    CheckConfig,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::new(),
    };
    if let Some(addr) = &cli.metrics_addr {
        config.metrics_addr = Some(addr.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("secret_dating_bot=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => bot::run(config).await,
        Commands::CheckConfig => {
            config.validate()?;
            info!(
                token = %config.masked_token(),
                username = config.bot_username.as_deref().unwrap_or("<unset>"),
                initial_quota = config.initial_quota,
                daily_bonus = config.daily_bonus,
                referral_bonus = config.referral_bonus,
                admins = config.admin_ids.len(),
                metrics_addr = config.metrics_addr.as_deref().unwrap_or("<disabled>"),
                "Configuration OK"
            );
            Ok(())
        }
    }
}
