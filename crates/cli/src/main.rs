mod config_commands;
mod send_commands;

use std::{path::PathBuf, process::ExitCode};

use {
    clap::{Parser, Subcommand},
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use pixelpost_config::PixelpostConfig;

#[derive(Parser)]
#[command(
    name = "pixelpost",
    about = "Pixelpost: deliver generated images to Telegram or a callback URL"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./pixelpost.toml, then ~/.config/pixelpost/).
    #[arg(long, global = true, env = "PIXELPOST_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Save images and send them to a Telegram chat.
    Telegram(send_commands::TelegramArgs),
    /// Post images as base64 PNG to a callback URL.
    Webhook(send_commands::WebhookArgs),
    /// Validate the configuration file and report errors/warnings.
    CheckConfig {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
}

/// Logs go to stderr so stdout carries only the JSON report.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<PixelpostConfig> {
    match &cli.config {
        Some(path) => Ok(pixelpost_config::load_config(path)?),
        None => Ok(pixelpost_config::discover_and_load()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    debug!(version = env!("CARGO_PKG_VERSION"), "pixelpost starting");

    match &cli.command {
        Commands::Telegram(args) => {
            let config = load_config(&cli)?;
            send_commands::handle_telegram(args, &config).await
        },
        Commands::Webhook(args) => {
            let config = load_config(&cli)?;
            send_commands::handle_webhook(args, &config).await
        },
        Commands::CheckConfig { verbose } => config_commands::check(cli.config.as_deref(), *verbose),
    }
}
