//! `pixelpost telegram` and `pixelpost webhook`.

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use {
    anyhow::{Context, Result, bail},
    clap::Args,
    secrecy::{ExposeSecret, Secret},
    serde_json::{Map, Value},
    tracing::info,
};

use {
    pixelpost_config::PixelpostConfig,
    pixelpost_media::{OutputDir, PixelBuffer, PngMetadata},
    pixelpost_telegram::{
        Grouping, SendAs, SendRequest, TelegramClient, TelegramDeliveryConfig, send_images,
    },
    pixelpost_webhook::{WebhookConfig, WebhookSender},
};

#[derive(Args, Debug)]
pub struct TelegramArgs {
    /// Image files to send, in order.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Filename prefix, may contain a subfolder and %width%/%height%.
    #[arg(long)]
    pub prefix: Option<String>,

    /// Upload as documents instead of compressed photos.
    #[arg(long)]
    pub as_document: bool,

    /// Batch images into media groups of up to ten.
    #[arg(long)]
    pub grouped: bool,

    /// Per-request timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub chat_id: Option<String>,

    /// Where saved copies go (overrides `output.directory`).
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// JSON workflow prompt embedded into saved PNGs.
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,

    /// JSON object whose entries are embedded as extra PNG text chunks.
    #[arg(long)]
    pub extra_info_file: Option<PathBuf>,

    /// Do not embed any metadata into saved PNGs.
    #[arg(long)]
    pub no_metadata: bool,
}

#[derive(Args, Debug)]
pub struct WebhookArgs {
    /// Image files to post, in order.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Callback URL (overrides `webhook.callback_url`).
    #[arg(long)]
    pub url: Option<String>,

    /// Job id echoed back in every payload (overrides `webhook.id`).
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Process exit status when the run finished but some units failed.
const PARTIAL_FAILURE: u8 = 2;

/// Exit status for a finished run.
fn run_status(failed: usize) -> ExitCode {
    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(PARTIAL_FAILURE)
    }
}

pub async fn handle_telegram(args: &TelegramArgs, config: &PixelpostConfig) -> Result<ExitCode> {
    let delivery = telegram_config(args, config)?;
    let buffers = load_buffers(&args.inputs)?;
    let metadata = if args.no_metadata || !config.output.embed_metadata {
        None
    } else {
        Some(load_metadata(
            args.prompt_file.as_deref(),
            args.extra_info_file.as_deref(),
        )?)
    };
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.directory));
    let prefix = args
        .prefix
        .as_deref()
        .unwrap_or(&config.output.filename_prefix);

    let client = TelegramClient::new(&delivery);
    let store = OutputDir::new(output_dir);
    let request = SendRequest {
        images: &buffers,
        filename_prefix: prefix,
        metadata: metadata.as_ref().filter(|m| !m.is_empty()),
        send_as: delivery.send_as,
        grouping: delivery.grouping,
    };

    let report = send_images(&client, &store, &request).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(run_status(report.failed_units()))
}

pub async fn handle_webhook(args: &WebhookArgs, config: &PixelpostConfig) -> Result<ExitCode> {
    let hook = webhook_config(args, config)?;
    let buffers = load_buffers(&args.inputs)?;

    let outcomes = WebhookSender::new(&hook).send_images(&buffers).await?;
    println!("{}", serde_json::to_string_pretty(&outcomes)?);

    Ok(run_status(outcomes.iter().filter(|o| !o.is_delivered()).count()))
}

/// Config file section with command-line overrides applied.
fn telegram_config(args: &TelegramArgs, config: &PixelpostConfig) -> Result<TelegramDeliveryConfig> {
    let mut delivery = config.telegram.clone().unwrap_or_default();

    if let Some(token) = &args.token {
        delivery.token = Secret::new(token.clone());
    }
    if let Some(chat_id) = &args.chat_id {
        delivery.chat_id = chat_id.clone();
    }
    if let Some(timeout) = args.timeout {
        delivery.timeout_secs = timeout;
    }
    if args.as_document {
        delivery.send_as = SendAs::Document;
    }
    if args.grouped {
        delivery.grouping = Grouping::Grouped;
    }

    if delivery.token.expose_secret().is_empty() {
        bail!("no bot token: set telegram.token or pass --token / TELEGRAM_BOT_TOKEN");
    }
    if delivery.chat_id.is_empty() {
        bail!("no chat id: set telegram.chat_id or pass --chat-id / TELEGRAM_CHAT_ID");
    }
    if delivery.timeout_secs == 0 {
        bail!("timeout must be at least one second");
    }
    Ok(delivery)
}

fn webhook_config(args: &WebhookArgs, config: &PixelpostConfig) -> Result<WebhookConfig> {
    let mut hook = config.webhook.clone().unwrap_or_default();

    if let Some(url) = &args.url {
        hook.callback_url = url.clone();
    }
    if let Some(id) = &args.id {
        hook.id = id.clone();
    }
    if let Some(timeout) = args.timeout {
        hook.timeout_secs = timeout;
    }

    if hook.callback_url.is_empty() {
        bail!("no callback url: set webhook.callback_url or pass --url");
    }
    Ok(hook)
}

fn load_buffers(inputs: &[PathBuf]) -> Result<Vec<PixelBuffer>> {
    inputs
        .iter()
        .map(|path| {
            let image = image::open(path)
                .with_context(|| format!("failed to decode {}", path.display()))?;
            let buffer = PixelBuffer::from_image(&image);
            info!(
                path = %path.display(),
                width = buffer.width(),
                height = buffer.height(),
                channels = buffer.channels(),
                "loaded input image"
            );
            Ok(buffer)
        })
        .collect()
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn load_metadata(prompt: Option<&Path>, extra: Option<&Path>) -> Result<PngMetadata> {
    let prompt = prompt.map(read_json).transpose()?;
    let extra: Option<Map<String, Value>> = match extra.map(read_json).transpose()? {
        Some(Value::Object(map)) => Some(map),
        Some(_) => bail!("extra info file must contain a JSON object"),
        None => None,
    };
    Ok(PngMetadata::from_workflow(prompt.as_ref(), extra.as_ref()))
}
