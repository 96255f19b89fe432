mod config_commands;

use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    tunedrop_config::TunedropConfig,
    tunedrop_media::{
        PipelineConfig, RequestHandler,
        tools::{Ffmpeg, YtDlp},
    },
    tunedrop_telegram::{PollingOptions, TelegramOutbound},
};

#[derive(Parser)]
#[command(name = "tunedrop", about = "Tunedrop: YouTube audio over Telegram")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: search ./ then ~/.config/tunedrop/).
    #[arg(long, global = true, env = "TUNEDROP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Defaults to `debug` when
    /// `debug_mode` is set in the config, `info` otherwise.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Directory for per-request files (overrides config value).
    #[arg(long, global = true, env = "TUNEDROP_WORK_DIR")]
    work_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (default when no subcommand is provided).
    Run,
    /// Validate the configuration and external tools, then exit.
    Check,
}

fn init_telemetry(cli: &Cli, debug_mode: bool) {
    let default_level = match (&cli.log_level, debug_mode) {
        (Some(level), _) => level.as_str(),
        (None, true) => "debug",
        (None, false) => "info",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Pipeline settings derived from the loaded config.
fn pipeline_config(config: &TunedropConfig) -> PipelineConfig {
    PipelineConfig::new(
        config.delivery.size_budget_bytes,
        config.delivery.audio_bitrate_kbps,
        config.delivery.audio_format.clone(),
        config.resolved_work_dir(),
    )
}

fn locate_tools(config: &TunedropConfig) -> tunedrop_media::Result<(YtDlp, Ffmpeg)> {
    let yt_dlp = YtDlp::locate(
        config.tools.yt_dlp_path.as_deref(),
        Duration::from_secs(config.tools.acquire_timeout_secs),
    )?;
    let ffmpeg = Ffmpeg::locate(
        config.tools.ffmpeg_path.as_deref(),
        Duration::from_secs(config.tools.segment_timeout_secs),
    )?;
    Ok((yt_dlp, ffmpeg))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let (path, mut config) = tunedrop_config::discover_and_load(cli.config.as_deref())?;
    if let Some(dir) = cli.work_dir.clone() {
        config.work_dir = Some(dir);
    }

    init_telemetry(&cli, config.debug_mode);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %path.display(),
        "tunedrop starting"
    );

    let validation = tunedrop_config::validate(&config);
    for diagnostic in validation.warnings() {
        warn!("{diagnostic}");
    }
    if validation.has_errors() {
        for diagnostic in validation.errors() {
            error!("{diagnostic}");
        }
        anyhow::bail!("invalid configuration in {}", path.display());
    }

    let pipeline = pipeline_config(&config);
    let segment = pipeline.check()?;
    info!(
        budget_bytes = pipeline.size_budget_bytes,
        bitrate_bps = pipeline.bitrate_bps,
        seconds = segment.as_secs(),
        "oversized files will be split into fixed-length parts"
    );

    let (yt_dlp, ffmpeg) = locate_tools(&config)?;
    info!(
        yt_dlp = %yt_dlp.binary().display(),
        ffmpeg = %ffmpeg.binary().display(),
        "external tools found"
    );

    tokio::fs::create_dir_all(&pipeline.work_dir)
        .await
        .with_context(|| format!("cannot create work dir {}", pipeline.work_dir.display()))?;

    let bots = tunedrop_telegram::connect(&config.bot_token).await?;
    let outbound = Arc::new(TelegramOutbound::new(bots.uploads));
    let handler = Arc::new(RequestHandler::new(
        pipeline,
        Arc::new(yt_dlp),
        Arc::new(ffmpeg),
        outbound,
    ));

    let cancel = CancellationToken::new();
    let polling = tunedrop_telegram::start_polling(
        bots.polling,
        handler,
        PollingOptions {
            debug_mode: config.debug_mode,
        },
        cancel.clone(),
    );

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("cannot listen for shutdown signal")?;
            info!("shutdown requested");
        },
        () = cancel.cancelled() => {
            warn!("polling stopped, shutting down");
        },
    }

    // Kills in-flight downloads and splits through their child tokens; each
    // request still sends its error reply and sweeps its files before join
    // returns.
    cancel.cancel();
    polling.join().await.context("polling task panicked")?;
    info!("tunedrop stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Check) => config_commands::check(cli.config.as_deref()),
        None | Some(Commands::Run) => run(cli).await,
    }
}
