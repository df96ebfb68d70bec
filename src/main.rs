//! crowdwatch - on-board bus occupancy monitor
//!
//! Replays camera frames through the person detector, e-mails an alert when
//! people are on board and logs every observation to SQLite.
//!
//! # Usage
//!
//! ```bash
//! # Run against ./crowdwatch.toml and the configured frames directory
//! crowdwatch
//!
//! # Explicit config and frames
//! crowdwatch --config /etc/crowdwatch.toml --frames /var/lib/crowdwatch/frames
//!
//! # Dump today's events for a bus as JSON lines
//! crowdwatch history --bus BT123 --start 2024-06-01T00:00:00Z
//! ```
//!
//! # Environment Variables
//!
//! - `CROWDWATCH_CONFIG`: config file path (same as `--config`)
//! - `CROWDWATCH_SMTP_HOST`, `CROWDWATCH_SMTP_PORT`, `CROWDWATCH_SMTP_USERNAME`,
//!   `CROWDWATCH_SMTP_PASSWORD`, `CROWDWATCH_SENDER_EMAIL`, `CROWDWATCH_RECIPIENT_EMAIL`
//! - `CROWDWATCH_BUS_ID`: bus identity override
//! - `RUST_LOG`: logging level (default: info)
//!
//! A `.env` file in the working directory is loaded before anything else.
//! Logs go to stderr.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crowdwatch::alerting::{AlertThrottler, Notifier, RetryPolicy, SmtpMailer};
use crowdwatch::config::MonitorConfig;
use crowdwatch::detection::SidecarDetector;
use crowdwatch::pipeline::{BusIdentity, FrameSink, ImageDirSource, NullSink, ProcessingLoop, SnapshotSink};
use crowdwatch::storage::{EventLog, SqliteEventLog};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "crowdwatch")]
#[command(about = "Bus occupancy monitor: person detection, e-mail alerts and SQLite logging")]
#[command(version)]
struct CliArgs {
    /// Path to the TOML config file (default: ./crowdwatch.toml if present)
    #[arg(long, env = "CROWDWATCH_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory of frames to replay, overriding capture.frames_dir
    #[arg(long, value_name = "DIR")]
    frames: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Print logged crowding events as JSON lines
    History {
        /// Bus identifier (default: bus.id from config)
        #[arg(long)]
        bus: Option<String>,
        /// Earliest timestamp, inclusive (RFC 3339)
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// Latest timestamp, inclusive (RFC 3339)
        #[arg(long)]
        end: Option<DateTime<Utc>>,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging on stderr; stdout carries `history` output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    if let Some(SubCommand::History { bus, start, end }) = args.command {
        let config = MonitorConfig::resolve(args.config.as_deref())?;
        return run_history(&config, bus, start, end).await;
    }

    let mut config = MonitorConfig::load(args.config.as_deref())
        .context("Invalid configuration")?;
    if let Some(frames) = args.frames {
        config.capture.frames_dir = frames;
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  crowdwatch - Bus Occupancy Monitor");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        "🚌 Bus: {} | Capacity: {} | Crowding threshold: {:.0}%",
        config.bus.id,
        config.bus.capacity.get(),
        config.bus.capacity_threshold * 100.0
    );
    info!(
        "📧 Alerts: {} -> {} via {}:{} (cooldown {}s, {} attempts, {}s apart)",
        config.smtp.sender,
        config.smtp.recipient,
        config.smtp.host,
        config.smtp.port,
        config.alert.cooldown_seconds,
        config.alert.max_retries,
        config.alert.retry_delay_seconds
    );
    info!("");

    let event_log = SqliteEventLog::open(&config.storage.db_path)
        .await
        .with_context(|| format!("Failed to open event log {}", config.storage.db_path.display()))?;

    let mut source = ImageDirSource::open(&config.capture.frames_dir)
        .with_context(|| format!("Failed to open frames directory {}", config.capture.frames_dir.display()))?;
    info!("📥 Input: {} frames from {}", source.remaining(), config.capture.frames_dir.display());

    let mailer = SmtpMailer::new(&config.smtp, config.alert.timeout())
        .context("Failed to configure SMTP transport")?;
    let notifier = Notifier::new(
        mailer,
        AlertThrottler::new(config.alert.cooldown_seconds),
        RetryPolicy {
            max_attempts: config.alert.max_retries,
            delay: config.alert.retry_delay(),
        },
        config.smtp.sender.clone(),
        config.smtp.recipient.clone(),
    );

    let sink: Box<dyn FrameSink> = match &config.overlay.snapshot_path {
        Some(path) => {
            info!("🖼️  Overlay: writing latest frame to {}", path.display());
            Box::new(SnapshotSink::new(path.clone()))
        }
        None => Box::new(NullSink),
    };

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, stopping after the current frame...");
        shutdown_token.cancel();
    });

    let bus = BusIdentity {
        id: config.bus.id.clone(),
        capacity: config.bus.capacity,
    };
    let mut processing = ProcessingLoop::new(
        bus,
        SidecarDetector::new(&config.detector),
        notifier,
        event_log.clone(),
        cancel_token,
    )
    .with_sink(sink)
    .with_tick_delay(config.capture.tick_delay());

    processing.run(&mut source).await;

    if let Ok(total) = event_log.count().await {
        info!("🗄️  {} events stored in {}", total, config.storage.db_path.display());
    }
    event_log.close().await;

    info!("✅ Shutdown complete");
    Ok(())
}

// ============================================================================
// History Subcommand
// ============================================================================

async fn run_history(
    config: &MonitorConfig,
    bus: Option<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<()> {
    if let (Some(s), Some(e)) = (start, end) {
        anyhow::ensure!(s <= e, "--start ({s}) is after --end ({e})");
    }

    let bus_id = bus.unwrap_or_else(|| config.bus.id.clone());
    let event_log = SqliteEventLog::open_existing(&config.storage.db_path)
        .await
        .with_context(|| format!("Failed to open event log {}", config.storage.db_path.display()))?;

    let records = event_log
        .query(&bus_id, start, end)
        .await
        .context("History query failed")?;
    for record in &records {
        println!("{}", serde_json::to_string(record)?);
    }
    info!("{} events for bus {}", records.len(), bus_id);

    event_log.close().await;
    Ok(())
}
