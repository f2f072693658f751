//! streamdesk CLI — runs the input sidecar daemons.

use clap::{Parser, Subcommand};
use tokio::sync::watch;

#[derive(Parser)]
#[command(
    name = "streamdesk",
    about = "Virtual input device fleet and session watchdog",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the virtual device fleet until interrupted.
    Fleet {
        /// Path to configuration file.
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Watch session activity and run the configured idle/expiry commands.
    Watchdog {
        /// Path to configuration file.
        #[arg(short, long)]
        config: Option<String>,

        /// Seconds until idle detection, overriding the config.
        #[arg(long)]
        idle: Option<u64>,

        /// Seconds until expiry, -1 for never, overriding the config.
        #[arg(long)]
        timeout: Option<i64>,
    },

    /// Remove stale sockets and ready markers left by a previous run.
    Cleanup {
        /// Path to configuration file.
        #[arg(short, long)]
        config: Option<String>,
    },
}

/// Signal shutdown on ctrl-c.
fn shutdown_channel() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            let _ = tx.send(true);
        }
    });
    rx
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fleet { config } => {
            let config = streamdesk_daemon::setup::load_config(config.as_deref())?;
            tracing::info!(
                mice = config.fleet.mice,
                joysticks = config.fleet.joysticks,
                "starting device fleet"
            );
            streamdesk_daemon::run_fleet(&config, shutdown_channel()).await?;
        }
        Commands::Watchdog {
            config,
            idle,
            timeout,
        } => {
            let mut config = streamdesk_daemon::setup::load_config(config.as_deref())?;
            if let Some(idle) = idle {
                config.watchdog.idle = idle;
            }
            if let Some(timeout) = timeout {
                config.watchdog.timeout = timeout;
            }
            tracing::info!(
                idle = config.watchdog.idle,
                timeout = config.watchdog.timeout,
                "starting activity watchdog"
            );
            streamdesk_daemon::run_watchdog(&config, shutdown_channel()).await?;
        }
        Commands::Cleanup { config } => {
            let config = streamdesk_daemon::setup::load_config(config.as_deref())?;
            let fleet = config.fleet.to_fleet_config();
            streamdesk_uinput::cleanup(&fleet)?;
            tracing::info!(dir = %fleet.socket_dir.display(), "removed stale sockets and markers");
        }
    }

    Ok(())
}
