//! X7 remote — entry point.
//!
//! ```text
//! x7-remote probe                    Check that the camera answers
//! x7-remote status --seconds 20      Connect and print status updates
//! x7-remote record start|stop        Toggle video recording
//! x7-remote snapshot                 Take a picture
//! x7-remote preview -n 10 -o frames  Save preview JPEGs
//! x7-remote settings pull|push       Sync the [settings] section
//! x7-remote power-off                Switch the camera off
//! x7-remote --gen-config             Dump default config and exit
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use x7_core::{EventBus, Session, SessionContext, SessionEvent, SettingsStore, probe};
use x7_remote::config::{RemoteConfig, render_settings};
use x7_remote::report::describe;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "x7-remote", about = "X7 action camera remote control")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "x7-remote.toml")]
    config: PathBuf,

    /// Camera host (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Probe the camera before connecting.
    #[arg(long)]
    wait: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check whether the camera's control port answers.
    Probe,
    /// Connect and print status updates.
    Status {
        #[arg(short, long, default_value_t = 10)]
        seconds: u64,
    },
    /// Start or stop video recording.
    Record {
        #[command(subcommand)]
        action: Toggle,
    },
    /// Take a picture.
    Snapshot,
    /// Save preview frames as JPEG files.
    Preview {
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
    /// Synchronize the `[settings]` section with the camera.
    Settings {
        #[command(subcommand)]
        action: SyncAction,
    },
    /// Switch the camera off.
    PowerOff,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Toggle {
    Start,
    Stop,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum SyncAction {
    /// Read the camera's settings and print them as TOML.
    Pull,
    /// Send the configured settings to the camera.
    Push,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&RemoteConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = RemoteConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.network.host = host;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("x7-remote v{}", env!("CARGO_PKG_VERSION"));

    let command = cli.command.unwrap_or(Commands::Status { seconds: 10 });
    let endpoint = config.endpoint();
    let probe_timeout = Duration::from_millis(config.network.connect_timeout_ms);
    let probe_delay = Duration::from_millis(config.network.probe_delay_ms);

    if let Commands::Probe = command {
        let reachable = probe(&endpoint, config.network.probe_attempts, probe_timeout, probe_delay).await;
        println!("{}: {}", endpoint.control_addr(), if reachable { "reachable" } else { "unreachable" });
        return if reachable { Ok(()) } else { Err("camera not reachable".into()) };
    }

    if cli.wait && !probe(&endpoint, config.network.probe_attempts, probe_timeout, probe_delay).await {
        return Err("camera not reachable".into());
    }

    // ── 1. Collaborators ────────────────────────────────────────

    let store = Arc::new(config.seed_store());
    if let Commands::Settings { action: SyncAction::Push } = command {
        store.set_pending_update(true);
    }

    let bus = EventBus::new();
    let frames = match command {
        Commands::Preview { .. } => Some(frame_channel(&bus)),
        _ => None,
    };
    bus.subscribe(|event| {
        if !matches!(event, SessionEvent::PreviewFrame(_)) {
            println!("{}", describe(event));
        }
    });

    // ── 2. Connect ──────────────────────────────────────────────

    let session = Session::connect(
        config.session_config(),
        SessionContext::new(store.clone(), bus.clone()),
    )
    .await?;
    info!(
        "connected: token {}, recording {}, preview {}",
        session.token(),
        session.is_recording(),
        session.is_preview_supported()
    );

    // ── 3. Run the command ──────────────────────────────────────

    let outcome = run(&session, command, frames, &store).await;
    session.close().await;
    outcome
}

async fn run(
    session: &Session,
    command: Commands,
    frames: Option<UnboundedReceiver<SessionEvent>>,
    store: &x7_core::MemoryStore,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Probe => {}
        Commands::Status { seconds } => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
                _ = tokio::signal::ctrl_c() => info!("interrupted"),
            }
        }
        Commands::Record { action: Toggle::Start } => session.start_recording().await?,
        Commands::Record { action: Toggle::Stop } => session.stop_recording().await?,
        Commands::Snapshot => {
            if !session.can_snapshot() {
                warn!("camera is recording; the snapshot may be refused");
            }
            session.snapshot().await?;
        }
        Commands::Preview { count, out } => {
            if !session.is_preview_supported() {
                return Err("camera does not support preview".into());
            }
            let Some(frames) = frames else {
                return Ok(());
            };
            save_frames(frames, count, &out).await?;
        }
        Commands::Settings { action: SyncAction::Pull } => {
            print!("{}", render_settings(store)?);
        }
        Commands::Settings { action: SyncAction::Push } => info!("settings pushed"),
        Commands::PowerOff => session.power_off().await?,
    }
    Ok(())
}

fn frame_channel(bus: &EventBus) -> UnboundedReceiver<SessionEvent> {
    let (_, rx) = bus.subscribe_channel();
    rx
}

async fn save_frames(
    mut frames: UnboundedReceiver<SessionEvent>,
    count: usize,
    out: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    tokio::fs::create_dir_all(out).await?;
    let mut saved = 0;
    while saved < count {
        let event = tokio::time::timeout(Duration::from_secs(5), frames.recv())
            .await
            .map_err(|_| "no preview frame within 5s")?;
        match event {
            Some(SessionEvent::PreviewFrame(frame)) => {
                let path = out.join(format!("frame-{saved:04}.jpg"));
                tokio::fs::write(&path, frame.jpeg()).await?;
                info!("saved {} ({}x{})", path.display(), frame.width(), frame.height());
                saved += 1;
            }
            Some(SessionEvent::StateChanged { reason: Some(reason), .. }) => {
                return Err(reason.into());
            }
            Some(_) => {}
            None => return Err("event stream closed".into()),
        }
    }
    Ok(())
}
