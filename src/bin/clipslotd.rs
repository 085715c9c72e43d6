//! ClipSlot demo host
//!
//! Drives the slot store the way a hosting process would: one dispatcher,
//! one operation in flight at a time, with an optional simulated managed
//! restart through the in-memory state channel.
//!
//! # Examples
//!
//! ```bash
//! # Scripted write/read/dump session
//! clipslotd demo
//!
//! # Populate, hand off through the state channel, restore, verify
//! clipslotd handoff-demo --config clipslot.toml
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use clipslot::service::{Dispatcher, SlotService, StartMode};
use clipslot::snapshot::MemChannel;
use clipslot::store::DUMP_STATE;
use clipslot::transfer::{MemSink, MemSource};
use clipslot::StoreConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// ClipSlot - capacity-bounded slot store demo host
#[derive(Parser, Debug)]
#[command(name = "clipslotd")]
#[command(version = clipslot::VERSION)]
#[command(about = "ClipSlot - capacity-bounded slot store demo host", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Store configuration file (TOML)
    #[arg(long, global = true, env = "CLIPSLOT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a scripted write/read/dump session against a fresh store
    Demo,

    /// Populate a store, hand it off through the state channel, and verify
    /// the restored instance
    HandoffDemo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli)?;

    let config = match &cli.config {
        Some(path) => StoreConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => StoreConfig::default(),
    };

    match cli.command {
        Commands::Demo => demo_command(config).await,
        Commands::HandoffDemo => handoff_demo_command(config).await,
    }
}

fn setup_logging(cli: &Cli) -> anyhow::Result<()> {
    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stdout).with_ansi(!cli.no_color))
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    Ok(())
}

/// Scripted session: select, write, overwrite, dump, read back
async fn demo_command(config: StoreConfig) -> anyhow::Result<()> {
    info!(version = %clipslot::VERSION, "clipslot demo starting");

    let service = SlotService::start(&config, StartMode::Fresh, None)?;
    let (dispatcher, handle, mut ready) = Dispatcher::new(service);
    let join = tokio::spawn(dispatcher.run());

    ready.changed().await.ok();
    handle.open().await?;

    // Write into slot 3, then a scan-selected slot.
    handle.control(3).await?;
    let written = handle.write(MemSource::new(*b"hello"), 5).await?;
    info!(slot = 3, written, "stored payload");

    let free = handle.control(clipslot::store::SELECT_FIRST_FREE).await?;
    handle.write(MemSource::new(*b"world"), 5).await?;
    info!(slot = free, "stored payload in first free slot");

    // Render the debug dump into the log.
    handle.control(DUMP_STATE).await?;

    // Read slot 3 back; a second read finds it consumed.
    handle.control(3).await?;
    let sink = MemSink::new();
    let produced = handle.read(sink.clone(), 64).await?;
    info!(
        produced,
        content = %String::from_utf8_lossy(&sink.take_bytes()),
        "read payload back"
    );
    if let Err(err) = handle.read(MemSink::new(), 64).await {
        info!(%err, "second read of the same slot is refused");
    }

    handle.close().await?;
    drop(handle);

    let service = join.await.context("dispatcher task failed")?;
    println!("{}", serde_json::to_string_pretty(&service.stats())?);
    Ok(())
}

/// Simulated managed restart: save, restore, verify
async fn handoff_demo_command(config: StoreConfig) -> anyhow::Result<()> {
    info!(version = %clipslot::VERSION, "clipslot handoff demo starting");

    let service = SlotService::start(&config, StartMode::Fresh, None)?;
    let (dispatcher, handle, _ready) = Dispatcher::new(service);
    let join = tokio::spawn(dispatcher.run());

    for (slot, payload) in [(0usize, &b"alpha"[..]), (1, &b"beta"[..]), (42, &b"gamma"[..])] {
        handle.control(slot as u32).await?;
        handle.write(MemSource::new(payload.to_vec()), payload.len()).await?;
    }
    drop(handle);
    let service = join.await.context("dispatcher task failed")?;

    // The old instance publishes its state and lets go.
    let mut channel = MemChannel::new();
    service.prepare_handoff(&mut channel)?;
    info!(keys = channel.len(), "state published for handoff");
    drop(service);

    // The successor restores before serving; readiness stays suppressed.
    let successor = SlotService::start(&config, StartMode::Handoff, Some(&mut channel))?;
    info!(
        announced = successor.announces_ready(),
        restored_keys_left = channel.len(),
        "successor restored"
    );

    let (dispatcher, handle, _ready) = Dispatcher::new(successor);
    let join = tokio::spawn(dispatcher.run());

    handle.control(42).await?;
    let sink = MemSink::new();
    handle.read(sink.clone(), 64).await?;
    info!(
        content = %String::from_utf8_lossy(&sink.take_bytes()),
        "payload survived the restart"
    );

    drop(handle);
    let successor = join.await.context("dispatcher task failed")?;
    println!("{}", serde_json::to_string_pretty(&successor.stats())?);
    Ok(())
}
