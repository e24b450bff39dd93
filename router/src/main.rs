//! CLI entry point and process lifecycle (§4.13): parse configuration, bind
//! the link, wire up `RouterState`, spawn the ARP timer thread, and run the
//! receive loop on the calling thread until interrupted.

mod config;
mod link;
mod timer;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use link::{LinkReceiver, LinkSender};
use router_core::RouterState;
use timer::ArpTimer;

#[derive(Parser)]
#[command(name = "router")]
#[command(about = "Software IPv4 router data plane")]
struct Cli {
    /// Path to the interface list file (`name mac ip` per line).
    #[arg(long)]
    interfaces: PathBuf,

    /// Path to the routing table file (`dest mask gateway iface` per line).
    #[arg(long)]
    routes: PathBuf,

    /// Network device name to bind. Repeat for multiple devices; defaults
    /// to every interface named in `--interfaces`.
    #[arg(long = "device")]
    devices: Vec<String>,

    /// Overrides `RUST_LOG` (e.g. `debug`, `router_core=trace`).
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let interfaces = config::load_interfaces(&cli.interfaces)
        .with_context(|| format!("loading interface file {}", cli.interfaces.display()))?;
    let routes = config::load_routes(&cli.routes, &interfaces)
        .with_context(|| format!("loading routing table {}", cli.routes.display()))?;

    let devices = if cli.devices.is_empty() {
        interfaces.iter().map(|iface| iface.name.clone()).collect()
    } else {
        cli.devices
    };

    info!(?devices, "binding link layer");
    let (sender, mut receiver) = link::bind(&devices).context("binding link layer")?;
    let sender: Arc<Mutex<dyn LinkSender + Send>> = Arc::new(Mutex::new(sender));

    let state = Arc::new(RouterState::new(interfaces, routes));
    let timer = ArpTimer::spawn(state.clone(), sender.clone());

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_flag.store(true, Ordering::Relaxed);
    })
    .context("installing SIGINT handler")?;

    info!("router running, press ctrl-c to stop");
    run_receive_loop(&state, &mut receiver, &sender, &shutdown);

    let snapshot = state.counters.snapshot();
    info!(?snapshot, "shutting down");
    timer.stop_and_join();
    Ok(())
}

/// Runs on the calling thread only; owns `receiver` outright so its
/// blocking `recv` never contends with the ARP timer's sends, which go
/// through the separately shared `sender`.
fn run_receive_loop(
    state: &RouterState,
    receiver: &mut dyn LinkReceiver,
    sender: &Arc<Mutex<dyn LinkSender + Send>>,
    shutdown: &AtomicBool,
) {
    while !shutdown.load(Ordering::Relaxed) {
        let (iface, bytes) = match receiver.recv() {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%err, "link receive failed, retrying");
                continue;
            }
        };

        let outcome = state.on_frame(&iface, &bytes, Instant::now());
        let mut sender = sender.lock().expect("link sender mutex poisoned");
        for transmit in outcome.transmits {
            if let Err(err) = sender.send(&transmit.iface, &transmit.bytes) {
                warn!(iface = %transmit.iface, %err, "send failed");
            }
        }
    }
}

fn init_logging(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
