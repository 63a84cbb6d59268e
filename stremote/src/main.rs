//! Interactive browser for the music library of a SoundTouch device.
//!
//! Connects to the last used device (or the one given on the command line),
//! falls back to mDNS discovery, then browses `STORED_MUSIC` from a prompt.
//! The browse path is saved on exit and restored on the next run.

mod commands;

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::Receiver;
use stconfig::{Config, get_config};
use stcontrol::{
    BootstrapPath, BrowserEngine, BrowserEvent, BrowserEventBus, BrowserSession,
    BrowserSnapshot, ControlPointError, DeviceInfo, Listing, NavigationStack, SoundTouchClient,
    StoredMusicLibrary, discover,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::{Command, HELP};

fn main() -> Result<()> {
    let config = get_config();
    init_tracing(&config.get_log_min_level());

    let host_arg = std::env::args().nth(1);
    let (client, device) = connect(&config, host_arg.as_deref())?;
    let client = Arc::new(client);
    println!("=== {} ({}) ===", device.name, client.host());

    let library = StoredMusicLibrary::discover_account(Arc::clone(&client))
        .context("Cannot resolve the music library account")?
        .with_source(&config.get_browser_source())
        .with_page_size(u32::try_from(config.get_page_size()).unwrap_or(u32::MAX));
    info!(account = library.account(), "Music library ready");

    let engine = BrowserEngine::new(Arc::new(library), client.clone()).with_bootstrap(
        BootstrapPath {
            folder: config.get_bootstrap_folder(),
            mount: config.get_bootstrap_mount(),
        },
    );

    let device_key = device.device_id.0.clone();
    let saved = load_path(&config, &device_key);

    let bus = BrowserEventBus::new();
    let events = bus.subscribe();
    let session = BrowserSession::spawn_with_events(engine, saved, bus)
        .context("Cannot start the browser thread")?;
    let printer = thread::Builder::new()
        .name("browser-view".to_string())
        .spawn(move || print_events(events))
        .context("Cannot start the view thread")?;

    println!("{}", HELP);
    let outcome = prompt_loop(&session);

    match session.close() {
        Some(path) => {
            if let Err(err) = config.set_browse_path(&device_key, &path) {
                warn!(error = %err, "Cannot save the browse path");
            }
        }
        None => warn!("Browse path lost, keeping the previously saved one"),
    }
    if printer.join().is_err() {
        warn!("View thread panicked");
    }

    outcome
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

/// Tries the explicit or remembered address first, then discovery.
fn connect(config: &Config, host_arg: Option<&str>) -> Result<(SoundTouchClient, DeviceInfo)> {
    let timeout = Duration::from_secs(config.get_http_timeout_secs());
    let port = config.get_device_port();

    let known = host_arg
        .map(str::to_string)
        .or_else(|| config.get_last_device_ip());

    if let Some(host) = known {
        match SoundTouchClient::connect(&host, port, timeout) {
            Ok((client, device)) => {
                remember(config, &client, &device);
                return Ok((client, device));
            }
            Err(err) => {
                warn!(host = host.as_str(), error = %err, "Known device unreachable, trying discovery");
            }
        }
    }

    let discovery_timeout = Duration::from_secs(config.get_discovery_timeout_secs());
    let found = discover(discovery_timeout).ok_or_else(|| anyhow!("No SoundTouch device found"))?;
    let (client, device) = SoundTouchClient::connect(&found.host, found.port, timeout)
        .with_context(|| format!("Cannot reach {} at {}", found.name, found.host))?;
    remember(config, &client, &device);
    Ok((client, device))
}

fn remember(config: &Config, client: &SoundTouchClient, device: &DeviceInfo) {
    if let Err(err) = config.set_last_device(client.host(), &device.name) {
        warn!(error = %err, "Cannot save the device address");
    }
}

fn load_path(config: &Config, device_key: &str) -> NavigationStack {
    match config.get_browse_path::<NavigationStack>(device_key) {
        Ok(Some(path)) => path,
        Ok(None) => NavigationStack::new(),
        Err(err) => {
            warn!(error = %err, "Discarding unreadable browse path");
            if let Err(err) = config.clear_browse_path(device_key) {
                warn!(error = %err, "Cannot clear the browse path");
            }
            NavigationStack::new()
        }
    }
}

fn prompt_loop(session: &BrowserSession) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            return Ok(());
        };
        let command = match commands::parse(&line?) {
            Ok(command) => command,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        let sent = match command {
            Command::Quit => return Ok(()),
            Command::Help => {
                println!("{}", HELP);
                continue;
            }
            Command::List => {
                print_snapshot(&session.snapshot());
                continue;
            }
            Command::Back => session.back(),
            Command::Refresh => session.refresh(),
            Command::Select(row) | Command::Play(row) => {
                let Some(item) = session.snapshot().items().get(row).cloned() else {
                    println!("No row {}", row);
                    continue;
                };
                if matches!(command, Command::Play(_)) {
                    session.force_play(item)
                } else {
                    session.select(item)
                }
            }
        };

        match sent {
            Ok(()) => {}
            Err(ControlPointError::Busy) => println!("Still loading, command ignored"),
            Err(err) => return Err(err.into()),
        }
    }
}

fn print_events(events: Receiver<BrowserEvent>) {
    for event in events.iter() {
        match event {
            BrowserEvent::Busy => println!("..."),
            BrowserEvent::Updated(snapshot) => print_snapshot(&snapshot),
        }
    }
}

fn print_snapshot(snapshot: &BrowserSnapshot) {
    println!("\n--- {} ---", snapshot.breadcrumb);
    match &snapshot.listing {
        Listing::Loaded(items) => {
            for (idx, item) in items.iter().enumerate() {
                let icon = if item.is_dir() { "\u{1F4C1}" } else { "\u{266B}" };
                println!("  [{}] {} {}", idx, icon, item.name());
            }
        }
        Listing::Empty => println!("(empty folder)"),
        Listing::Failed(message) => println!("(!) {}", message),
    }
    if let Some(status) = &snapshot.status {
        println!("{}", status);
    }
    if snapshot.busy {
        println!("(loading)");
    }
}
