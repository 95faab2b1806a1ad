use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use std::sync::Arc;

use evlink_parser::{ParsedEvent, EVENT_ARGUMENTS_LEN};
use evlink_proto::{
    CurrentEventSequence, Envelope, Event, EventError, Message, ReceiveHandler, ReceiveProtocol,
    RequestEvent,
};

#[derive(Debug, Parser)]
#[command(name = "evlink", version, about = "evlink - ground station event stream receiver")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the configuration and the event definition file.
    Doctor,
    /// Feed a capture of received messages through the receive protocol.
    Replay {
        /// JSON-lines capture file, one message per line.
        #[arg(long)]
        capture: String,
        /// Keep tailing the capture file for appended messages.
        #[arg(long)]
        follow: bool,
    },
}

#[derive(Debug, serde::Deserialize)]
struct Config {
    station: StationCfg,
    peer: PeerCfg,
    events: EventsCfg,
}

/// MAVLink ids of this ground station.
#[derive(Debug, serde::Deserialize)]
struct StationCfg {
    system_id: u8,
    component_id: u8,
}

/// The vehicle component whose event stream we follow.
#[derive(Debug, serde::Deserialize)]
struct PeerCfg {
    system_id: u8,
    component_id: u8,
}

#[derive(Debug, serde::Deserialize)]
struct EventsCfg {
    /// Path to the event definitions JSON file.
    definitions: String,
    /// Rendering profile, "dev" or "normal". Default: dev.
    profile: Option<String>,
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    Ok(toml::from_str(&s).context("parse config toml")?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg),
        Command::Replay { capture, follow } => replay(&cfg, &capture, follow).await,
    }
}

fn load_store(cfg: &Config) -> Result<evlink_parser::Parser> {
    let mut store = evlink_parser::Parser::new();
    store.load_definitions_file(&cfg.events.definitions)?;
    if let Some(profile) = &cfg.events.profile {
        store.set_profile(profile);
    }
    Ok(store)
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    if let Some(profile) = &cfg.events.profile {
        anyhow::ensure!(
            profile == "dev" || profile == "normal",
            "events.profile must be \"dev\" or \"normal\""
        );
    }

    let store = load_store(cfg)?;
    info!(
        "doctor: loaded {} enums, {} events from {}",
        store.num_enums(),
        store.num_events(),
        cfg.events.definitions
    );

    let mut events: Vec<_> = store.events().collect();
    events.sort_by_key(|d| d.id);
    for def in events {
        println!(
            "0x{:08x} {}::{} group={} args={}",
            def.id,
            def.namespace,
            def.name,
            def.group,
            def.arguments.len()
        );
    }

    info!("doctor: OK");
    Ok(())
}

/// One line of a replay capture. `system_id` defaults to the configured
/// peer when a capture does not record it.
#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CaptureRecord {
    Event {
        system_id: Option<u8>,
        component_id: u8,
        id: u32,
        sequence: u16,
        time_boot_ms: u32,
        #[serde(default)]
        destination_component: u8,
        #[serde(default)]
        arguments: Vec<u8>,
    },
    CurrentSequence {
        system_id: Option<u8>,
        component_id: u8,
        flags: u8,
        sequence: u16,
    },
    EventError {
        system_id: Option<u8>,
        component_id: u8,
        target_system: u8,
        target_component: u8,
        sequence: u16,
        sequence_oldest_available: u16,
    },
}

fn decode_record(record: CaptureRecord, default_system: u8) -> Result<(Envelope, Message)> {
    match record {
        CaptureRecord::Event {
            system_id,
            component_id,
            id,
            sequence,
            time_boot_ms,
            destination_component,
            arguments,
        } => {
            anyhow::ensure!(
                arguments.len() <= EVENT_ARGUMENTS_LEN,
                "arguments longer than {} bytes",
                EVENT_ARGUMENTS_LEN
            );
            let mut buf = [0u8; EVENT_ARGUMENTS_LEN];
            buf[..arguments.len()].copy_from_slice(&arguments);
            Ok((
                Envelope {
                    system_id: system_id.unwrap_or(default_system),
                    component_id,
                },
                Message::Event(Event {
                    id,
                    sequence,
                    time_boot_ms,
                    destination_component,
                    arguments: buf,
                }),
            ))
        }
        CaptureRecord::CurrentSequence {
            system_id,
            component_id,
            flags,
            sequence,
        } => Ok((
            Envelope {
                system_id: system_id.unwrap_or(default_system),
                component_id,
            },
            Message::CurrentEventSequence(CurrentEventSequence { flags, sequence }),
        )),
        CaptureRecord::EventError {
            system_id,
            component_id,
            target_system,
            target_component,
            sequence,
            sequence_oldest_available,
        } => Ok((
            Envelope {
                system_id: system_id.unwrap_or(default_system),
                component_id,
            },
            Message::EventError(EventError {
                target_system,
                target_component,
                sequence,
                sequence_oldest_available,
            }),
        )),
    }
}

/// Prints delivered events; requests and losses go to the log.
struct PrintHandler;

impl ReceiveHandler for PrintHandler {
    fn send_request_event(&mut self, request: RequestEvent) {
        info!("requesting retransmission of event {}", request.sequence);
    }

    fn handle_event(&mut self, event: ParsedEvent<'_>) {
        println!(
            "[{}] {}/{}: {}",
            event.log_level(),
            event.event_namespace(),
            event.name(),
            event.message()
        );
        let description = event.description();
        if !description.is_empty() {
            println!("    {}", description);
        }
    }

    fn handle_unknown_event(&mut self, id: u32) {
        warn!("event 0x{:08x} has no definition, dropping", id);
    }

    fn error(&mut self, num_lost: u16) {
        warn!("{} events lost for good", num_lost);
    }
}

async fn replay(cfg: &Config, capture: &str, follow: bool) -> Result<()> {
    let store = Arc::new(load_store(cfg)?);
    let mut proto = ReceiveProtocol::new(
        store,
        cfg.peer.system_id,
        cfg.peer.component_id,
        cfg.station.system_id,
        cfg.station.component_id,
        PrintHandler,
    );

    let f = tokio::fs::File::open(capture)
        .await
        .with_context(|| format!("open capture {}", capture))?;
    let mut reader = BufReader::new(f);
    let mut line = String::new();

    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            if !follow {
                break;
            }
            // EOF: wait for the capture to grow
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: CaptureRecord = match serde_json::from_str(trimmed) {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping malformed capture line: {}", e);
                continue;
            }
        };
        match decode_record(record, cfg.peer.system_id) {
            Ok((envelope, message)) => proto.process_message(&envelope, &message),
            Err(e) => warn!("skipping capture line: {:#}", e),
        }
    }

    info!("replay: done");
    Ok(())
}
