use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use tracing::{info, warn};

mod config;
mod script;

use config::ClientConfig;
use script::EditScript;
use vox_core::octal::point_to_voxel;
use vox_core::types::{NodeId, NodeKind};
use vox_sender::{EditPacketSender, JurisdictionMaps, NodeList};
use vox_transport::{PacketSink, UdpSink};

type UdpSender = EditPacketSender<NodeList<std::net::SocketAddr>, UdpSink>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream an edit script to the configured voxel servers (default)
    Run {
        /// TOML edit script; without one the client only idles
        #[arg(long, short)]
        script: Option<PathBuf>,
    },
    /// Print the resolved configuration
    Config,
    /// Print the octal code of a voxel as hex
    Locate { x: f32, y: f32, z: f32, s: f32 },
}

fn main() -> Result<()> {
    let filter = std::env::var("VOX_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Config) => {
            let config = ClientConfig::new(cli.config).context("failed to load config")?;
            println!("{config:#?}");
            Ok(())
        }
        Some(Commands::Locate { x, y, z, s }) => {
            let code = point_to_voxel(x, y, z, s)?;
            println!("{code}");
            Ok(())
        }
        Some(Commands::Run { script }) => run(cli.config, script),
        None => run(cli.config, None),
    }
}

fn load_jurisdictions(config: &ClientConfig) -> Result<Option<JurisdictionMaps>> {
    let Some(path) = &config.jurisdiction_path else {
        return Ok(None);
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading jurisdiction file {}", path.display()))?;
    let maps = JurisdictionMaps::from_toml_str(&text)?;
    info!("loaded {} server jurisdictions from {}", maps.len(), path.display());
    Ok(Some(maps))
}

fn register_servers(registry: &NodeList<std::net::SocketAddr>, servers: &[(NodeId, std::net::SocketAddr)]) {
    for (id, addr) in servers {
        registry.add_node(*id, NodeKind::VoxelServer, Some(*addr));
        info!("registered voxel server {id} at {addr}");
    }
}

fn stream_script(sender: &UdpSender, script: &EditScript, shutdown: &AtomicBool) {
    let runs = script.runs();
    for pass in 0..script.passes() {
        for run in &runs {
            if shutdown.load(Ordering::Relaxed) {
                return;
            }
            if run.immediate {
                for detail in &run.details {
                    sender.send_edit(run.packet_type, detail);
                }
            } else {
                sender.queue_edits(run.packet_type, &run.details);
            }
        }
        info!("edit script pass {} of {} queued", pass + 1, script.passes());
    }
}

fn run(config_path: Option<PathBuf>, script_path: Option<PathBuf>) -> Result<()> {
    let config = ClientConfig::new(config_path).context("failed to load config")?;
    let servers = config.server_entries()?;
    if servers.is_empty() {
        warn!("no voxel servers configured; edits stay in the pre-server queue");
    }
    let script = match &script_path {
        Some(path) => EditScript::load(path)?,
        None => EditScript::default(),
    };

    let sink = UdpSink::bind(config.bind_addr()?, config.udp_config())?;
    info!("udp sink bound on {}", sink.local_addr()?);

    let registry = NodeList::default();
    let sender = Arc::new(EditPacketSender::new(
        registry.clone(),
        sink,
        config.sender_config(),
    )?);
    sender.set_jurisdictions(load_jurisdictions(&config)?);

    let shutdown = Arc::new(AtomicBool::new(false));
    let _ = flag::register(SIGTERM, Arc::clone(&shutdown));
    let _ = flag::register(SIGINT, Arc::clone(&shutdown));
    let stop_stepping = Arc::new(AtomicBool::new(false));

    let step_thread = {
        let sender = Arc::clone(&sender);
        let stop = Arc::clone(&stop_stepping);
        let interval = config.step_interval;
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                if let Err(err) = sender.step() {
                    warn!("send step failed: {err}");
                }
                thread::sleep(interval);
            }
        })
    };

    let discovery_thread = if config.discovery_delay.is_zero() {
        register_servers(&registry, &servers);
        None
    } else {
        let registry = registry.clone();
        let delay = config.discovery_delay;
        info!("delaying server registration by {delay:?}");
        Some(thread::spawn(move || {
            thread::sleep(delay);
            register_servers(&registry, &servers);
        }))
    };

    stream_script(&sender, &script, &shutdown);
    if let Some(handle) = discovery_thread {
        if handle.join().is_err() {
            warn!("discovery thread panicked");
        }
    }
    sender.request_flush();

    let deadline = Instant::now() + config.drain_timeout;
    while !shutdown.load(Ordering::Relaxed) && Instant::now() < deadline {
        let backlog = sender.pending_pre_server() + sender.with_sink(|sink| sink.pending_packets());
        if backlog == 0 {
            break;
        }
        thread::sleep(config.step_interval.max(Duration::from_millis(1)));
    }

    stop_stepping.store(true, Ordering::Relaxed);
    if step_thread.join().is_err() {
        warn!("step thread panicked");
    }

    let stats = sender.stats();
    let health = sender.with_sink(|sink| sink.health_snapshot());
    info!(
        packets = stats.packets_released,
        bytes = stats.bytes_released,
        captured = stats.captured,
        evicted = stats.evicted,
        dropped = stats.dropped_edits,
        sent_ok = health.outbound_send_ok,
        send_err = health.outbound_send_err,
        "edit client finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["vox-edit-client"]).expect("bare invocation");
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["vox-edit-client", "run", "--script", "edits.toml"])
            .expect("run with script");
        match cli.command {
            Some(Commands::Run { script }) => {
                assert_eq!(script, Some(PathBuf::from("edits.toml")));
            }
            _ => panic!("expected Run command"),
        }

        let cli = Cli::try_parse_from(["vox-edit-client", "-c", "client.toml", "locate", "0.5", "0.5", "0.5", "0.25"])
            .expect("locate");
        assert_eq!(cli.config, Some(PathBuf::from("client.toml")));
        match cli.command {
            Some(Commands::Locate { s, .. }) => assert_eq!(s, 0.25),
            _ => panic!("expected Locate command"),
        }
    }

    #[test]
    fn missing_jurisdiction_path_means_broadcast() {
        let config = ClientConfig::new(None).expect("default config");
        assert!(load_jurisdictions(&config).expect("no file to read").is_none());
    }

    #[test]
    fn script_streams_into_the_pre_server_queue_without_servers() {
        let sink = UdpSink::bind("127.0.0.1:0".parse().expect("addr"), Default::default())
            .expect("bind loopback");
        let sender: UdpSender = EditPacketSender::new(NodeList::default(), sink, Default::default())
            .expect("default config");
        let script = EditScript::from_toml_str(
            r#"
            [[edit]]
            kind = "set"
            x = 0.1
            y = 0.1
            z = 0.1
            s = 0.25
            "#,
        )
        .expect("valid script");

        stream_script(&sender, &script, &AtomicBool::new(false));
        assert_eq!(sender.pending_pre_server(), 1);
    }
}
