use config::{Config, ConfigError, Environment, File};
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;
use vox_core::types::NodeId;
use vox_sender::SenderConfig;
use vox_transport::UdpSinkConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    /// Voxel servers as `node_id=host:port`.
    #[serde(deserialize_with = "deserialize_list")]
    pub servers: Vec<String>,
    pub jurisdiction_path: Option<PathBuf>,
    pub bind: String,
    #[serde(with = "humantime_serde")]
    pub step_interval: Duration,
    /// Delay before the configured servers are registered.
    #[serde(with = "humantime_serde")]
    pub discovery_delay: Duration,
    /// Upper bound on waiting for queued packets to leave after the script.
    #[serde(with = "humantime_serde")]
    pub drain_timeout: Duration,
    pub max_packet_size: usize,
    pub max_pending_messages: usize,
    pub sending_enabled: bool,
    pub packets_per_step: usize,
    pub max_queued_packets: usize,
}

fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ListVisitor;

    impl<'de> Visitor<'de> for ListVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a sequence of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value
                .split(|c| c == ',' || c == ';')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect())
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: de::SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(element) = seq.next_element()? {
                vec.push(element);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(ListVisitor)
}

/// Parses one `node_id=host:port` entry.
pub fn parse_server_entry(entry: &str) -> Result<(NodeId, SocketAddr), ConfigError> {
    let (id, addr) = entry
        .split_once('=')
        .ok_or_else(|| ConfigError::Message(format!("server entry `{entry}` lacks `id=`")))?;
    let id = id
        .trim()
        .parse::<u16>()
        .map_err(|err| ConfigError::Message(format!("server id in `{entry}`: {err}")))?;
    let addr = addr
        .trim()
        .to_socket_addrs()
        .map_err(|err| ConfigError::Message(format!("server address in `{entry}`: {err}")))?
        .next()
        .ok_or_else(|| ConfigError::Message(format!("server address in `{entry}` resolved to nothing")))?;
    Ok((NodeId(id), addr))
}

impl ClientConfig {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let defaults = SenderConfig::default();
        let udp = UdpSinkConfig::default();
        let mut builder = Config::builder()
            .set_default("servers", Vec::<String>::new())?
            .set_default("jurisdiction_path", None::<String>)?
            .set_default("bind", "0.0.0.0:0")?
            .set_default("step_interval", "10ms")?
            .set_default("discovery_delay", "0s")?
            .set_default("drain_timeout", "5s")?
            .set_default("max_packet_size", defaults.max_packet_size as u64)?
            .set_default("max_pending_messages", defaults.max_pending_messages as u64)?
            .set_default("sending_enabled", defaults.sending_enabled)?
            .set_default("packets_per_step", udp.packets_per_step as u64)?
            .set_default("max_queued_packets", udp.max_queued_packets as u64)?;

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(Environment::with_prefix("VOX_CLIENT").try_parsing(true));

        builder.build()?.try_deserialize()
    }

    pub fn server_entries(&self) -> Result<Vec<(NodeId, SocketAddr)>, ConfigError> {
        self.servers.iter().map(|s| parse_server_entry(s)).collect()
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|err| ConfigError::Message(format!("bind address `{}`: {err}", self.bind)))
    }

    pub fn sender_config(&self) -> SenderConfig {
        SenderConfig {
            max_packet_size: self.max_packet_size,
            max_pending_messages: self.max_pending_messages,
            sending_enabled: self.sending_enabled,
        }
    }

    pub fn udp_config(&self) -> UdpSinkConfig {
        UdpSinkConfig {
            packets_per_step: self.packets_per_step,
            max_queued_packets: self.max_queued_packets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::path::PathBuf;
    use std::sync::{Mutex, MutexGuard, PoisonError};
    use std::time::Duration;

    // Tests read and write process-wide environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_env<F>(vars: &[(&str, &str)], test: F)
    where
        F: FnOnce(),
    {
        let _guard = lock_env();
        let mut old = Vec::new();
        for (k, v) in vars {
            old.push((k.to_string(), env::var(k).ok()));
            env::set_var(k, v);
        }

        test();

        for (k, maybe_old) in old {
            match maybe_old {
                Some(val) => env::set_var(k, val),
                None => env::remove_var(k),
            }
        }
    }

    #[test]
    fn defaults_are_applied() {
        let _guard = lock_env();
        let cfg = ClientConfig::new(None).expect("failed to build config");

        assert!(cfg.jurisdiction_path.is_none());
        assert_eq!(cfg.bind, "0.0.0.0:0");
        assert_eq!(cfg.step_interval, Duration::from_millis(10));
        assert_eq!(cfg.discovery_delay, Duration::ZERO);
        assert_eq!(cfg.drain_timeout, Duration::from_secs(5));
        assert_eq!(cfg.sender_config(), SenderConfig::default());
        assert_eq!(cfg.udp_config().packets_per_step, 64);
        assert_eq!(cfg.udp_config().max_queued_packets, 4096);
    }

    #[test]
    fn env_vars_override_defaults() {
        with_env(
            &[
                ("VOX_CLIENT_MAX_PENDING_MESSAGES", "7"),
                ("VOX_CLIENT_SENDING_ENABLED", "false"),
                ("VOX_CLIENT_DISCOVERY_DELAY", "1500ms"),
            ],
            || {
                let cfg = ClientConfig::new(None).expect("failed to build config");
                assert_eq!(cfg.max_pending_messages, 7);
                assert!(!cfg.sending_enabled);
                assert_eq!(cfg.discovery_delay, Duration::from_millis(1500));
            },
        );
    }

    #[test]
    fn server_list_parses_from_env_string() {
        with_env(
            &[("VOX_CLIENT_SERVERS", "1=127.0.0.1:40102; 2=127.0.0.1:40103")],
            || {
                let cfg = ClientConfig::new(None).expect("failed to build config");
                let entries = cfg.server_entries().expect("valid entries");
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].0, NodeId(1));
                assert_eq!(entries[1].1, "127.0.0.1:40103".parse().expect("addr"));
            },
        );
    }

    #[test]
    fn malformed_server_entries_are_rejected() {
        assert!(parse_server_entry("127.0.0.1:40102").is_err());
        assert!(parse_server_entry("x=127.0.0.1:40102").is_err());
        assert!(parse_server_entry("1=not an address").is_err());
    }

    #[test]
    fn file_overrides_take_precedence_over_defaults() {
        use std::io::Write;

        let mut tmp = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(
            tmp,
            r#"
servers = ["3=127.0.0.1:40200"]
max_packet_size = 512
step_interval = "25ms"
jurisdiction_path = "maps.toml"
"#
        )
        .expect("write to temp file");

        let _guard = lock_env();
        let cfg = ClientConfig::new(Some(PathBuf::from(tmp.path()))).expect("load config");
        assert_eq!(cfg.servers, vec!["3=127.0.0.1:40200".to_string()]);
        assert_eq!(cfg.max_packet_size, 512);
        assert_eq!(cfg.step_interval, Duration::from_millis(25));
        assert_eq!(cfg.jurisdiction_path, Some(PathBuf::from("maps.toml")));
    }
}
