use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use broker_mqtt::{BrokerAddress, MqttSettings};
use relay_engine::RelaySettings;

use crate::error::ServerError;

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Parser, Debug)]
#[command(
    name = "udp-mqtt-relay",
    version,
    about = "Relays topic-tagged UDP datagrams to an MQTT broker"
)]
pub struct Cli {
    /// The port to listen on for incoming datagrams
    #[arg(short = 'p', long = "listenPort", env = "RELAY_LISTEN_PORT")]
    pub listen_port: Option<u16>,

    /// The target MQTT server address
    #[arg(short = 'm', long = "mqttServer", env = "RELAY_MQTT_SERVER")]
    pub mqtt_server: Option<String>,

    /// Path to an optional TOML config file
    #[arg(long, default_value = "relay.toml", env = "RELAY_CONFIG")]
    pub config: String,
}

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub listen_port: Option<u16>,
    pub mqtt_server: Option<String>,
    pub bind_host: Option<String>,
    pub heartbeat_interval_ms: Option<u64>,
    pub stats_prefix: Option<String>,
    /// 0 = wait for the broker forever.
    pub ready_timeout_secs: Option<u64>,
    pub client_id: Option<String>,
    pub keep_alive_secs: Option<u64>,
    pub publish_queue: Option<usize>,
    pub reconnect_delay_ms: Option<u64>,
}

impl FileConfig {
    /// A missing file means defaults; an unreadable or invalid one is an error.
    pub fn load(path: &str) -> Result<Self, ServerError> {
        if !std::path::Path::new(path).exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config { context: "read", detail: format!("'{path}': {e}") })?;
        toml::from_str(&content)
            .map_err(|e| ServerError::Config { context: "parse", detail: format!("'{path}': {e}") })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Effective — merged config
// ═══════════════════════════════════════════════════════════════

/// Итоговая конфигурация после мержа: relay.toml < env/CLI
#[derive(Debug, Clone)]
pub struct Effective {
    pub listen_addr: SocketAddr,
    pub mqtt: MqttSettings,
    pub heartbeat_interval: Duration,
    pub stats_prefix: String,
    pub ready_timeout: Option<Duration>,
}

impl Effective {
    pub fn new(cli: &Cli) -> Result<Self, ServerError> {
        let file = FileConfig::load(&cli.config)?;
        Self::merge(cli.listen_port, cli.mqtt_server.clone(), file)
    }

    pub fn merge(
        listen_port: Option<u16>,
        mqtt_server: Option<String>,
        file: FileConfig,
    ) -> Result<Self, ServerError> {
        let listen_port = listen_port.or(file.listen_port).ok_or(ServerError::Config {
            context: "listenPort",
            detail: "Must specify a listen port.".into(),
        })?;
        let mqtt_server = mqtt_server.or(file.mqtt_server).ok_or(ServerError::Config {
            context: "mqttServer",
            detail: "Must specify a target MQTT server address.".into(),
        })?;

        let bind_host = file.bind_host.as_deref().unwrap_or("0.0.0.0");
        let bind_ip: IpAddr = bind_host.parse().map_err(|e| ServerError::Config {
            context: "bind_host",
            detail: format!("'{bind_host}': {e}"),
        })?;

        let heartbeat_ms = file.heartbeat_interval_ms.unwrap_or(1000);
        if heartbeat_ms == 0 {
            return Err(ServerError::Config {
                context: "heartbeat_interval_ms",
                detail: "must be greater than 0".into(),
            });
        }

        let client_id = file
            .client_id
            .unwrap_or_else(|| format!("udp-mqtt-relay-{}", std::process::id()));
        if client_id.is_empty() || client_id.starts_with(' ') {
            return Err(ServerError::Config {
                context: "client_id",
                detail: format!("'{client_id}' is not a valid MQTT client id"),
            });
        }

        let publish_queue = file.publish_queue.unwrap_or(1024);
        if publish_queue == 0 {
            return Err(ServerError::Config {
                context: "publish_queue",
                detail: "must be greater than 0".into(),
            });
        }

        let address: BrokerAddress = mqtt_server.parse()?;
        let mut mqtt = MqttSettings::new(address, client_id);
        mqtt.keep_alive = Duration::from_secs(file.keep_alive_secs.unwrap_or(30));
        mqtt.queue_capacity = publish_queue;
        mqtt.reconnect_delay = Duration::from_millis(file.reconnect_delay_ms.unwrap_or(1000));

        let ready_timeout = match file.ready_timeout_secs.unwrap_or(30) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            listen_addr: SocketAddr::new(bind_ip, listen_port),
            mqtt,
            heartbeat_interval: Duration::from_millis(heartbeat_ms),
            stats_prefix: file
                .stats_prefix
                .unwrap_or_else(|| relay_engine::heartbeat::DEFAULT_STATS_PREFIX.to_string()),
            ready_timeout,
        })
    }

    pub fn relay_settings(&self) -> RelaySettings {
        let mut settings = RelaySettings::new(self.listen_addr);
        settings.heartbeat_interval = self.heartbeat_interval;
        settings.stats_prefix = self.stats_prefix.clone();
        settings.ready_timeout = self.ready_timeout;
        settings
    }
}
