use std::net::SocketAddr;
use std::time::Duration;

use envconfig::Envconfig;
use tracing::Level;

#[derive(Debug, PartialEq, Clone)]
pub enum EventLogTransport {
    Rest,
    Kafka,
}

impl std::str::FromStr for EventLogTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_ref() {
            "rest" => Ok(EventLogTransport::Rest),
            "kafka" => Ok(EventLogTransport::Kafka),
            _ => Err(format!("Unknown event log transport: {s}")),
        }
    }
}

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(default = "false")]
    pub print_sink: bool,

    #[envconfig(default = "127.0.0.1:3000")]
    pub address: SocketAddr,

    #[envconfig(default = "rest")]
    pub event_log_transport: EventLogTransport,

    #[envconfig(default = "http://localhost:8082")]
    pub event_log_url: String,

    #[envconfig(default = "0")]
    pub event_log_timeout_ms: u64, // 0 disables the timeout

    // Full rrweb snapshots of large pages run to tens of MiB
    #[envconfig(default = "67108864")]
    pub max_body_size: usize,

    #[envconfig(default = "website_visits")]
    pub visits_topic: String,

    #[envconfig(default = "session_recordings")]
    pub recordings_topic: String,

    #[envconfig(default = "http://localhost:8123")]
    pub analytics_url: String,
    pub analytics_user: Option<String>,
    pub analytics_password: Option<String>,

    #[envconfig(default = "10000")]
    pub analytics_timeout_ms: u64,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,

    pub otel_url: Option<String>,

    #[envconfig(default = "1.0")]
    pub otel_sampling_rate: f64,

    #[envconfig(default = "edge-capture")]
    pub otel_service_name: String,

    // Used for integration tests
    #[envconfig(default = "true")]
    pub export_prometheus: bool,

    #[envconfig(default = "info")]
    pub log_level: Level,
}

impl Config {
    pub fn event_log_timeout(&self) -> Option<Duration> {
        match self.event_log_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn analytics_timeout(&self) -> Option<Duration> {
        match self.analytics_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

#[derive(Envconfig, Clone)]
pub struct KafkaConfig {
    #[envconfig(default = "20")]
    pub kafka_producer_linger_ms: u32, // Maximum time between producer batches during low traffic
    #[envconfig(default = "400")]
    pub kafka_producer_queue_mib: u32, // Size of the in-memory producer queue in mebibytes
    #[envconfig(default = "20000")]
    pub kafka_message_timeout_ms: u32, // Time before we stop retrying producing a message: 20 seconds
    #[envconfig(default = "1000000")]
    pub kafka_producer_message_max_bytes: u32,
    #[envconfig(default = "none")]
    pub kafka_compression_codec: String, // none, gzip, snappy, lz4, zstd
    #[envconfig(default = "localhost:9092")]
    pub kafka_hosts: String,
    #[envconfig(default = "")]
    pub kafka_client_id: String,
}
