use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, gauge};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use rdkafka::ClientConfig;
use tracing::{debug, error, info, info_span, instrument, Instrument};

use crate::api::CaptureError;
use crate::config::KafkaConfig;
use crate::sinks::{DispatchEnvelope, EventLog, DEFAULT_PARTITION};

struct KafkaContext;

impl rdkafka::ClientContext for KafkaContext {
    fn stats(&self, stats: rdkafka::Statistics) {
        gauge!("capture_kafka_callback_queue_depth").set(stats.replyq as f64);
        gauge!("capture_kafka_producer_queue_depth").set(stats.msg_cnt as f64);
        gauge!("capture_kafka_producer_queue_depth_limit").set(stats.msg_max as f64);
        gauge!("capture_kafka_producer_queue_bytes_limit").set(stats.msg_size_max as f64);

        for (_, stats) in stats.brokers {
            let id_string = format!("{}", stats.nodeid);
            if let Some(rtt) = stats.rtt {
                gauge!(
                    "capture_kafka_produce_rtt_latency_us",
                    "quantile" => "p50",
                    "broker" => id_string.clone()
                )
                .set(rtt.p50 as f64);
                gauge!(
                    "capture_kafka_produce_rtt_latency_us",
                    "quantile" => "p99",
                    "broker" => id_string.clone()
                )
                .set(rtt.p99 as f64);
            }
            counter!(
                "capture_kafka_broker_tx_errors_total",
                "broker" => id_string
            )
            .absolute(stats.txerrs);
        }
    }
}

/// Produces records straight to the brokers, bypassing the REST proxy.
#[derive(Clone)]
pub struct KafkaSink {
    producer: FutureProducer<KafkaContext>,
}

impl KafkaSink {
    pub fn new(config: KafkaConfig) -> anyhow::Result<KafkaSink> {
        info!("connecting to Kafka brokers at {}...", config.kafka_hosts);

        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &config.kafka_hosts)
            .set("statistics.interval.ms", "10000")
            .set("linger.ms", config.kafka_producer_linger_ms.to_string())
            .set(
                "message.max.bytes",
                config.kafka_producer_message_max_bytes.to_string(),
            )
            .set(
                "message.timeout.ms",
                config.kafka_message_timeout_ms.to_string(),
            )
            .set("compression.codec", config.kafka_compression_codec)
            .set(
                "queue.buffering.max.kbytes",
                (config.kafka_producer_queue_mib * 1024).to_string(),
            );

        if !config.kafka_client_id.is_empty() {
            client_config.set("client.id", &config.kafka_client_id);
        }

        debug!("rdkafka configuration: {:?}", client_config);
        let producer: FutureProducer<KafkaContext> =
            client_config.create_with_context(KafkaContext)?;

        // Ping the cluster to make sure we can reach brokers, fail after 10 seconds
        drop(producer.client().fetch_metadata(
            Some("__consumer_offsets"),
            Timeout::After(Duration::new(10, 0)),
        )?);
        info!("connected to Kafka brokers");

        Ok(KafkaSink { producer })
    }
}

#[async_trait]
impl EventLog for KafkaSink {
    #[instrument(skip_all, fields(topic = %envelope.topic))]
    async fn send(&self, envelope: DispatchEnvelope) -> Result<(), CaptureError> {
        let record: FutureRecord<'_, str, str> = FutureRecord {
            topic: &envelope.topic,
            payload: Some(envelope.value.get()),
            partition: Some(DEFAULT_PARTITION),
            key: None,
            timestamp: None,
            headers: None,
        };

        let delivery = match self.producer.send_result(record) {
            Ok(ack) => ack,
            Err((e, _)) => {
                error!("failed to produce record: {}", e);
                return Err(CaptureError::TransportFailure(e.to_string()));
            }
        };

        match delivery.instrument(info_span!("ack_wait_one")).await {
            Err(_) => {
                // Cancelled due to timeout while retrying
                counter!("capture_kafka_produce_errors_total").increment(1);
                Err(CaptureError::TransportFailure(
                    "failed to produce to Kafka before write timeout".to_string(),
                ))
            }
            Ok(Err((err, _))) => {
                counter!("capture_kafka_produce_errors_total").increment(1);
                Err(CaptureError::TransportFailure(err.to_string()))
            }
            Ok(Ok(_)) => {
                counter!("capture_events_ingested_total", "topic" => envelope.topic).increment(1);
                Ok(())
            }
        }
    }
}
