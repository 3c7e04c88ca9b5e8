use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::analytics::ClickHouseStore;
use crate::config::{Config, EventLogTransport};
use crate::dispatch::Dispatcher;
use crate::router::{self, Topics};
use crate::sinks::kafka::KafkaSink;
use crate::sinks::print::PrintSink;
use crate::sinks::rest::RestSink;
use crate::sinks::EventLog;
use crate::time::SystemTime;

fn create_sink(config: &Config) -> anyhow::Result<Arc<dyn EventLog + Send + Sync>> {
    if config.print_sink {
        // Print sink is only used for local debug
        info!("printing records instead of producing them");
        return Ok(Arc::new(PrintSink {}));
    }

    match config.event_log_transport {
        EventLogTransport::Rest => {
            info!("producing records through {}", config.event_log_url);
            Ok(Arc::new(RestSink::new(
                &config.event_log_url,
                config.event_log_timeout(),
            )?))
        }
        EventLogTransport::Kafka => Ok(Arc::new(KafkaSink::new(config.kafka.clone())?)),
    }
}

pub async fn serve<F>(config: Config, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let dispatcher = Dispatcher::from_arc(create_sink(&config)?);
    let store = ClickHouseStore::new(
        &config.analytics_url,
        config.analytics_user.clone(),
        config.analytics_password.clone(),
        config.analytics_timeout(),
    )?;
    let topics = Topics {
        visits: config.visits_topic.clone(),
        recordings: config.recordings_topic.clone(),
    };

    let app = router::router(
        SystemTime {},
        dispatcher.clone(),
        store,
        topics,
        config.max_body_size,
        config.export_prometheus,
    );

    info!("listening on {:?}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!(pending = dispatcher.pending(), "draining dispatches");
    dispatcher.drain().await;
    info!("all dispatches settled");

    Ok(())
}
