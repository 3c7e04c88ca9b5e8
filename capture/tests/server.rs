use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use envconfig::Envconfig;
use httpmock::prelude::*;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Notify;

#[path = "common/utils.rs"]
mod test_utils;
use test_utils::setup_tracing;

use edge_capture::config::Config;
use edge_capture::server::serve;

fn config_for(event_log_url: &str) -> Config {
    let env: HashMap<String, String> = [
        ("EVENT_LOG_URL", event_log_url),
        ("EVENT_LOG_TIMEOUT_MS", "2000"),
        ("EXPORT_PROMETHEUS", "false"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    Config::init_from_hashmap(&env).unwrap()
}

#[tokio::test]
async fn visits_reach_the_rest_proxy_before_shutdown_completes() {
    setup_tracing();
    let proxy = MockServer::start_async().await;
    let produce = proxy
        .mock_async(|when, then| {
            when.method(POST)
                .path("/topics/website_visits")
                .header("content-type", "application/vnd.kafka.json.v2+json")
                .json_body_partial(r#"{"records": [{"partition": 0}]}"#);
            then.status(200).delay(Duration::from_millis(300));
        })
        .await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let notify = Arc::new(Notify::new());
    let shutdown = notify.clone();
    let server = tokio::spawn(serve(config_for(&proxy.base_url()), listener, async move {
        shutdown.notified().await
    }));

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/track"))
        .json(&json!({"url": "https://example.com/"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "Ok");

    // The proxy is still delaying its answer: shutdown must wait for it
    notify.notify_one();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop")
        .unwrap()
        .unwrap();

    produce.assert_async().await;
}
