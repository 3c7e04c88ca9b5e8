//! Read access to the analytical store holding the processed visits and
//! recordings, through the ClickHouse HTTP interface.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::api::CaptureError;

#[async_trait]
pub trait AnalyticsStore {
    /// Runs `sql` and returns the response body untouched.
    async fn query_text(&self, sql: &str) -> Result<String, CaptureError>;

    /// Runs `sql` with bound `params` and returns one JSON value per row.
    async fn query_rows(
        &self,
        sql: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<Value>, CaptureError>;
}

#[derive(Clone)]
pub struct ClickHouseStore {
    client: reqwest::Client,
    url: Url,
    user: Option<String>,
    password: Option<String>,
}

impl ClickHouseStore {
    pub fn new(
        url: &str,
        user: Option<String>,
        password: Option<String>,
        request_timeout: Option<Duration>,
    ) -> anyhow::Result<ClickHouseStore> {
        let mut client_builder = reqwest::Client::builder().user_agent("edge-capture");
        if let Some(timeout) = request_timeout {
            client_builder = client_builder.timeout(timeout);
        }

        Ok(ClickHouseStore {
            client: client_builder.build()?,
            url: Url::parse(url)?,
            user,
            password,
        })
    }

    async fn execute(
        &self,
        sql: &str,
        params: &[(&str, &str)],
        format: Option<&str>,
    ) -> Result<String, CaptureError> {
        let mut url = self.url.clone();
        {
            let mut query = url.query_pairs_mut();
            if let Some(format) = format {
                query.append_pair("default_format", format);
            }
            for (name, value) in params {
                query.append_pair(&format!("param_{name}"), value);
            }
        }

        let mut request = self.client.post(url).body(sql.to_string());
        if let Some(user) = &self.user {
            request = request.basic_auth(user, self.password.as_ref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| CaptureError::TransportFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptureError::UpstreamNon2xx(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| CaptureError::TransportFailure(e.to_string()))
    }
}

#[async_trait]
impl AnalyticsStore for ClickHouseStore {
    #[instrument(skip(self))]
    async fn query_text(&self, sql: &str) -> Result<String, CaptureError> {
        self.execute(sql, &[], None).await
    }

    #[instrument(skip(self))]
    async fn query_rows(
        &self,
        sql: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<Value>, CaptureError> {
        let body = self.execute(sql, params, Some("JSONEachRow")).await?;
        let rows = parse_rows(&body)?;
        debug!(rows = rows.len(), "query returned");
        Ok(rows)
    }
}

fn parse_rows(body: &str) -> Result<Vec<Value>, CaptureError> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line)
                .map_err(|e| CaptureError::TransportFailure(format!("unreadable row: {e}")))
        })
        .collect()
}
