use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, name: &str, data: Value) -> Result<()>;
}

/// Posts named events to the notification pipeline's ingestion endpoint.
/// Delivery is best-effort; callers decide whether to await or detach it.
pub struct HttpEventSink {
    client: Client,
    endpoint: String,
}

impl HttpEventSink {
    pub fn new(ingest_url: &str, ingest_key: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/e/{}", ingest_url.trim_end_matches('/'), ingest_key),
        }
    }

    pub fn from_env() -> Result<Self> {
        let url = env::var("EVENTS_INGEST_URL").context("EVENTS_INGEST_URL not set")?;
        let key = env::var("EVENTS_INGEST_KEY").context("EVENTS_INGEST_KEY not set")?;
        Ok(Self::new(&url, &key))
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    async fn send(&self, name: &str, data: Value) -> Result<()> {
        let res = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "name": name, "data": data }))
            .send()
            .await
            .context("event request failed")?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow!("event ingestion returned {status}: {text}"));
        }
        Ok(())
    }
}
