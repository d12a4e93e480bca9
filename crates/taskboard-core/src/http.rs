use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;
use taskboard_shared::{BoardDto, FORM_CONTENT_TYPE, StateDto, StateWrite};
use tracing::{debug, instrument};

use crate::sync::Transport;

/// `reqwest` client for the three taskboard endpoints.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building HTTP client for taskboard server")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    #[instrument(skip(self))]
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let url = self.endpoint(path);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?
            .error_for_status()
            .with_context(|| format!("GET {url} returned an error status"))?;

        let body = response
            .text()
            .await
            .with_context(|| format!("failed reading body of GET {url}"))?;
        debug!(url = %url, bytes = body.len(), "fetched");

        // The server answers `{}` before anything is stored.
        let trimmed = body.trim();
        let text = if trimmed.is_empty() { "{}" } else { trimmed };
        serde_json::from_str(text).with_context(|| format!("failed parsing JSON from GET {url}"))
    }
}

impl Transport for HttpTransport {
    async fn fetch_board(&self) -> anyhow::Result<BoardDto> {
        self.get_json("/board").await
    }

    async fn fetch_state(&self) -> anyhow::Result<StateDto> {
        self.get_json("/state").await
    }

    #[instrument(skip(self, write), fields(tab = %write.tab_id, cell = %write.cell_id))]
    async fn send_state(&self, write: &StateWrite) -> anyhow::Result<()> {
        let url = self.endpoint("/state");
        self.client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(write.to_form_body())
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))?
            .error_for_status()
            .with_context(|| format!("POST {url} returned an error status"))?;
        debug!(url = %url, "sent state write");
        Ok(())
    }
}
