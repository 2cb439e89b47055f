//! HTTP bridge to the alarm source.
//!
//! The alarm server itself speaks a proprietary protocol; a small gateway
//! exposes it as JSON over HTTP. This module is the thin I/O wrapper the
//! poll loop drives through the [`AlarmSource`] trait: `connect` probes the
//! gateway once at startup, `execute` runs one query and buffers its rows,
//! `fetch_record` materializes them as an [`AlarmRecord`].

use crate::config::SourceConfig;
use crate::core::{AlarmEntry, AlarmRecord, AlarmSource, SourceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
struct QueryRequest<'a> {
    database: &'a str,
    query: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse {
    rows: Vec<AlarmEntry>,
}

/// [`AlarmSource`] implementation over the JSON gateway.
pub struct HttpAlarmSource {
    client: reqwest::Client,
    base_url: String,
    database: String,
    connected: bool,
    pending: Option<Vec<AlarmEntry>>,
}

impl HttpAlarmSource {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.connect_timeout_seconds))
            .build()
            .map_err(|e| SourceError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            database: config.database.clone(),
            connected: false,
            pending: None,
        })
    }
}

#[async_trait]
impl AlarmSource for HttpAlarmSource {
    async fn connect(&mut self) -> Result<(), SourceError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Connection(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SourceError::Connection(format!(
                "gateway health check returned {}",
                response.status()
            )));
        }
        self.connected = true;
        debug!(url, "Alarm gateway connection established");
        Ok(())
    }

    async fn execute(&mut self, query: &str) -> Result<(), SourceError> {
        if !self.connected {
            return Err(SourceError::Query("source is not connected".to_string()));
        }
        let url = format!("{}/query", self.base_url);
        let request = QueryRequest {
            database: &self.database,
            query,
        };
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SourceError::Query(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SourceError::Query(format!(
                "gateway query returned {}",
                response.status()
            )));
        }
        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Query(e.to_string()))?;
        debug!(rows = body.rows.len(), "Query executed");
        self.pending = Some(body.rows);
        Ok(())
    }

    async fn fetch_record(&mut self) -> Result<AlarmRecord, SourceError> {
        let rows = self
            .pending
            .take()
            .ok_or_else(|| SourceError::Query("no query result buffered".to_string()))?;
        Ok(rows.into())
    }

    async fn close(&mut self) {
        self.pending = None;
        self.connected = false;
    }
}
