//! Backend client - outbound reporting adapter
//!
//! ## Responsibilities
//!
//! - POST detections, alerts and heartbeats to the backend
//! - Bounded fire-and-forget dispatch so a slow or failing backend never
//!   throttles frame processing
//!
//! Delivery is best-effort: failures are logged and dropped, never retried,
//! and never surface into the pipeline. The queue is bounded; overflow drops
//! the report with a warning instead of growing tasks without limit.

use crate::config::Settings;
use crate::error::Result;
use crate::models::{DetectionEvent, Heartbeat, NonScanAlert};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// A report queued for asynchronous delivery
#[derive(Debug, Clone)]
pub enum Report {
    Detection(DetectionEvent),
    Alert(NonScanAlert),
    Heartbeat(Heartbeat),
}

/// HTTP client for the backend ingest API
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.backend_url.clone(), settings.api_key.clone())
    }

    /// Post a detection event
    pub async fn post_detection(&self, event: &DetectionEvent) -> Result<()> {
        self.post("/api/cv/detections", event).await
    }

    /// Post a non-scan alert
    pub async fn post_alert(&self, alert: &NonScanAlert) -> Result<()> {
        self.post("/api/cv/alerts", alert).await
    }

    /// Post an engine heartbeat
    pub async fn post_heartbeat(&self, heartbeat: &Heartbeat) -> Result<()> {
        self.post("/api/cv/heartbeat", heartbeat).await
    }

    async fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .json(body)
            .send()
            .await?;

        if resp.status().is_client_error() || resp.status().is_server_error() {
            tracing::warn!(
                url = %url,
                status = %resp.status(),
                "Backend rejected report"
            );
        }
        Ok(())
    }
}

/// Cloneable handle to the bounded report queue
#[derive(Clone)]
pub struct Reporter {
    tx: mpsc::Sender<Report>,
}

impl Reporter {
    /// Spawn the delivery task draining the queue into the backend client
    pub fn spawn(client: Arc<BackendClient>, depth: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<Report>(depth);

        tokio::spawn(async move {
            while let Some(report) = rx.recv().await {
                let result = match &report {
                    Report::Detection(event) => client.post_detection(event).await,
                    Report::Alert(alert) => client.post_alert(alert).await,
                    Report::Heartbeat(hb) => client.post_heartbeat(hb).await,
                };
                if let Err(e) = result {
                    tracing::warn!(error = %e, "Report delivery failed");
                }
            }
            tracing::debug!("Report queue closed");
        });

        Self { tx }
    }

    /// Build a reporter backed by a raw channel; the caller drains the
    /// receiver. Used by embedders and tests that capture reports instead
    /// of posting them.
    pub fn channel(depth: usize) -> (Self, mpsc::Receiver<Report>) {
        let (tx, rx) = mpsc::channel(depth);
        (Self { tx }, rx)
    }

    /// Queue a report without waiting. Drops with a warning when the queue
    /// is full or closed.
    pub fn dispatch(&self, report: Report) {
        if let Err(e) = self.tx.try_send(report) {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    tracing::warn!("Report queue full, dropping report");
                }
                mpsc::error::TrySendError::Closed(_) => {
                    tracing::warn!("Report queue closed, dropping report");
                }
            }
        }
    }
}
