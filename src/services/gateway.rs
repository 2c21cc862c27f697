//! Submission gateway: hands a confirmed checkout/reservation to the backend

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{GatewayConfig, GatewayKind},
    error::{AppError, AppResult},
    models::{CheckoutMode, ReturnPolicy},
};

/// Body sent to the backend for one submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRequest {
    pub session_id: Uuid,
    pub user_id: String,
    pub equipment_id: String,
    pub mode: CheckoutMode,
    pub return_policy: Option<ReturnPolicy>,
    pub reservation_date: Option<NaiveDate>,
    pub estimated_return: Option<String>,
}

/// Backend acknowledgement
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SubmissionAck {
    #[serde(default)]
    pub reference: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReservationGateway: Send + Sync {
    async fn submit(&self, request: &SubmissionRequest) -> AppResult<SubmissionAck>;
}

/// Stands in for the backend with a fixed delay; never fails
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    latency: Duration,
}

impl SimulatedGateway {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl ReservationGateway for SimulatedGateway {
    async fn submit(&self, request: &SubmissionRequest) -> AppResult<SubmissionAck> {
        tracing::debug!(
            "Simulating {:?} submission for {} ({:?})",
            request.mode,
            request.equipment_id,
            self.latency
        );
        tokio::time::sleep(self.latency).await;
        Ok(SubmissionAck::default())
    }
}

/// POSTs submissions to the fleet backend
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    url: String,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl ReservationGateway for HttpGateway {
    async fn submit(&self, request: &SubmissionRequest) -> AppResult<SubmissionAck> {
        let response = self.client.post(&self.url).json(request).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Submission rejected by backend ({})",
                response.status()
            )));
        }

        // Some backends answer 204 with no body
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(SubmissionAck::default());
        }
        serde_json::from_str(&body)
            .map_err(|e| AppError::Upstream(format!("Invalid submission response: {}", e)))
    }
}

pub fn from_config(config: &GatewayConfig) -> AppResult<Arc<dyn ReservationGateway>> {
    Ok(match config.kind {
        GatewayKind::Simulated => Arc::new(SimulatedGateway::new(Duration::from_millis(
            config.simulated_latency_ms,
        ))),
        GatewayKind::Http => Arc::new(HttpGateway::new(config)?),
    })
}
