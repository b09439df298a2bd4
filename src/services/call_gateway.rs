use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;
use tracing::debug;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::domain::live_call::CallKind;

/// Credentials for joining a call channel, minted by the hosted token
/// function. Opaque to everything but the call SDK.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallTicket {
    pub channel: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Port to the external token service. The real implementation talks HTTP;
/// tests use the generated mock.
#[automock]
#[async_trait]
pub trait CallGateway: Send + Sync {
    async fn issue_token(
        &self,
        channel: &str,
        expert_id: Uuid,
        kind: CallKind,
    ) -> Result<CallTicket>;
}

pub struct HttpCallGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    channel: &'a str,
    expert_id: Uuid,
    call_type: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
    expires_in_secs: i64,
}

impl HttpCallGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client for call gateway")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl CallGateway for HttpCallGateway {
    async fn issue_token(
        &self,
        channel: &str,
        expert_id: Uuid,
        kind: CallKind,
    ) -> Result<CallTicket> {
        debug!("Requesting call token for channel {}", channel);

        let mut request = self.client.post(&self.endpoint).json(&TokenRequest {
            channel,
            expert_id,
            call_type: kind.as_str(),
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .context("call token request failed")?
            .error_for_status()
            .context("call token service returned an error status")?;
        let body: TokenResponse = response
            .json()
            .await
            .context("call token response was not valid JSON")?;

        Ok(CallTicket {
            channel: channel.to_string(),
            token: body.token,
            expires_at: Utc::now() + Duration::seconds(body.expires_in_secs),
        })
    }
}
