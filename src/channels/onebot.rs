//! OneBot v11 HTTP API transport (`send_group_msg` / `send_private_msg`).

use super::traits::{DeliveryError, DeliveryTransport, TargetKind};
use crate::config::TransportConfig;
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// OneBot `retcode` for bad parameters, which includes unknown targets.
const RETCODE_BAD_PARAMS: i64 = 100;

#[derive(Debug, Deserialize)]
struct ActionResponse {
    status: String,
    #[serde(default)]
    retcode: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    wording: Option<String>,
}

/// Delivers through a OneBot v11 implementation's HTTP API.
#[derive(Debug)]
pub struct OneBotTransport {
    base_url: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl OneBotTransport {
    /// # Errors
    ///
    /// Returns [`MonitorError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MonitorError::Config(format!("failed to build OneBot client: {e}")))?;
        Ok(Self {
            base_url: config.onebot_url.trim_end_matches('/').to_owned(),
            access_token: config
                .access_token
                .clone()
                .filter(|token| !token.trim().is_empty()),
            client,
        })
    }

    async fn call(
        &self,
        action: &str,
        kind: TargetKind,
        id: &str,
        text: &str,
    ) -> std::result::Result<(), DeliveryError> {
        let invalid = || DeliveryError::InvalidTarget {
            kind,
            id: id.to_owned(),
        };
        let numeric_id: i64 = id.trim().parse().map_err(|_| invalid())?;
        let id_field = match kind {
            TargetKind::Group => "group_id",
            TargetKind::User => "user_id",
        };
        let mut body = serde_json::Map::new();
        body.insert(id_field.to_owned(), numeric_id.into());
        body.insert("message".to_owned(), text.into());

        let mut request = self
            .client
            .post(format!("{}/{action}", self.base_url))
            .json(&body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::Unavailable(format!("{action}: {e}")))?;
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(DeliveryError::Rejected(format!(
                "{action}: access token refused ({status})"
            )));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Unavailable(format!(
                "{action} failed ({status}): {detail}"
            )));
        }

        let reply: ActionResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::Unavailable(format!("{action}: bad response: {e}")))?;
        match reply.status.as_str() {
            "ok" | "async" => Ok(()),
            _ if reply.retcode == RETCODE_BAD_PARAMS => Err(invalid()),
            _ => Err(DeliveryError::Rejected(format!(
                "{action} retcode {}: {}",
                reply.retcode,
                reply.wording.or(reply.msg).unwrap_or_default()
            ))),
        }
    }
}

#[async_trait]
impl DeliveryTransport for OneBotTransport {
    fn id(&self) -> &'static str {
        "onebot"
    }

    async fn send_group_message(
        &self,
        group_id: &str,
        text: &str,
    ) -> std::result::Result<(), DeliveryError> {
        self.call("send_group_msg", TargetKind::Group, group_id, text)
            .await
    }

    async fn send_individual_message(
        &self,
        user_id: &str,
        text: &str,
    ) -> std::result::Result<(), DeliveryError> {
        self.call("send_private_msg", TargetKind::User, user_id, text)
            .await
    }
}
