//! Webhook actions.
//!
//! Builds the outbound request from the action config and sends it through
//! a [`WebhookClient`]. [`ReqwestWebhookClient`] is the default transport.
//! Supports GET, POST, PUT, PATCH and DELETE; POST/PUT/PATCH carry the
//! JSON payload as the request body.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::millis;
use crate::errors::ActionError;
use crate::traits::{WebhookClient, WebhookRequest, WebhookResponse};
use crate::types::{Action, Event, Trigger};

/// Methods a webhook action may use.
pub const WEBHOOK_METHODS: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

/// Build the request for `action`. `method` defaults to POST.
pub fn build_request(
    trigger: &Trigger,
    action: &Action,
    event: &Event,
) -> Result<WebhookRequest, ActionError> {
    let url = action
        .config_str("url")
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ActionError::Config {
            message: "missing required config field: url".into(),
        })?
        .to_string();

    let method = action.config_str("method").unwrap_or("POST").to_uppercase();
    if !WEBHOOK_METHODS.contains(&method.as_str()) {
        return Err(ActionError::Config {
            message: format!("unsupported webhook method: {method}"),
        });
    }

    let headers: Vec<(String, String)> = action
        .config
        .get("headers")
        .and_then(|v| v.as_object())
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    let body = matches!(method.as_str(), "POST" | "PUT" | "PATCH")
        .then(|| payload(trigger, action, event));

    Ok(WebhookRequest {
        url,
        method,
        headers,
        body,
    })
}

/// JSON body: the event plus identifying trigger and action metadata.
pub fn payload(trigger: &Trigger, action: &Action, event: &Event) -> Value {
    json!({
        "event": event,
        "trigger": { "id": trigger.id, "name": trigger.name },
        "action": { "id": action.id, "name": action.name },
    })
}

/// Send `request` and classify the response. Any non-2xx status is a
/// (recoverable) failure.
pub async fn deliver(
    client: &dyn WebhookClient,
    request: WebhookRequest,
) -> Result<String, ActionError> {
    let url = request.url.clone();
    let response = client.send(request).await?;
    if (200..300).contains(&response.status) {
        Ok(format!("HTTP {} from {url}", response.status))
    } else {
        Err(ActionError::Webhook {
            message: format!("HTTP {} from {url}", response.status),
        })
    }
}

/// [`WebhookClient`] backed by `reqwest`, with a per-request timeout.
pub struct ReqwestWebhookClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl ReqwestWebhookClient {
    pub fn new(timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), timeout)
    }

    /// Reuse an existing client (connection pool, proxy settings, ...).
    pub fn with_client(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }
}

#[async_trait]
impl WebhookClient for ReqwestWebhookClient {
    async fn send(&self, request: WebhookRequest) -> Result<WebhookResponse, ActionError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes()).map_err(|_| {
            ActionError::Config {
                message: format!("unsupported webhook method: {}", request.method),
            }
        })?;

        let mut builder = self
            .http
            .request(method, &request.url)
            .timeout(self.timeout);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ActionError::Timeout {
                    elapsed_ms: millis(self.timeout),
                }
            } else {
                ActionError::Webhook {
                    message: format!("HTTP request failed: {e}"),
                }
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(WebhookResponse { status, body })
    }
}
