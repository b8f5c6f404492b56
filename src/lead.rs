//! Lead webhook forwarder.
//!
//! `POST /consult` relays the submitted JSON body to a spreadsheet-backed
//! webhook (`[lead].webhook_url` or `LEAD_WEBHOOK_URL`) and reports whether
//! the webhook accepted it. The webhook answers with a JSON object that
//! carries `ok:false` and an `error` message when it rejects a lead.

use anyhow::Result;
use serde_json::Value;
use std::time::Duration;

use targeting_finder_core::lead::LeadForm;

use crate::client::HttpFetcher;
use crate::config::{Config, LeadConfig};

/// Message shown once a lead has been recorded.
pub const THANKS: &str = "Thanks! Your message has been sent.";

/// Why a lead was not recorded.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("Missing LEAD_WEBHOOK_URL")]
    MissingWebhook,
    #[error("{0}")]
    Transport(String),
    /// The webhook answered but did not accept the lead.
    #[error("{0}")]
    Rejected(String),
}

/// Relays lead payloads to the configured webhook.
#[derive(Clone)]
pub struct LeadForwarder {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl LeadForwarder {
    pub fn new(config: &LeadConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            webhook_url: config.webhook_url.clone(),
        })
    }

    /// POST `body` to the webhook and interpret its reply.
    pub async fn forward(&self, body: &Value) -> Result<(), ForwardError> {
        let url = self
            .webhook_url
            .as_deref()
            .ok_or(ForwardError::MissingWebhook)?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ForwardError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ForwardError::Transport(e.without_url().to_string()))?;

        interpret_reply(status.is_success(), &text)
    }
}

/// Validate `form` and submit it, through `server` when given or straight
/// to the webhook otherwise.
pub async fn run_consult(config: &Config, form: &LeadForm, server: Option<&str>) -> Result<()> {
    let payload = form.validate(&config.lead.source)?;
    tracing::debug!(service = %payload.service, "submitting lead");

    match server {
        Some(url) => {
            let client = HttpFetcher::new(url, Duration::from_secs(config.lead.timeout_secs))?;
            client.submit_lead(&payload).await?;
        }
        None => {
            let forwarder = LeadForwarder::new(&config.lead)?;
            forwarder.forward(&serde_json::to_value(&payload)?).await?;
        }
    }

    println!("{}", THANKS);
    Ok(())
}

/// Decide the outcome from the webhook's status and body.
fn interpret_reply(success: bool, text: &str) -> Result<(), ForwardError> {
    let reply: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => {
            return Err(ForwardError::Rejected(
                "Invalid JSON from Apps Script".to_string(),
            ))
        }
    };

    let refused = reply.get("ok").and_then(Value::as_bool) == Some(false);
    if !success || refused {
        let message = reply
            .get("error")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or("Apps Script failed");
        return Err(ForwardError::Rejected(message.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpret_reply() {
        assert!(interpret_reply(true, r#"{"ok":true,"row":12}"#).is_ok());
        assert!(interpret_reply(true, r#"{}"#).is_ok());

        let err = interpret_reply(true, r#"{"ok":false,"error":"Sheet locked"}"#).unwrap_err();
        assert_eq!(err.to_string(), "Sheet locked");

        let err = interpret_reply(false, r#"{"ok":true}"#).unwrap_err();
        assert_eq!(err.to_string(), "Apps Script failed");

        let err = interpret_reply(true, "<html>moved</html>").unwrap_err();
        assert_eq!(err.to_string(), "Invalid JSON from Apps Script");
    }

    #[tokio::test]
    async fn test_consult_validates_before_sending() {
        let form = LeadForm {
            first_name: "Asha".to_string(),
            ..LeadForm::default()
        };
        let err = run_consult(&Config::default(), &form, None).await.unwrap_err();
        assert_eq!(err.to_string(), "Please select at least one contact method.");
    }

    #[tokio::test]
    async fn test_missing_webhook() {
        let forwarder = LeadForwarder::new(&LeadConfig::default()).unwrap();
        let err = forwarder
            .forward(&serde_json::json!({"name": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ForwardError::MissingWebhook));
    }
}
