//! [`OneSignalClient`] — the reqwest-backed [`Notifier`] implementation.

use std::time::Duration;

use mayday_core::notify::{DispatchOutcome, Notifier, Push};

use crate::payload::{NotificationReceipt, NotificationRequest};

/// Production endpoint for batched notification creation.
pub const DEFAULT_API_URL: &str = "https://api.onesignal.com/notifications";

/// Bound on the outbound call; past it the dispatch is treated as a
/// transport failure.
const DISPATCH_TIMEOUT_SECS: u64 = 30;

// ─── Configuration ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OneSignalConfig {
  /// OneSignal application id.
  pub app_id:  String,
  /// REST API key. `None` means the provider is not configured; dispatches
  /// then yield an error outcome instead of reaching the network.
  pub api_key: Option<String>,
  /// Endpoint override, used by tests to point at a local server.
  pub api_url: String,
}

impl Default for OneSignalConfig {
  fn default() -> Self {
    Self {
      app_id:  String::new(),
      api_key: None,
      api_url: DEFAULT_API_URL.to_owned(),
    }
  }
}

// ─── Client ───────────────────────────────────────────────────────────────────

/// Cloning is cheap — the inner reqwest client is reference-counted.
#[derive(Clone)]
pub struct OneSignalClient {
  config: OneSignalConfig,
  http:   reqwest::Client,
}

impl OneSignalClient {
  pub fn new(config: OneSignalConfig) -> Self {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(DISPATCH_TIMEOUT_SECS))
      .build()
      .unwrap_or_default();
    Self { config, http }
  }

  async fn send(&self, push: &Push) -> DispatchOutcome {
    let Some(api_key) = &self.config.api_key else {
      return DispatchOutcome::Error {
        message: "OneSignal API key not configured".to_owned(),
      };
    };

    let request = NotificationRequest::from_push(&self.config.app_id, push);
    let sent = self
      .http
      .post(&self.config.api_url)
      .header("Authorization", format!("Key {api_key}"))
      .json(&request)
      .send()
      .await;

    let response = match sent {
      Ok(r) => r,
      Err(e) => {
        return DispatchOutcome::Error { message: format!("transport failure: {e}") };
      }
    };

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return DispatchOutcome::Error {
        message: format!("provider returned {status}: {body}"),
      };
    }

    match response.json::<NotificationReceipt>().await {
      Ok(receipt) => DispatchOutcome::Success {
        notification_id: receipt.id.unwrap_or_else(|| "unknown".to_owned()),
        accepted:        receipt.recipients.unwrap_or(0),
      },
      Err(e) => DispatchOutcome::Error {
        message: format!("malformed provider response: {e}"),
      },
    }
  }
}

impl Notifier for OneSignalClient {
  async fn dispatch(&self, push: &Push) -> DispatchOutcome {
    let outcome = self.send(push).await;
    tracing::debug!(
      recipients = push.recipients.len(),
      status = outcome.status_str(),
      "push dispatch finished"
    );
    outcome
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
