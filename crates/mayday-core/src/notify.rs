//! The push-notification boundary: what the engine asks a provider to send,
//! and the normalized outcome it gets back.
//!
//! Delivery is fire-and-forget from the engine's perspective. A provider
//! implementation never returns a hard error — credentials missing, timeouts
//! and bad responses are all folded into [`DispatchOutcome::Error`] so the
//! alert record can still be persisted.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Notification title for an SOS broadcast.
pub const SOS_TITLE: &str = "\u{1F198} SOS Alert!";
/// Notification title for a cancellation notice.
pub const CANCEL_TITLE: &str = "\u{2705} SOS Cancelled";
/// Body of the cancellation notice.
pub const CANCEL_BODY: &str = "The SOS signal was cancelled by the sender";

// ─── Payload ─────────────────────────────────────────────────────────────────

/// Metadata attached to every dispatch. The tag doubles as the alert type
/// the mobile client switches on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "alert_type", rename_all = "snake_case")]
pub enum PushData {
  Sos {
    sender_id: String,
    /// Geographic origin, stringified for the provider's data payload.
    latitude:  String,
    longitude: String,
    timestamp: DateTime<Utc>,
  },
  SosCancelled {
    original_alert_id: String,
  },
}

/// One batched request to the push provider: every recipient alias at once,
/// not one call per recipient.
#[derive(Debug, Clone)]
pub struct Push {
  /// Provider aliases (external ids) of all recipients.
  pub recipients: Vec<String>,
  pub title:      String,
  pub body:       String,
  pub data:       PushData,
}

impl Push {
  /// The SOS broadcast. Carries the sender's origin and the two fixed
  /// response actions ("I'm coming to help" / "False alarm").
  pub fn sos(
    recipients: Vec<String>,
    message: &str,
    sender_id: &str,
    origin: GeoPoint,
    at: DateTime<Utc>,
  ) -> Self {
    Self {
      recipients,
      title: SOS_TITLE.to_owned(),
      body: message.to_owned(),
      data: PushData::Sos {
        sender_id: sender_id.to_owned(),
        latitude:  origin.latitude.to_string(),
        longitude: origin.longitude.to_string(),
        timestamp: at,
      },
    }
  }

  /// The best-effort cancellation notice. No response actions.
  pub fn cancellation(recipients: Vec<String>, original_alert_id: &str) -> Self {
    Self {
      recipients,
      title: CANCEL_TITLE.to_owned(),
      body: CANCEL_BODY.to_owned(),
      data: PushData::SosCancelled {
        original_alert_id: original_alert_id.to_owned(),
      },
    }
  }

  /// Whether the provider should attach the fixed response actions.
  pub fn wants_actions(&self) -> bool { matches!(self.data, PushData::Sos { .. }) }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// What the provider accepted — not a guarantee of on-device delivery.
/// Folded into the persisted [`Alert`](crate::alert::Alert).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
  Success {
    /// Provider-assigned notification id.
    notification_id: String,
    /// Recipient count acknowledged by the provider.
    accepted:        u32,
  },
  Error {
    /// Diagnostic message: missing credentials, timeout, non-2xx status, or
    /// a malformed provider response.
    message: String,
  },
}

impl DispatchOutcome {
  pub fn status_str(&self) -> &'static str {
    match self {
      Self::Success { .. } => "success",
      Self::Error { .. } => "error",
    }
  }

  pub fn is_success(&self) -> bool { matches!(self, Self::Success { .. }) }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the outbound push provider.
///
/// Implementations must absorb every transport-level failure into
/// [`DispatchOutcome::Error`]; the engine treats the outcome as data and
/// records it either way.
pub trait Notifier: Send + Sync {
  fn dispatch<'a>(
    &'a self,
    push: &'a Push,
  ) -> impl Future<Output = DispatchOutcome> + Send + 'a;
}
