//! Alert records and their lifecycle states.
//!
//! An alert is written once, at trigger time, with its recipient set fixed.
//! The only later mutation is the single transition into `Cancelled`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{geo::GeoPoint, notify::DispatchOutcome};

/// Sentinel `alert_id` recorded when matching produced no candidates and the
/// provider was never called.
pub const NO_RECIPIENTS_ID: &str = "no_recipients";

/// Provider id recorded when a dispatch was attempted but failed before the
/// provider assigned one.
pub const UNKNOWN_ALERT_ID: &str = "unknown";

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle state of a persisted alert.
///
/// `Dispatched` means the dispatch step completed — the provider may still
/// have reported an error; that is recorded in the alert's outcome, not
/// here. `NoRecipients` is terminal. `Dispatched` may later become
/// `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
  Dispatched,
  NoRecipients,
  Cancelled,
}

// ─── Alert ───────────────────────────────────────────────────────────────────

/// A persisted SOS alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
  /// Store-assigned primary key.
  pub id:            Uuid,
  /// Provider-assigned notification id, or [`NO_RECIPIENTS_ID`] /
  /// [`UNKNOWN_ALERT_ID`].
  pub alert_id:      String,
  pub sender_id:     String,
  pub origin:        GeoPoint,
  pub radius_meters: f64,
  pub message:       String,
  pub status:        AlertStatus,
  /// The folded dispatch result; `None` when no dispatch was attempted.
  pub outcome:       Option<DispatchOutcome>,
  /// External ids actually targeted, in candidate (distance) order. Fixed at
  /// creation, never grows.
  pub recipients:    Vec<String>,
  /// Store-assigned at creation; never changes.
  pub created_at:    DateTime<Utc>,
  pub cancelled_at:  Option<DateTime<Utc>>,
}

impl Alert {
  /// The status string reported to the caller that triggered this alert:
  /// `no_recipients`, or the provider outcome's `success` / `error`.
  pub fn dispatch_status(&self) -> &'static str {
    match (&self.status, &self.outcome) {
      (AlertStatus::NoRecipients, _) => "no_recipients",
      (_, Some(outcome)) => outcome.status_str(),
      (_, None) => "unknown",
    }
  }
}

// ─── NewAlert ────────────────────────────────────────────────────────────────

/// Input to [`crate::store::SosStore::record_alert`].
/// `id` and `created_at` are always set by the store.
#[derive(Debug, Clone)]
pub struct NewAlert {
  pub alert_id:      String,
  pub sender_id:     String,
  pub origin:        GeoPoint,
  pub radius_meters: f64,
  pub message:       String,
  pub status:        AlertStatus,
  pub outcome:       Option<DispatchOutcome>,
  pub recipients:    Vec<String>,
}
