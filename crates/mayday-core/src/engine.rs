//! The alert lifecycle engine: trigger, cancel, nearby, history, stats.
//!
//! One engine instance is built at process start and shared by every
//! request. Each operation is self-contained — read the directory, compute,
//! write one alert record — with no cross-request locking. Provider-facing
//! failures are absorbed into the persisted outcome; only store failures
//! surface as errors.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::{
  Error, Result,
  alert::{Alert, AlertStatus, NO_RECIPIENTS_ID, NewAlert, UNKNOWN_ALERT_ID},
  geo::{GeoPoint, validate_radius},
  matcher::{Candidate, ProximityMatcher},
  notify::{DispatchOutcome, Notifier, Push},
  store::{SosStore, StoreStats},
};

/// History page size when the caller does not specify one.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

// ─── Inputs / outputs ────────────────────────────────────────────────────────

/// A validated SOS trigger request.
#[derive(Debug, Clone)]
pub struct SosSignal {
  pub sender_id:     String,
  pub origin:        GeoPoint,
  pub radius_meters: f64,
  pub message:       String,
}

/// Result of a cancellation request. Both variants are normal results;
/// `NoActiveAlert` is "nothing to do", not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CancelOutcome {
  Cancelled { alert_id: String },
  NoActiveAlert,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Composes the directory store, the proximity matcher and the push
/// provider into the alert lifecycle.
pub struct AlertEngine<S, N> {
  store:    Arc<S>,
  notifier: Arc<N>,
  matcher:  ProximityMatcher,
}

impl<S, N> AlertEngine<S, N>
where
  S: SosStore,
  N: Notifier,
{
  pub fn new(store: Arc<S>, notifier: Arc<N>, matcher: ProximityMatcher) -> Self {
    Self { store, notifier, matcher }
  }

  /// Direct access to the backing store, for the plain directory reads and
  /// writes that don't involve the lifecycle.
  pub fn store(&self) -> &S { &self.store }

  // ── Trigger ───────────────────────────────────────────────────────────

  /// Run the full trigger flow: match, dispatch, persist. The returned alert
  /// reflects the dispatch outcome — including provider errors, which are
  /// recorded rather than raised.
  pub async fn trigger_sos(&self, signal: SosSignal) -> Result<Alert> {
    validate_radius(signal.radius_meters)?;

    let scanned = self
      .store
      .active_locations(self.matcher.scan_cap())
      .await
      .map_err(Error::store)?;
    let now = Utc::now();
    let candidates = self.matcher.find_within_radius(
      signal.origin,
      signal.radius_meters,
      Some(&signal.sender_id),
      &scanned,
      now,
    );

    if candidates.is_empty() {
      let alert = self
        .store
        .record_alert(NewAlert {
          alert_id:      NO_RECIPIENTS_ID.to_owned(),
          sender_id:     signal.sender_id,
          origin:        signal.origin,
          radius_meters: signal.radius_meters,
          message:       signal.message,
          status:        AlertStatus::NoRecipients,
          outcome:       None,
          recipients:    Vec::new(),
        })
        .await
        .map_err(Error::store)?;
      tracing::info!(sender = %alert.sender_id, "SOS triggered with no recipients in range");
      return Ok(alert);
    }

    let recipients: Vec<String> =
      candidates.iter().map(|c| c.external_id.clone()).collect();
    let push = Push::sos(
      recipients.clone(),
      &signal.message,
      &signal.sender_id,
      signal.origin,
      now,
    );
    let outcome = self.notifier.dispatch(&push).await;

    let alert_id = match &outcome {
      DispatchOutcome::Success { notification_id, .. } => notification_id.clone(),
      DispatchOutcome::Error { message } => {
        tracing::warn!(%message, "SOS dispatch failed, recording error outcome");
        UNKNOWN_ALERT_ID.to_owned()
      }
    };

    let alert = self
      .store
      .record_alert(NewAlert {
        alert_id,
        sender_id: signal.sender_id,
        origin: signal.origin,
        radius_meters: signal.radius_meters,
        message: signal.message,
        status: AlertStatus::Dispatched,
        outcome: Some(outcome),
        recipients,
      })
      .await
      .map_err(Error::store)?;

    tracing::info!(
      sender = %alert.sender_id,
      alert_id = %alert.alert_id,
      recipients = alert.recipients.len(),
      "SOS dispatched"
    );
    Ok(alert)
  }

  // ── Cancel ────────────────────────────────────────────────────────────

  /// Cancel the sender's most recent alert, notifying its recipients
  /// best-effort. Idempotent: repeat cancellations succeed without
  /// re-notifying, and a no-recipient alert is left untouched.
  pub async fn cancel(&self, sender_id: &str) -> Result<CancelOutcome> {
    let Some(alert) = self
      .store
      .latest_alert_for_sender(sender_id)
      .await
      .map_err(Error::store)?
    else {
      return Ok(CancelOutcome::NoActiveAlert);
    };

    if alert.cancelled_at.is_some() {
      return Ok(CancelOutcome::Cancelled { alert_id: alert.alert_id });
    }

    if alert.status == AlertStatus::NoRecipients {
      // Nothing was dispatched, so there is nothing to revoke.
      return Ok(CancelOutcome::Cancelled { alert_id: alert.alert_id });
    }

    if !alert.recipients.is_empty() {
      let push = Push::cancellation(alert.recipients.clone(), &alert.alert_id);
      if let DispatchOutcome::Error { message } = self.notifier.dispatch(&push).await {
        tracing::warn!(%message, "cancellation notice failed, alert is still marked cancelled");
      }
    }

    self
      .store
      .mark_cancelled(alert.id, Utc::now())
      .await
      .map_err(Error::store)?;
    tracing::info!(sender = %sender_id, alert_id = %alert.alert_id, "SOS cancelled");
    Ok(CancelOutcome::Cancelled { alert_id: alert.alert_id })
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Distance-sorted candidates around `center`, with no sender exclusion.
  pub async fn nearby(
    &self,
    center: GeoPoint,
    radius_meters: f64,
  ) -> Result<Vec<Candidate>> {
    validate_radius(radius_meters)?;
    let scanned = self
      .store
      .active_locations(self.matcher.scan_cap())
      .await
      .map_err(Error::store)?;
    Ok(self.matcher.find_within_radius(
      center,
      radius_meters,
      None,
      &scanned,
      Utc::now(),
    ))
  }

  /// The sender's alerts, newest first.
  pub async fn history(&self, sender_id: &str, limit: usize) -> Result<Vec<Alert>> {
    self
      .store
      .alert_history(sender_id, limit)
      .await
      .map_err(Error::store)
  }

  pub async fn stats(&self) -> Result<StoreStats> {
    self.store.stats().await.map_err(Error::store)
  }
}
