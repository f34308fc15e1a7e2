//! The `SosStore` trait — the storage abstraction behind the location
//! directory and the alert log.
//!
//! The trait is implemented by storage backends (e.g. `mayday-store-sqlite`).
//! Higher layers (`mayday-api`, the engine) depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  alert::{Alert, NewAlert},
  location::{LocationUpdate, UserLocation},
};

// ─── Aggregates ──────────────────────────────────────────────────────────────

/// Counts for `GET /api/stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
  pub total_users:  u64,
  pub active_users: u64,
  pub total_alerts: u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Mayday storage backend.
///
/// Location writes are whole-record upserts (last write wins). Alert writes
/// happen once per alert; the single permitted mutation afterwards is
/// [`SosStore::mark_cancelled`].
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait SosStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Location directory ────────────────────────────────────────────────

  /// Create or overwrite the record for `update.user_id`. The store assigns
  /// `last_update` and marks the record active.
  fn upsert_location(
    &self,
    update: LocationUpdate,
  ) -> impl Future<Output = Result<UserLocation, Self::Error>> + Send + '_;

  /// Retrieve one record by user id. Returns `None` if not found.
  fn get_location<'a>(
    &'a self,
    user_id: &'a str,
  ) -> impl Future<Output = Result<Option<UserLocation>, Self::Error>> + Send + 'a;

  /// Up to `limit` active records, in backend enumeration order. The matcher
  /// treats that order as the tie-break for equal distances, so it should be
  /// deterministic per backend but is not part of the contract.
  fn active_locations(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<UserLocation>, Self::Error>> + Send + '_;

  // ── Alert log ─────────────────────────────────────────────────────────

  /// Persist a new alert and return it. The store assigns `id` and
  /// `created_at`.
  fn record_alert(
    &self,
    input: NewAlert,
  ) -> impl Future<Output = Result<Alert, Self::Error>> + Send + '_;

  /// The most recently created alert for `sender_id`, irrespective of
  /// status. Returns `None` if the sender has never triggered one.
  fn latest_alert_for_sender<'a>(
    &'a self,
    sender_id: &'a str,
  ) -> impl Future<Output = Result<Option<Alert>, Self::Error>> + Send + 'a;

  /// Transition an alert into `Cancelled` — a single conditional update that
  /// only applies while `cancelled_at` is unset. Returns `true` if this call
  /// performed the transition, `false` if it was already cancelled or the id
  /// is unknown.
  fn mark_cancelled(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Alerts for `sender_id`, ordered by `created_at` descending, capped at
  /// `limit`.
  fn alert_history<'a>(
    &'a self,
    sender_id: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Alert>, Self::Error>> + Send + 'a;

  // ── Aggregates ────────────────────────────────────────────────────────

  fn stats(
    &self,
  ) -> impl Future<Output = Result<StoreStats, Self::Error>> + Send + '_;
}
