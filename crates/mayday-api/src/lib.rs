//! JSON REST API for Mayday.
//!
//! Exposes an axum [`Router`] backed by any [`mayday_core::store::SosStore`]
//! and [`mayday_core::notify::Notifier`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.

pub mod alerts;
pub mod error;
pub mod location;
pub mod system;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use mayday_core::{engine::AlertEngine, notify::Notifier, store::SosStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_host() -> String { "0.0.0.0".to_owned() }
fn default_port() -> u16 { 8001 }
fn default_store_path() -> PathBuf { PathBuf::from("mayday.db") }
fn default_stale_after() -> u64 { 3600 }
fn default_api_url() -> String { mayday_push::DEFAULT_API_URL.to_owned() }

/// Runtime server configuration, deserialised from `config.toml` layered
/// under `MAYDAY_`-prefixed environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host: String,
  #[serde(default = "default_port")]
  pub port: u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  /// Locations older than this stop qualifying as recipients. `0` disables
  /// the freshness check.
  #[serde(default = "default_stale_after")]
  pub stale_after_secs: u64,
  #[serde(default)]
  pub onesignal_app_id: String,
  /// Absent key leaves the provider unconfigured: dispatches then record
  /// error outcomes instead of reaching the network.
  pub onesignal_api_key: Option<String>,
  #[serde(default = "default_api_url")]
  pub onesignal_api_url: String,
}

impl ServerConfig {
  pub fn stale_after(&self) -> Option<chrono::Duration> {
    (self.stale_after_secs > 0)
      .then(|| chrono::Duration::seconds(self.stale_after_secs as i64))
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers, built once in `main`.
#[derive(Clone)]
pub struct AppState<S: SosStore, N: Notifier> {
  pub store:  Arc<S>,
  pub engine: Arc<AlertEngine<S, N>>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build an axum [`Router`] for the Mayday API.
pub fn router<S, N>(state: AppState<S, N>) -> Router
where
  S: SosStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  N: Notifier + Clone + Send + Sync + 'static,
{
  Router::new()
    // Location directory
    .route("/api/users/location", post(location::update::<S, N>))
    .route("/api/users/nearby", get(location::nearby::<S, N>))
    .route("/api/users/{id}/location", get(location::get_one::<S, N>))
    // Alert lifecycle
    .route("/api/alerts/sos", post(alerts::trigger::<S, N>))
    .route("/api/alerts/cancel", post(alerts::cancel::<S, N>))
    .route("/api/alerts/history/{id}", get(alerts::history::<S, N>))
    // System
    .route("/api/stats", get(system::stats::<S, N>))
    .route("/api/health", get(system::health))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::{Arc, Mutex};

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use mayday_core::{
    matcher::ProximityMatcher,
    notify::{DispatchOutcome, Notifier, Push, PushData},
  };
  use mayday_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  // ── Test doubles ───────────────────────────────────────────────────────────

  /// Records every dispatched push and acknowledges all recipients.
  #[derive(Clone, Default)]
  struct StubNotifier {
    sent: Arc<Mutex<Vec<Push>>>,
  }

  impl StubNotifier {
    fn sent(&self) -> Vec<Push> { self.sent.lock().unwrap().clone() }
  }

  impl Notifier for StubNotifier {
    async fn dispatch(&self, push: &Push) -> DispatchOutcome {
      let accepted = push.recipients.len() as u32;
      self.sent.lock().unwrap().push(push.clone());
      DispatchOutcome::Success { notification_id: "stub-1".to_owned(), accepted }
    }
  }

  async fn make_state() -> (AppState<SqliteStore, StubNotifier>, StubNotifier) {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let notifier = StubNotifier::default();
    let engine = AlertEngine::new(
      store.clone(),
      Arc::new(notifier.clone()),
      ProximityMatcher::new(None),
    );
    (AppState { store, engine: Arc::new(engine) }, notifier)
  }

  async fn send(
    state: AppState<SqliteStore, StubNotifier>,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
      Some(v) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(v.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };

    let response = router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  fn location_body(user_id: &str, lat: f64, lon: f64) -> Value {
    json!({
      "user_id": user_id,
      "latitude": lat,
      "longitude": lon,
      "external_id": format!("alias-{user_id}"),
      "device_type": "android",
    })
  }

  async fn report(
    state: &AppState<SqliteStore, StubNotifier>,
    user_id: &str,
    lat: f64,
    lon: f64,
  ) {
    let (status, _) = send(
      state.clone(),
      "POST",
      "/api/users/location",
      Some(location_body(user_id, lat, lon)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
  }

  fn sos_body(user_id: &str) -> Value {
    json!({
      "user_id": user_id,
      "latitude": 0.0,
      "longitude": 0.0,
      "radius_meters": 200.0,
      "message": "Help!",
      "external_id": format!("alias-{user_id}"),
    })
  }

  // ── System ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn health_reports_healthy() {
    let (state, _) = make_state().await;
    let (status, body) = send(state, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
  }

  #[tokio::test]
  async fn stats_reports_counts() {
    let (state, _) = make_state().await;
    report(&state, "alice", 0.0, 0.0).await;
    report(&state, "bob", 0.0, 0.001).await;
    send(state.clone(), "POST", "/api/alerts/sos", Some(sos_body("alice"))).await;

    let (status, body) = send(state, "GET", "/api/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_users"], 2);
    assert_eq!(body["active_users"], 2);
    assert_eq!(body["total_alerts"], 1);
  }

  // ── Location directory ──────────────────────────────────────────────────────

  #[tokio::test]
  async fn location_update_and_fetch_roundtrip() {
    let (state, _) = make_state().await;
    report(&state, "alice", 55.7558, 37.6173).await;

    let (status, body) =
      send(state, "GET", "/api/users/alice/location", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "alice");
    assert_eq!(body["latitude"], 55.7558);
    assert_eq!(body["longitude"], 37.6173);
    assert!(body["last_update"].is_string());
  }

  #[tokio::test]
  async fn unknown_user_location_returns_404() {
    let (state, _) = make_state().await;
    let (status, body) =
      send(state, "GET", "/api/users/nobody/location", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nobody"));
  }

  #[tokio::test]
  async fn out_of_range_coordinates_are_rejected() {
    let (state, _) = make_state().await;
    let (status, body) = send(
      state,
      "POST",
      "/api/users/location",
      Some(location_body("alice", 91.0, 0.0)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("latitude"));
  }

  #[tokio::test]
  async fn nearby_returns_candidates_sorted_by_distance() {
    let (state, _) = make_state().await;
    report(&state, "far", 0.0, 0.0015).await;
    report(&state, "near", 0.0, 0.0005).await;
    report(&state, "mid", 0.0, 0.001).await;

    let (status, body) = send(
      state,
      "GET",
      "/api/users/nearby?latitude=0.0&longitude=0.0&radius_meters=500",
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nearby_users_count"], 3);

    let users = body["nearby_users"].as_array().unwrap();
    let ids: Vec<_> = users.iter().map(|u| u["user_id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["near", "mid", "far"]);
  }

  #[tokio::test]
  async fn nearby_default_radius_matches_geofence_example() {
    // Recipient A at ~167 m is inside the default 200 m radius, B at ~222 m
    // is outside.
    let (state, _) = make_state().await;
    report(&state, "a", 0.0, 0.0015).await;
    report(&state, "b", 0.0, 0.002).await;

    let (status, body) = send(
      state,
      "GET",
      "/api/users/nearby?latitude=0.0&longitude=0.0",
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["radius_meters"], 200.0);
    assert_eq!(body["nearby_users_count"], 1);
    assert_eq!(body["nearby_users"][0]["user_id"], "a");
  }

  // ── SOS trigger ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn sos_dispatches_one_batched_push() {
    let (state, notifier) = make_state().await;
    report(&state, "sender", 0.0, 0.0).await;
    report(&state, "helper1", 0.0, 0.0005).await;
    report(&state, "helper2", 0.0, 0.001).await;

    let (status, body) =
      send(state.clone(), "POST", "/api/alerts/sos", Some(sos_body("sender"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["alert_id"], "stub-1");
    assert_eq!(body["recipients_count"], 2);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1, "fan-out must be a single batched dispatch");
    assert_eq!(sent[0].recipients, ["alias-helper1", "alias-helper2"]);
    assert!(sent[0].wants_actions());
    assert_eq!(sent[0].body, "Help!");

    let (_, history) =
      send(state, "GET", "/api/alerts/history/sender", None).await;
    assert_eq!(history["total_alerts"], 1);
    assert_eq!(history["alerts"][0]["status"], "dispatched");
    assert_eq!(history["alerts"][0]["outcome"]["status"], "success");
  }

  #[tokio::test]
  async fn sos_excludes_sender_and_records_no_recipients() {
    let (state, notifier) = make_state().await;
    // The sender is the only user in range of itself.
    report(&state, "sender", 0.0, 0.0).await;

    let (status, body) =
      send(state.clone(), "POST", "/api/alerts/sos", Some(sos_body("sender"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "no_recipients");
    assert_eq!(body["alert_id"], "no_recipients");
    assert_eq!(body["recipients_count"], 0);
    assert!(notifier.sent().is_empty());

    // The record is still persisted for history and stats.
    let (_, history) =
      send(state, "GET", "/api/alerts/history/sender", None).await;
    assert_eq!(history["total_alerts"], 1);
    assert_eq!(history["alerts"][0]["status"], "no_recipients");
  }

  #[tokio::test]
  async fn sos_with_nonpositive_radius_is_rejected() {
    let (state, notifier) = make_state().await;
    let mut body = sos_body("sender");
    body["radius_meters"] = json!(0.0);

    let (status, _) = send(state, "POST", "/api/alerts/sos", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(notifier.sent().is_empty());
  }

  // ── Cancellation ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn cancel_without_prior_alert_reports_no_active_alert() {
    let (state, notifier) = make_state().await;
    let (status, body) = send(
      state,
      "POST",
      "/api/alerts/cancel",
      Some(json!({ "user_id": "sender" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "no_active_alert");
    assert!(notifier.sent().is_empty());
  }

  #[tokio::test]
  async fn cancel_notifies_recipients_and_marks_alert() {
    let (state, notifier) = make_state().await;
    report(&state, "sender", 0.0, 0.0).await;
    report(&state, "helper", 0.0, 0.0005).await;
    send(state.clone(), "POST", "/api/alerts/sos", Some(sos_body("sender"))).await;

    let (status, body) = send(
      state.clone(),
      "POST",
      "/api/alerts/cancel",
      Some(json!({ "user_id": "sender" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let sent = notifier.sent();
    assert_eq!(sent.len(), 2, "SOS push plus one cancellation notice");
    let notice = &sent[1];
    assert_eq!(notice.recipients, ["alias-helper"]);
    assert!(!notice.wants_actions());
    assert_eq!(
      notice.data,
      PushData::SosCancelled { original_alert_id: "stub-1".to_owned() }
    );

    let (_, history) =
      send(state, "GET", "/api/alerts/history/sender", None).await;
    assert_eq!(history["alerts"][0]["status"], "cancelled");
    assert!(history["alerts"][0]["cancelled_at"].is_string());
  }

  #[tokio::test]
  async fn cancel_twice_succeeds_without_renotifying() {
    let (state, notifier) = make_state().await;
    report(&state, "sender", 0.0, 0.0).await;
    report(&state, "helper", 0.0, 0.0005).await;
    send(state.clone(), "POST", "/api/alerts/sos", Some(sos_body("sender"))).await;

    let cancel = json!({ "user_id": "sender" });
    let (_, first) =
      send(state.clone(), "POST", "/api/alerts/cancel", Some(cancel.clone())).await;
    assert_eq!(first["status"], "success");

    let (status, second) =
      send(state, "POST", "/api/alerts/cancel", Some(cancel)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["status"], "success");

    // One SOS, one notice — the repeat cancellation sends nothing.
    assert_eq!(notifier.sent().len(), 2);
  }

  #[tokio::test]
  async fn cancel_no_recipients_alert_is_noop_success() {
    let (state, notifier) = make_state().await;
    send(state.clone(), "POST", "/api/alerts/sos", Some(sos_body("sender"))).await;

    let (status, body) = send(
      state.clone(),
      "POST",
      "/api/alerts/cancel",
      Some(json!({ "user_id": "sender" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert!(notifier.sent().is_empty());

    // The record keeps its terminal no_recipients status.
    let (_, history) =
      send(state, "GET", "/api/alerts/history/sender", None).await;
    assert_eq!(history["alerts"][0]["status"], "no_recipients");
  }

  // ── History ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn history_limit_returns_most_recent_first() {
    let (state, _) = make_state().await;

    let mut first = sos_body("sender");
    first["message"] = json!("first");
    send(state.clone(), "POST", "/api/alerts/sos", Some(first)).await;

    let mut second = sos_body("sender");
    second["message"] = json!("second");
    send(state.clone(), "POST", "/api/alerts/sos", Some(second)).await;

    let (status, body) =
      send(state, "GET", "/api/alerts/history/sender?limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_alerts"], 1);
    assert_eq!(body["alerts"][0]["message"], "second");
  }
}
