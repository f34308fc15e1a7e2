//! Handlers for `/api/alerts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/alerts/sos` | Match, dispatch, persist; always 200 unless input/store fails |
//! | `POST` | `/api/alerts/cancel` | Idempotent; `no_active_alert` when nothing to cancel |
//! | `GET`  | `/api/alerts/history/{id}` | Newest first, `?limit=20` |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use mayday_core::{
  alert::Alert,
  engine::{CancelOutcome, DEFAULT_HISTORY_LIMIT, SosSignal},
  geo::GeoPoint,
  notify::Notifier,
  store::SosStore,
};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError, location::DEFAULT_RADIUS_METERS};

/// Body shown to recipients when the sender does not provide one.
pub const DEFAULT_SOS_MESSAGE: &str = "SOS Alert! Someone nearby needs help!";

fn default_radius() -> f64 { DEFAULT_RADIUS_METERS }
fn default_message() -> String { DEFAULT_SOS_MESSAGE.to_owned() }
fn default_limit() -> usize { DEFAULT_HISTORY_LIMIT }

// ─── Trigger ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SosBody {
  pub user_id:   String,
  pub latitude:  f64,
  pub longitude: f64,
  #[serde(default = "default_radius")]
  pub radius_meters: f64,
  #[serde(default = "default_message")]
  pub message: String,
  /// The sender's own push alias. Sent by the mobile client; only logged —
  /// the sender is excluded from its own broadcast.
  pub external_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SosResponse {
  pub alert_id:         String,
  pub recipients_count: usize,
  pub status:           &'static str,
}

/// `POST /api/alerts/sos`
pub async fn trigger<S, N>(
  State(state): State<AppState<S, N>>,
  Json(body): Json<SosBody>,
) -> Result<Json<SosResponse>, ApiError>
where
  S: SosStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  N: Notifier,
{
  let origin = GeoPoint::new(body.latitude, body.longitude)?;
  tracing::info!(
    sender = %body.user_id,
    alias = body.external_id.as_deref().unwrap_or(""),
    radius = body.radius_meters,
    "SOS received"
  );

  let alert = state
    .engine
    .trigger_sos(SosSignal {
      sender_id:     body.user_id,
      origin,
      radius_meters: body.radius_meters,
      message:       body.message,
    })
    .await?;

  Ok(Json(SosResponse {
    alert_id:         alert.alert_id.clone(),
    recipients_count: alert.recipients.len(),
    status:           alert.dispatch_status(),
  }))
}

// ─── Cancel ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CancelBody {
  pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
  pub status:  &'static str,
  pub message: &'static str,
}

/// `POST /api/alerts/cancel`
pub async fn cancel<S, N>(
  State(state): State<AppState<S, N>>,
  Json(body): Json<CancelBody>,
) -> Result<Json<CancelResponse>, ApiError>
where
  S: SosStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  N: Notifier,
{
  let response = match state.engine.cancel(&body.user_id).await? {
    CancelOutcome::Cancelled { .. } => CancelResponse {
      status:  "success",
      message: "SOS alert cancelled",
    },
    CancelOutcome::NoActiveAlert => CancelResponse {
      status:  "no_active_alert",
      message: "No active SOS alert found",
    },
  };
  Ok(Json(response))
}

// ─── History ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  #[serde(default = "default_limit")]
  pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
  pub user_id:      String,
  pub total_alerts: usize,
  pub alerts:       Vec<Alert>,
}

/// `GET /api/alerts/history/{id}?limit=20`
pub async fn history<S, N>(
  State(state): State<AppState<S, N>>,
  Path(user_id): Path<String>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError>
where
  S: SosStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  N: Notifier,
{
  let alerts = state.engine.history(&user_id, params.limit).await?;

  Ok(Json(HistoryResponse {
    user_id,
    total_alerts: alerts.len(),
    alerts,
  }))
}
