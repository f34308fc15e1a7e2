//! Handlers for `/api/health` and `/api/stats`.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use mayday_core::{notify::Notifier, store::SosStore};
use serde::Serialize;

use crate::{AppState, error::ApiError};

// ─── Health ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
  pub status:    &'static str,
  pub timestamp: DateTime<Utc>,
}

/// `GET /api/health` — liveness probe, touches no state.
pub async fn health() -> Json<HealthResponse> {
  Json(HealthResponse { status: "healthy", timestamp: Utc::now() })
}

// ─── Stats ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StatsResponse {
  pub total_users:  u64,
  pub active_users: u64,
  pub total_alerts: u64,
  pub timestamp:    DateTime<Utc>,
}

/// `GET /api/stats`
pub async fn stats<S, N>(
  State(state): State<AppState<S, N>>,
) -> Result<Json<StatsResponse>, ApiError>
where
  S: SosStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  N: Notifier,
{
  let counts = state.engine.stats().await?;
  Ok(Json(StatsResponse {
    total_users:  counts.total_users,
    active_users: counts.active_users,
    total_alerts: counts.total_alerts,
    timestamp:    Utc::now(),
  }))
}
