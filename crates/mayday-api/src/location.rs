//! Handlers for `/api/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/users/location` | Upsert; out-of-range coordinates → 400 |
//! | `GET`  | `/api/users/{id}/location` | 404 if unknown |
//! | `GET`  | `/api/users/nearby` | `?latitude&longitude[&radius_meters=200]` |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use mayday_core::{
  geo::GeoPoint,
  location::{DeviceType, LocationUpdate},
  matcher::Candidate,
  notify::Notifier,
  store::SosStore,
};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

/// Search radius applied when the caller does not specify one.
pub const DEFAULT_RADIUS_METERS: f64 = 200.0;

fn default_radius() -> f64 { DEFAULT_RADIUS_METERS }

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LocationBody {
  pub user_id:     String,
  pub latitude:    f64,
  pub longitude:   f64,
  pub external_id: String,
  #[serde(default)]
  pub device_type: DeviceType,
}

#[derive(Debug, Serialize)]
pub struct UpdateAck {
  pub status:  &'static str,
  pub user_id: String,
  pub message: &'static str,
}

/// `POST /api/users/location`
pub async fn update<S, N>(
  State(state): State<AppState<S, N>>,
  Json(body): Json<LocationBody>,
) -> Result<Json<UpdateAck>, ApiError>
where
  S: SosStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  N: Notifier,
{
  let position = GeoPoint::new(body.latitude, body.longitude)?;

  let stored = state
    .store
    .upsert_location(LocationUpdate {
      user_id:     body.user_id,
      external_id: body.external_id,
      position,
      device_type: body.device_type,
    })
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  Ok(Json(UpdateAck {
    status:  "success",
    user_id: stored.user_id,
    message: "Location updated successfully",
  }))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct LocationView {
  pub user_id:     String,
  pub latitude:    Option<f64>,
  pub longitude:   Option<f64>,
  pub last_update: DateTime<Utc>,
}

/// `GET /api/users/{id}/location`
pub async fn get_one<S, N>(
  State(state): State<AppState<S, N>>,
  Path(user_id): Path<String>,
) -> Result<Json<LocationView>, ApiError>
where
  S: SosStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  N: Notifier,
{
  let location = state
    .store
    .get_location(&user_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))?;

  Ok(Json(LocationView {
    user_id:     location.user_id,
    latitude:    location.position.map(|p| p.latitude),
    longitude:   location.position.map(|p| p.longitude),
    last_update: location.last_update,
  }))
}

// ─── Nearby ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NearbyParams {
  pub latitude:  f64,
  pub longitude: f64,
  #[serde(default = "default_radius")]
  pub radius_meters: f64,
}

#[derive(Debug, Serialize)]
pub struct NearbyResponse {
  pub center_latitude:    f64,
  pub center_longitude:   f64,
  pub radius_meters:      f64,
  pub nearby_users_count: usize,
  pub nearby_users:       Vec<Candidate>,
}

/// `GET /api/users/nearby?latitude=..&longitude=..[&radius_meters=200]`
pub async fn nearby<S, N>(
  State(state): State<AppState<S, N>>,
  Query(params): Query<NearbyParams>,
) -> Result<Json<NearbyResponse>, ApiError>
where
  S: SosStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  N: Notifier,
{
  let center = GeoPoint::new(params.latitude, params.longitude)?;
  let found = state.engine.nearby(center, params.radius_meters).await?;

  Ok(Json(NearbyResponse {
    center_latitude:    params.latitude,
    center_longitude:   params.longitude,
    radius_meters:      params.radius_meters,
    nearby_users_count: found.len(),
    nearby_users:       found,
  }))
}
