//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. The dispatch outcome and
//! the recipient list are stored as compact JSON. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use mayday_core::{
  alert::{Alert, AlertStatus},
  geo::GeoPoint,
  location::{DeviceType, UserLocation},
  notify::DispatchOutcome,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── DeviceType ───────────────────────────────────────────────────────────────

pub fn encode_device_type(d: DeviceType) -> &'static str {
  match d {
    DeviceType::Android => "android",
    DeviceType::Ios => "ios",
    DeviceType::Web => "web",
  }
}

pub fn decode_device_type(s: &str) -> Result<DeviceType> {
  match s {
    "android" => Ok(DeviceType::Android),
    "ios" => Ok(DeviceType::Ios),
    "web" => Ok(DeviceType::Web),
    other => Err(Error::UnknownValue(format!("device type: {other}"))),
  }
}

// ─── AlertStatus ──────────────────────────────────────────────────────────────

pub fn encode_status(s: AlertStatus) -> &'static str {
  match s {
    AlertStatus::Dispatched => "dispatched",
    AlertStatus::NoRecipients => "no_recipients",
    AlertStatus::Cancelled => "cancelled",
  }
}

pub fn decode_status(s: &str) -> Result<AlertStatus> {
  match s {
    "dispatched" => Ok(AlertStatus::Dispatched),
    "no_recipients" => Ok(AlertStatus::NoRecipients),
    "cancelled" => Ok(AlertStatus::Cancelled),
    other => Err(Error::UnknownValue(format!("alert status: {other}"))),
  }
}

// ─── JSON columns ─────────────────────────────────────────────────────────────

pub fn encode_outcome(o: &DispatchOutcome) -> Result<String> {
  Ok(serde_json::to_string(o)?)
}

pub fn encode_recipients(r: &[String]) -> Result<String> {
  Ok(serde_json::to_string(r)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `users` row.
pub struct RawUserLocation {
  pub user_id:     String,
  pub external_id: String,
  pub latitude:    Option<f64>,
  pub longitude:   Option<f64>,
  pub device_type: String,
  pub last_update: String,
  pub active:      bool,
}

impl RawUserLocation {
  pub fn into_location(self) -> Result<UserLocation> {
    // A position exists only when both coordinates are set.
    let position = match (self.latitude, self.longitude) {
      (Some(latitude), Some(longitude)) => Some(GeoPoint { latitude, longitude }),
      _ => None,
    };

    Ok(UserLocation {
      user_id:     self.user_id,
      external_id: self.external_id,
      position,
      device_type: decode_device_type(&self.device_type)?,
      last_update: decode_dt(&self.last_update)?,
      active:      self.active,
    })
  }
}

/// Raw strings read directly from an `alerts` row.
pub struct RawAlert {
  pub id:            String,
  pub alert_id:      String,
  pub sender_id:     String,
  pub latitude:      f64,
  pub longitude:     f64,
  pub radius_meters: f64,
  pub message:       String,
  pub status:        String,
  pub outcome:       Option<String>,
  pub recipients:    String,
  pub created_at:    String,
  pub cancelled_at:  Option<String>,
}

impl RawAlert {
  pub fn into_alert(self) -> Result<Alert> {
    let outcome = self
      .outcome
      .as_deref()
      .map(serde_json::from_str::<DispatchOutcome>)
      .transpose()?;

    Ok(Alert {
      id:            decode_uuid(&self.id)?,
      alert_id:      self.alert_id,
      sender_id:     self.sender_id,
      origin:        GeoPoint {
        latitude:  self.latitude,
        longitude: self.longitude,
      },
      radius_meters: self.radius_meters,
      message:       self.message,
      status:        decode_status(&self.status)?,
      outcome,
      recipients:    serde_json::from_str(&self.recipients)?,
      created_at:    decode_dt(&self.created_at)?,
      cancelled_at:  self.cancelled_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
