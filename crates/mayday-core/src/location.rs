//! User location records — the directory's unit of storage.
//!
//! A record is overwritten wholesale on every report (last write wins, no
//! versioning) and is never deleted; `active` is set on upsert and never
//! cleared. Staleness is handled at match time instead (see
//! [`crate::matcher`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// The reporting platform, as declared by the mobile client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
  #[default]
  Android,
  Ios,
  Web,
}

/// The latest known position and notification alias for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLocation {
  pub user_id:     String,
  /// Opaque alias the push provider addresses devices by. Must be non-empty
  /// for the user to qualify as an alert recipient.
  pub external_id: String,
  /// `None` when the directory has no coordinates for this user yet; such
  /// records never qualify as recipients.
  pub position:    Option<GeoPoint>,
  pub device_type: DeviceType,
  /// Store-assigned on every upsert.
  pub last_update: DateTime<Utc>,
  pub active:      bool,
}

/// Input to [`crate::store::SosStore::upsert_location`].
/// `last_update` and `active` are always set by the store.
#[derive(Debug, Clone)]
pub struct LocationUpdate {
  pub user_id:     String,
  pub external_id: String,
  pub position:    GeoPoint,
  pub device_type: DeviceType,
}
