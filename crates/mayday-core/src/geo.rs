//! Great-circle geometry and coordinate validation.
//!
//! Distances are computed with the haversine formula on a sphere — adequate
//! at the scale this system targets (hundreds of meters) and deterministic.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Mean Earth radius in meters, as used by the haversine computation.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

// ─── GeoPoint ────────────────────────────────────────────────────────────────

/// A WGS84-style coordinate pair in decimal degrees.
///
/// Constructing through [`GeoPoint::new`] enforces the valid ranges, so every
/// point that enters the matching pipeline has already been validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
  pub latitude:  f64,
  pub longitude: f64,
}

impl GeoPoint {
  /// Build a validated point. Rejects out-of-range or non-finite values.
  pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
      return Err(Error::InvalidLatitude(latitude));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
      return Err(Error::InvalidLongitude(longitude));
    }
    Ok(Self { latitude, longitude })
  }
}

/// Reject a non-positive or non-finite radius before any matching happens.
pub fn validate_radius(radius_meters: f64) -> Result<()> {
  if !radius_meters.is_finite() || radius_meters <= 0.0 {
    return Err(Error::InvalidRadius(radius_meters));
  }
  Ok(())
}

// ─── Distance ────────────────────────────────────────────────────────────────

/// Great-circle distance between two points in meters.
///
/// `a = sin²(Δφ/2) + cos(φ1)·cos(φ2)·sin²(Δλ/2)`, `d = 2R·asin(√a)`.
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
  let phi1 = a.latitude.to_radians();
  let phi2 = b.latitude.to_radians();
  let delta_phi = (b.latitude - a.latitude).to_radians();
  let delta_lambda = (b.longitude - a.longitude).to_radians();

  let h = (delta_phi / 2.0).sin().powi(2)
    + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);

  2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

/// Round a distance to two decimal places for reporting. Inclusion tests
/// always compare at full precision.
pub fn round2(meters: f64) -> f64 { (meters * 100.0).round() / 100.0 }

// ─── Tests ───────────────────────────────────────────────────────────────────
