//! Proximity matching: which directory entries qualify as recipients for an
//! alert centered on a point.
//!
//! A linear scan over the active slice of the directory, bounded by a fixed
//! cap. The matcher is a value held by the engine, so a spatial-index
//! strategy can replace the scan behind the same call shape if the directory
//! outgrows it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  geo::{GeoPoint, haversine_meters, round2},
  location::UserLocation,
};

/// Upper bound on directory entries examined per match. Hitting it truncates
/// the scan and logs a warning — a scalability limit, not a failure.
pub const MAX_DIRECTORY_SCAN: usize = 1000;

// ─── Candidate ───────────────────────────────────────────────────────────────

/// A qualified recipient, with its distance from the alert origin rounded to
/// two decimals for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
  pub user_id:         String,
  pub external_id:     String,
  pub distance_meters: f64,
}

// ─── Matcher ─────────────────────────────────────────────────────────────────

/// Filters directory entries into a distance-sorted candidate list.
#[derive(Debug, Clone)]
pub struct ProximityMatcher {
  scan_cap:    usize,
  /// Entries whose `last_update` is older than this are skipped. `None`
  /// keeps every active entry eligible regardless of age.
  stale_after: Option<Duration>,
}

impl ProximityMatcher {
  pub fn new(stale_after: Option<Duration>) -> Self {
    Self { scan_cap: MAX_DIRECTORY_SCAN, stale_after }
  }

  #[cfg(test)]
  fn with_scan_cap(mut self, cap: usize) -> Self {
    self.scan_cap = cap;
    self
  }

  /// How many directory entries the engine should fetch per match.
  pub fn scan_cap(&self) -> usize { self.scan_cap }

  /// All entries within `radius_meters` of `center`, ascending by distance.
  ///
  /// An entry qualifies iff it is active, has coordinates, has a non-empty
  /// external alias, is fresh enough, is not `exclude`, and its full-precision
  /// distance is at most the radius (boundary inclusive). Ties keep the
  /// incoming scan order (stable sort).
  pub fn find_within_radius(
    &self,
    center: GeoPoint,
    radius_meters: f64,
    exclude: Option<&str>,
    locations: &[UserLocation],
    now: DateTime<Utc>,
  ) -> Vec<Candidate> {
    if locations.len() > self.scan_cap {
      tracing::warn!(
        scanned = self.scan_cap,
        total = locations.len(),
        "directory scan truncated at cap"
      );
    }

    let mut candidates: Vec<Candidate> = locations
      .iter()
      .take(self.scan_cap)
      .filter(|loc| loc.active && !loc.external_id.is_empty())
      .filter(|loc| exclude != Some(loc.user_id.as_str()))
      .filter(|loc| match self.stale_after {
        Some(window) => now - loc.last_update <= window,
        None => true,
      })
      .filter_map(|loc| {
        let position = loc.position?;
        let distance = haversine_meters(center, position);
        (distance <= radius_meters).then(|| Candidate {
          user_id:         loc.user_id.clone(),
          external_id:     loc.external_id.clone(),
          distance_meters: round2(distance),
        })
      })
      .collect();

    // Stable: equal distances keep directory scan order.
    candidates.sort_by(|a, b| {
      a.distance_meters
        .partial_cmp(&b.distance_meters)
        .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use crate::location::DeviceType;

  fn user(id: &str, lat: f64, lon: f64) -> UserLocation {
    UserLocation {
      user_id:     id.to_owned(),
      external_id: format!("alias-{id}"),
      position:    Some(GeoPoint::new(lat, lon).unwrap()),
      device_type: DeviceType::Android,
      last_update: Utc::now(),
      active:      true,
    }
  }

  fn matcher() -> ProximityMatcher { ProximityMatcher::new(None) }

  fn origin() -> GeoPoint { GeoPoint::new(0.0, 0.0).unwrap() }

  #[test]
  fn includes_within_and_excludes_beyond_radius() {
    // ~167 m and ~222 m from the origin at the equator.
    let users = vec![user("near", 0.0, 0.0015), user("far", 0.0, 0.002)];
    let found =
      matcher().find_within_radius(origin(), 200.0, None, &users, Utc::now());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].user_id, "near");
  }

  #[test]
  fn boundary_distance_is_inclusive() {
    let target = user("edge", 0.0, 0.0015);
    let exact = haversine_meters(origin(), target.position.unwrap());

    let at_radius = matcher().find_within_radius(
      origin(),
      exact,
      None,
      std::slice::from_ref(&target),
      Utc::now(),
    );
    assert_eq!(at_radius.len(), 1, "exactly-at-radius must be included");

    let one_meter_short = matcher().find_within_radius(
      origin(),
      exact - 1.0,
      None,
      std::slice::from_ref(&target),
      Utc::now(),
    );
    assert!(one_meter_short.is_empty());
  }

  #[test]
  fn sender_is_never_a_candidate() {
    let users = vec![user("sender", 0.0, 0.0), user("other", 0.0, 0.0005)];
    let found = matcher().find_within_radius(
      origin(),
      200.0,
      Some("sender"),
      &users,
      Utc::now(),
    );
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].user_id, "other");
  }

  #[test]
  fn inactive_missing_position_and_empty_alias_are_skipped() {
    let mut inactive = user("inactive", 0.0, 0.0005);
    inactive.active = false;
    let mut nowhere = user("nowhere", 0.0, 0.0005);
    nowhere.position = None;
    let mut unaliased = user("unaliased", 0.0, 0.0005);
    unaliased.external_id = String::new();

    let users = vec![inactive, nowhere, unaliased, user("ok", 0.0, 0.0005)];
    let found =
      matcher().find_within_radius(origin(), 200.0, None, &users, Utc::now());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].user_id, "ok");
  }

  #[test]
  fn stale_entries_are_skipped_when_window_set() {
    let mut stale = user("stale", 0.0, 0.0005);
    stale.last_update = Utc::now() - Duration::minutes(90);
    let users = vec![stale, user("fresh", 0.0, 0.0005)];

    let strict = ProximityMatcher::new(Some(Duration::minutes(60)));
    let found =
      strict.find_within_radius(origin(), 200.0, None, &users, Utc::now());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].user_id, "fresh");

    // No window: both qualify.
    let lax = matcher().find_within_radius(origin(), 200.0, None, &users, Utc::now());
    assert_eq!(lax.len(), 2);
  }

  #[test]
  fn output_sorted_ascending_by_distance() {
    let users = vec![
      user("far", 0.0, 0.0015),
      user("near", 0.0, 0.0005),
      user("mid", 0.0, 0.001),
    ];
    let found =
      matcher().find_within_radius(origin(), 500.0, None, &users, Utc::now());
    let ids: Vec<_> = found.iter().map(|c| c.user_id.as_str()).collect();
    assert_eq!(ids, ["near", "mid", "far"]);
    assert!(found.windows(2).all(|w| w[0].distance_meters <= w[1].distance_meters));
  }

  #[test]
  fn scan_cap_truncates_silently() {
    let users = vec![
      user("a", 0.0, 0.0005),
      user("b", 0.0, 0.0006),
      user("c", 0.0, 0.0007),
    ];
    let capped = matcher().with_scan_cap(2);
    let found =
      capped.find_within_radius(origin(), 500.0, None, &users, Utc::now());
    assert_eq!(found.len(), 2);
  }

  #[test]
  fn distance_is_reported_rounded() {
    let users = vec![user("near", 0.0, 0.0015)];
    let found =
      matcher().find_within_radius(origin(), 200.0, None, &users, Utc::now());
    let d = found[0].distance_meters;
    assert_eq!(d, round2(d), "reported distance must be 2-decimal rounded");
    assert!((d - 166.79).abs() < 0.5);
  }
}
