//! [`SqliteStore`] — the SQLite implementation of [`SosStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use mayday_core::{
  alert::{Alert, NewAlert},
  location::{LocationUpdate, UserLocation},
  store::{SosStore, StoreStats},
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  encode::{
    RawAlert, RawUserLocation, encode_device_type, encode_dt, encode_outcome,
    encode_recipients, encode_status, encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

/// Column list shared by every `alerts` SELECT so row mapping stays in sync.
const ALERT_COLUMNS: &str = "id, alert_id, sender_id, latitude, longitude, \
                             radius_meters, message, status, outcome, \
                             recipients, created_at, cancelled_at";

fn alert_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAlert> {
  Ok(RawAlert {
    id:            row.get(0)?,
    alert_id:      row.get(1)?,
    sender_id:     row.get(2)?,
    latitude:      row.get(3)?,
    longitude:     row.get(4)?,
    radius_meters: row.get(5)?,
    message:       row.get(6)?,
    status:        row.get(7)?,
    outcome:       row.get(8)?,
    recipients:    row.get(9)?,
    created_at:    row.get(10)?,
    cancelled_at:  row.get(11)?,
  })
}

fn location_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUserLocation> {
  Ok(RawUserLocation {
    user_id:     row.get(0)?,
    external_id: row.get(1)?,
    latitude:    row.get(2)?,
    longitude:   row.get(3)?,
    device_type: row.get(4)?,
    last_update: row.get(5)?,
    active:      row.get(6)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Mayday store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── SosStore impl ───────────────────────────────────────────────────────────

impl SosStore for SqliteStore {
  type Error = Error;

  // ── Location directory ────────────────────────────────────────────────────

  async fn upsert_location(&self, update: LocationUpdate) -> Result<UserLocation> {
    let location = UserLocation {
      user_id:     update.user_id,
      external_id: update.external_id,
      position:    Some(update.position),
      device_type: update.device_type,
      last_update: Utc::now(),
      active:      true,
    };

    let user_id = location.user_id.clone();
    let external_id = location.external_id.clone();
    let latitude = update.position.latitude;
    let longitude = update.position.longitude;
    let device_type = encode_device_type(location.device_type).to_owned();
    let last_update = encode_dt(location.last_update);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (
             user_id, external_id, latitude, longitude,
             device_type, last_update, active
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)
           ON CONFLICT(user_id) DO UPDATE SET
             external_id = excluded.external_id,
             latitude    = excluded.latitude,
             longitude   = excluded.longitude,
             device_type = excluded.device_type,
             last_update = excluded.last_update,
             active      = 1",
          rusqlite::params![
            user_id,
            external_id,
            latitude,
            longitude,
            device_type,
            last_update,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(location)
  }

  async fn get_location(&self, user_id: &str) -> Result<Option<UserLocation>> {
    let id = user_id.to_owned();

    let raw: Option<RawUserLocation> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT user_id, external_id, latitude, longitude,
                    device_type, last_update, active
             FROM users WHERE user_id = ?1",
            rusqlite::params![id],
            location_from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUserLocation::into_location).transpose()
  }

  async fn active_locations(&self, limit: usize) -> Result<Vec<UserLocation>> {
    let limit = limit as i64;

    let raws: Vec<RawUserLocation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT user_id, external_id, latitude, longitude,
                  device_type, last_update, active
           FROM users WHERE active = 1
           ORDER BY rowid
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit], location_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUserLocation::into_location).collect()
  }

  // ── Alert log ─────────────────────────────────────────────────────────────

  async fn record_alert(&self, input: NewAlert) -> Result<Alert> {
    let alert = Alert {
      id:            Uuid::new_v4(),
      alert_id:      input.alert_id,
      sender_id:     input.sender_id,
      origin:        input.origin,
      radius_meters: input.radius_meters,
      message:       input.message,
      status:        input.status,
      outcome:       input.outcome,
      recipients:    input.recipients,
      created_at:    Utc::now(),
      cancelled_at:  None,
    };

    let id = encode_uuid(alert.id);
    let alert_id = alert.alert_id.clone();
    let sender_id = alert.sender_id.clone();
    let latitude = alert.origin.latitude;
    let longitude = alert.origin.longitude;
    let radius_meters = alert.radius_meters;
    let message = alert.message.clone();
    let status = encode_status(alert.status).to_owned();
    let outcome = alert.outcome.as_ref().map(encode_outcome).transpose()?;
    let recipients = encode_recipients(&alert.recipients)?;
    let created_at = encode_dt(alert.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO alerts (
             id, alert_id, sender_id, latitude, longitude,
             radius_meters, message, status, outcome, recipients, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            id,
            alert_id,
            sender_id,
            latitude,
            longitude,
            radius_meters,
            message,
            status,
            outcome,
            recipients,
            created_at,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(alert)
  }

  async fn latest_alert_for_sender(&self, sender_id: &str) -> Result<Option<Alert>> {
    let sender = sender_id.to_owned();

    let raw: Option<RawAlert> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {ALERT_COLUMNS} FROM alerts
               WHERE sender_id = ?1
               ORDER BY created_at DESC, rowid DESC
               LIMIT 1"
            ),
            rusqlite::params![sender],
            alert_from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAlert::into_alert).transpose()
  }

  async fn mark_cancelled(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(at);

    let changed = self
      .conn
      .call(move |conn| {
        // Conditional transition: applies at most once per alert.
        Ok(conn.execute(
          "UPDATE alerts SET status = 'cancelled', cancelled_at = ?2
           WHERE id = ?1 AND cancelled_at IS NULL",
          rusqlite::params![id_str, at_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn alert_history(&self, sender_id: &str, limit: usize) -> Result<Vec<Alert>> {
    let sender = sender_id.to_owned();
    let limit = limit as i64;

    let raws: Vec<RawAlert> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ALERT_COLUMNS} FROM alerts
           WHERE sender_id = ?1
           ORDER BY created_at DESC, rowid DESC
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![sender, limit], alert_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAlert::into_alert).collect()
  }

  // ── Aggregates ────────────────────────────────────────────────────────────

  async fn stats(&self) -> Result<StoreStats> {
    let (total_users, active_users, total_alerts): (i64, i64, i64) = self
      .conn
      .call(|conn| {
        let total_users =
          conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
        let active_users = conn.query_row(
          "SELECT COUNT(*) FROM users WHERE active = 1",
          [],
          |r| r.get(0),
        )?;
        let total_alerts =
          conn.query_row("SELECT COUNT(*) FROM alerts", [], |r| r.get(0))?;
        Ok((total_users, active_users, total_alerts))
      })
      .await?;

    Ok(StoreStats {
      total_users:  total_users as u64,
      active_users: active_users as u64,
      total_alerts: total_alerts as u64,
    })
  }
}
