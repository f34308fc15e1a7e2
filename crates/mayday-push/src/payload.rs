//! Wire types for the OneSignal notifications endpoint.

use mayday_core::notify::{Push, PushData};
use serde::{Deserialize, Serialize};

/// Undelivered pushes are dropped by the provider after this window rather
/// than delivered late.
pub const PUSH_TTL_SECS: u32 = 300;

/// Highest Android delivery priority.
pub const PUSH_PRIORITY: u8 = 10;

/// Accent/LED color for the Android notification (alarm red).
pub const ANDROID_ALERT_COLOR: &str = "FFFF3B30";

// ─── Request ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Aliases {
  pub external_id: Vec<String>,
}

/// OneSignal localizes per language tag; the app currently ships English.
#[derive(Debug, Serialize)]
pub struct Localized {
  pub en: String,
}

#[derive(Debug, Serialize)]
pub struct ActionButton {
  pub id:   &'static str,
  pub text: &'static str,
}

/// The fixed response actions attached to every SOS broadcast.
pub fn sos_buttons() -> Vec<ActionButton> {
  vec![
    ActionButton { id: "help_coming", text: "I'm coming to help" },
    ActionButton { id: "false_alarm", text: "False alarm" },
  ]
}

/// One batched notification request: all recipient aliases in a single call.
#[derive(Debug, Serialize)]
pub struct NotificationRequest {
  pub app_id:               String,
  pub target_channel:       &'static str,
  pub include_aliases:      Aliases,
  pub headings:             Localized,
  pub contents:             Localized,
  pub android_accent_color: &'static str,
  pub android_led_color:    &'static str,
  pub priority:             u8,
  pub ttl:                  u32,
  pub data:                 PushData,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub buttons:              Option<Vec<ActionButton>>,
}

impl NotificationRequest {
  pub fn from_push(app_id: &str, push: &Push) -> Self {
    Self {
      app_id:               app_id.to_owned(),
      target_channel:       "push",
      include_aliases:      Aliases { external_id: push.recipients.clone() },
      headings:             Localized { en: push.title.clone() },
      contents:             Localized { en: push.body.clone() },
      android_accent_color: ANDROID_ALERT_COLOR,
      android_led_color:    ANDROID_ALERT_COLOR,
      priority:             PUSH_PRIORITY,
      ttl:                  PUSH_TTL_SECS,
      data:                 push.data.clone(),
      buttons:              push.wants_actions().then(sos_buttons),
    }
  }
}

// ─── Response ────────────────────────────────────────────────────────────────

/// The fields Mayday reads from a 2xx provider response. Anything else is
/// ignored.
#[derive(Debug, Deserialize)]
pub struct NotificationReceipt {
  #[serde(default)]
  pub id:         Option<String>,
  #[serde(default)]
  pub recipients: Option<u32>,
}

// ─── Tests ───────────────────────────────────────────────────────────────────
