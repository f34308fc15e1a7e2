//! OneSignal client for Mayday.
//!
//! Implements [`mayday_core::notify::Notifier`] with one batched REST call
//! per dispatch. Every failure mode — missing credentials, timeout, non-2xx,
//! malformed response — is normalized into
//! [`DispatchOutcome::Error`](mayday_core::notify::DispatchOutcome) so the
//! calling flow can persist the alert either way.

mod client;
mod payload;

pub use client::{OneSignalClient, OneSignalConfig, DEFAULT_API_URL};
