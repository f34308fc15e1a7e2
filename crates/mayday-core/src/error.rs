//! Error types for `mayday-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("latitude {0} outside -90..90")]
  InvalidLatitude(f64),

  #[error("longitude {0} outside -180..180")]
  InvalidLongitude(f64),

  #[error("radius must be greater than zero, got {0}")]
  InvalidRadius(f64),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a storage-backend error. Used by [`crate::engine::AlertEngine`],
  /// which is generic over the backend's error type.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
