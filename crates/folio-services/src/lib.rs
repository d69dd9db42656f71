//! Folio Services Layer
//!
//! Orchestration on top of the access engine: the two-phase upload saga
//! ([`UploadInitiator`], [`UploadFinalizer`]) and the map view. Every operation
//! resolves the caller and obtains an allowed decision before touching storage.

pub mod map;
pub mod retry;
pub mod settings;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use map::MapService;
pub use retry::{retry_with_backoff, RetryPolicy};
pub use settings::UploadSettings;
pub use upload::{UploadFinalizer, UploadInitiator};
