pub mod access;
pub mod health;
pub mod map;
#[cfg(feature = "storage-local")]
pub mod media;
pub mod uploads;
