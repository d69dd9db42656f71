//! Data models for the application
//!
//! Access-control types (permission levels, capability tokens, principals, decisions)
//! and the persisted entities they protect.

mod comment;
mod decision;
mod file;
mod folder;
mod permission;
mod principal;
mod token;
mod upload;

pub use comment::*;
pub use decision::*;
pub use file::*;
pub use folder::*;
pub use permission::*;
pub use principal::*;
pub use token::*;
pub use upload::*;
