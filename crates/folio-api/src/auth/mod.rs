//! Caller identification.
//!
//! A request may carry a session (`Authorization: Bearer <jwt>`), a capability token
//! (`x-share-token`, with an optional PIN in `x-share-key`), both, or neither. The
//! extractor only turns these headers into a [`Caller`]; deciding what the caller may do
//! is left to the access engine.

mod caller_context;
mod session;

pub use caller_context::{CallerContext, SHARE_KEY_HEADER, SHARE_TOKEN_HEADER};
pub use session::{SessionClaims, SessionVerifier};
