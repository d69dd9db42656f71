//! Folio Access Library
//!
//! Capability-based access control. A request's identity inputs ([`Caller`]) are
//! resolved into one [`Principal`](folio_core::Principal); every protected operation
//! then asks a [`ResourceEnforcer`] for a [`Decision`](folio_core::Decision) and
//! proceeds only when it is allowed. Decisions are recomputed on every request.

pub mod caller;
pub mod enforcer;
pub mod evaluator;
pub mod pin;
pub mod resolver;
pub mod resource;

// Re-export commonly used types
pub use caller::Caller;
pub use enforcer::ResourceEnforcer;
pub use evaluator::PermissionEvaluator;
pub use pin::PasswordHashGate;
pub use resolver::PrincipalResolver;
pub use resource::{ProtectedResource, ResourceKind, ResourceRef};
