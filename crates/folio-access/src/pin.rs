//! PIN hashing and verification.
//!
//! Stored hashes are argon2 PHC strings; bcrypt hashes (`$2a$`, `$2b$`, `$2y$`) issued
//! by older share links are still accepted.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use folio_core::{AppError, PinHash};
use rand_core::OsRng;

const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

pub struct PasswordHashGate;

impl PasswordHashGate {
    /// Check a caller-supplied PIN against a stored hash.
    ///
    /// CPU-bound; async callers run it through `spawn_blocking`. A malformed stored
    /// hash verifies as false.
    pub fn verify(supplied: &str, stored: &PinHash) -> bool {
        let hash = stored.as_str();
        if BCRYPT_PREFIXES.iter().any(|p| hash.starts_with(p)) {
            return bcrypt::verify(supplied, hash).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Stored bcrypt PIN hash is malformed");
                false
            });
        }

        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(supplied.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored PIN hash is not a PHC string");
                false
            }
        }
    }

    /// Hash a new PIN for storage.
    pub fn hash(pin: &str) -> Result<PinHash, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(pin.as_bytes(), &salt)
            .map(|hash| PinHash::new(hash.to_string()))
            .map_err(|e| AppError::Internal(format!("Failed to hash PIN: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argon2_round_trip() {
        let stored = PasswordHashGate::hash("1234").unwrap();
        assert!(stored.as_str().starts_with("$argon2"));
        assert!(PasswordHashGate::verify("1234", &stored));
        assert!(!PasswordHashGate::verify("9999", &stored));
    }

    #[test]
    fn test_bcrypt_hashes_are_accepted() {
        let stored = PinHash::new(bcrypt::hash("1234", 4).unwrap());
        assert!(PasswordHashGate::verify("1234", &stored));
        assert!(!PasswordHashGate::verify("4321", &stored));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!PasswordHashGate::verify("1234", &PinHash::new("1234")));
        assert!(!PasswordHashGate::verify("", &PinHash::new("")));
        assert!(!PasswordHashGate::verify("1234", &PinHash::new("$2b$garbage")));
    }

    #[test]
    fn test_same_pin_hashes_differently() {
        let a = PasswordHashGate::hash("1234").unwrap();
        let b = PasswordHashGate::hash("1234").unwrap();
        assert_ne!(a, b);
    }
}
