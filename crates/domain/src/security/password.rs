// crates/domain/src/security/password.rs

use argon2::{Argon2, PasswordHasher};
use password_hash::{rand_core::OsRng, PasswordHash, PasswordVerifier, SaltString};
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password too weak")]
    Weak,
    #[error(transparent)]
    Hash(#[from] password_hash::Error),
}

/// Minimum policy for account passwords hashed by the CLI.
pub fn validate_policy(pw: &str) -> Result<(), PasswordError> {
    if pw.chars().count() < 8 {
        return Err(PasswordError::Weak);
    }
    Ok(())
}

pub fn hash_password(pw: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    Ok(argon2.hash_password(pw.as_bytes(), &salt)?.to_string())
}

/// Check an account password against its stored PHC string.
pub fn verify_password(pw: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(pw.as_bytes(), &parsed)
        .is_ok())
}

/// Compare a supplied item password with the stored one in constant time.
pub fn item_password_matches(stored: &str, supplied: &str) -> bool {
    stored.as_bytes().ct_eq(supplied.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_rejects_short() {
        assert!(matches!(validate_policy("short"), Err(PasswordError::Weak)));
        assert!(validate_policy("longenough").is_ok());
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let h = hash_password("averystrongpassword").unwrap();
        assert!(h.starts_with("$argon2"));
        assert!(verify_password("averystrongpassword", &h).unwrap());
        assert!(!verify_password("wrong", &h).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(matches!(
            verify_password("x", "not-a-phc-string"),
            Err(PasswordError::Hash(_))
        ));
    }

    #[test]
    fn item_password_comparison() {
        assert!(item_password_matches("sesame", "sesame"));
        assert!(!item_password_matches("sesame", "Sesame"));
        assert!(!item_password_matches("sesame", ""));
    }
}
