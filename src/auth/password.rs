use crate::errors::{Error, Result};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

/// Hashes a password into an Argon2 PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PasswordHash {
            message: e.to_string(),
        })
}

/// Checks a password against a stored PHC string.
///
/// Returns `Ok(false)` on mismatch; an unparseable stored hash is an error.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| Error::PasswordHash {
        message: format!("Invalid password hash in database: {e}"),
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() -> Result<()> {
        let hash = hash_password("s3cret-pass")?;
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret-pass", &hash)?);
        assert!(!verify_password("wrong-pass", &hash)?);
        Ok(())
    }

    #[test]
    fn test_same_password_gets_distinct_salts() -> Result<()> {
        let first = hash_password("repeat")?;
        let second = hash_password("repeat")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn test_garbage_hash_is_error() {
        let result = verify_password("anything", "not-a-phc-string");
        assert!(matches!(result, Err(Error::PasswordHash { .. })));
    }
}
