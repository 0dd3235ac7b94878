/// Password hashing and password rules
///
/// Passwords are hashed with Argon2id (64 MB memory, 3 iterations, 4 lanes).
/// The PHC string output embeds salt and parameters, so verification needs
/// only the stored hash.
///
/// # Example
///
/// ```
/// use foodgram_shared::auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("correct horse battery").unwrap();
/// assert!(verify_password("correct horse battery", &hash).unwrap());
/// assert!(!verify_password("wrong", &hash).unwrap());
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Minimum password length in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Stored hash is not a valid PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = ParamsBuilder::new()
        .m_cost(65536) // 64 MB
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes `password` with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies `password` against a stored hash in constant time
///
/// Returns `Ok(false)` for a wrong password and an error only when the hash
/// itself is unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Password rules applied on registration and password change
///
/// `identities` are values the password must not equal (username, email),
/// compared case-insensitively.
pub fn validate_password_rules(password: &str, identities: &[&str]) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ));
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err("Password must not be entirely numeric".to_string());
    }

    let lowered = password.to_lowercase();
    if identities
        .iter()
        .any(|identity| !identity.is_empty() && identity.to_lowercase() == lowered)
    {
        return Err("Password must not match your username or email".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password_123").expect("Hash should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m=65536"));
        assert!(hash.contains("t=3"));
        assert!(hash.contains("p=4"));
    }

    #[test]
    fn test_hash_password_produces_different_salts() {
        let hash1 = hash_password("same_password").unwrap();
        let hash2 = hash_password("same_password").unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct_password").unwrap();

        assert!(verify_password("correct_password", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(matches!(
            verify_password("password", "invalid_hash"),
            Err(PasswordError::InvalidHash(_))
        ));
        // output is not valid B64
        assert!(matches!(
            verify_password("password", "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$!!!!"),
            Err(PasswordError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_verify_password_hash_without_output() {
        // parses, but carries no salt or output to compare against
        assert!(!verify_password("password", "$argon2id$invalid").unwrap());
    }

    #[test]
    fn test_unicode_password_roundtrip() {
        let hash = hash_password("пароль-密码-パスワード").unwrap();
        assert!(verify_password("пароль-密码-パスワード", &hash).unwrap());
    }

    #[test]
    fn test_password_rules_length() {
        assert!(validate_password_rules("short1!", &[]).unwrap_err().contains("at least 8"));
        assert!(validate_password_rules("long enough", &[]).is_ok());
        // counted in characters, not bytes
        assert!(validate_password_rules("пароль1", &[]).is_err());
    }

    #[test]
    fn test_password_rules_numeric() {
        let err = validate_password_rules("1234567890", &[]).unwrap_err();
        assert!(err.contains("numeric"));
        assert!(validate_password_rules("12345678a", &[]).is_ok());
    }

    #[test]
    fn test_password_rules_identity() {
        let identities = ["julia.child", "julia@example.com"];
        assert!(validate_password_rules("Julia.Child", &identities).is_err());
        assert!(validate_password_rules("JULIA@example.com", &identities).is_err());
        assert!(validate_password_rules("bouillabaisse", &identities).is_ok());
    }
}
