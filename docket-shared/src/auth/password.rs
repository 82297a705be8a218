/// Password hashing and verification using Argon2id
///
/// # Parameters
///
/// Production defaults follow the OWASP recommendation for Argon2id:
///
/// - **Memory**: 64 MB (65536 KiB)
/// - **Iterations**: 3
/// - **Parallelism**: 4 lanes
/// - **Output**: 32 bytes
///
/// Parameters are embedded in the PHC string, so digests produced with
/// different parameters still verify.
///
/// # Example
///
/// ```
/// use docket_shared::auth::password::{hash_password_with, verify_password, HashParams};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let params = HashParams { memory_kib: 1024, iterations: 1, parallelism: 1 };
/// let digest = hash_password_with("password123", &params)?;
/// assert!(verify_password("password123", &digest)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Error type for password operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Stored digest is not a PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// Hashes a password with the default parameters
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    hash_password_with(password, &HashParams::default())
}

/// Hashes a password using Argon2id with the given parameters
///
/// A fresh random salt is generated for every call.
pub fn hash_password_with(password: &str, params: &HashParams) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(params.memory_kib)
        .t_cost(params.iterations)
        .p_cost(params.parallelism)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored digest
///
/// Returns `Ok(false)` for a wrong password and an error only when the
/// digest itself is unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    // Parameters come from the PHC string
    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Async front for the hashing functions
///
/// Argon2 is CPU bound, so both operations run on the blocking thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hasher {
    params: HashParams,
}

impl Hasher {
    pub fn new(params: HashParams) -> Self {
        Self { params }
    }

    pub async fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let password = password.to_owned();
        let params = self.params;
        tokio::task::spawn_blocking(move || hash_password_with(&password, &params))
            .await
            .map_err(|e| PasswordError::HashError(format!("Hashing task failed: {}", e)))?
    }

    pub async fn verify(&self, password: &str, digest: &str) -> Result<bool, PasswordError> {
        let password = password.to_owned();
        let digest = digest.to_owned();
        tokio::task::spawn_blocking(move || verify_password(&password, &digest))
            .await
            .map_err(|e| PasswordError::VerifyError(format!("Verification task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHEAP: HashParams = HashParams {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    };

    #[test]
    fn test_hash_password_default_params() {
        let hash = hash_password("test_password_123").expect("Hash should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m=65536"));
        assert!(hash.contains("t=3"));
        assert!(hash.contains("p=4"));
    }

    #[test]
    fn test_hash_password_produces_different_salts() {
        let hash1 = hash_password_with("same_password", &CHEAP).unwrap();
        let hash2 = hash_password_with("same_password", &CHEAP).unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password_with("correct_password", &CHEAP).unwrap();

        assert!(verify_password("correct_password", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("password", "invalid_hash").is_err());
        assert!(verify_password("password", "").is_err());

        // Parses as PHC but carries no hash, so it can never match
        assert!(!matches!(
            verify_password("password", "$argon2id$invalid"),
            Ok(true)
        ));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = HashParams {
            memory_kib: 1,
            iterations: 1,
            parallelism: 4,
        };
        assert!(matches!(
            hash_password_with("password", &params),
            Err(PasswordError::HashError(_))
        ));
    }

    #[tokio::test]
    async fn test_async_hasher_roundtrip() {
        let hasher = Hasher::new(CHEAP);
        let digest = hasher.hash("unicode-密码-パスワード").await.unwrap();

        assert!(hasher.verify("unicode-密码-パスワード", &digest).await.unwrap());
        assert!(!hasher.verify("other", &digest).await.unwrap());
    }
}
