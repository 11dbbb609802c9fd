use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::ServiceError;

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            ServiceError::BadRequest("Password could not be processed".to_string())
        })
}

/// Stored hashes that are not in PHC format never verify.
pub fn verify_password(password: &str, hashed: &str) -> Result<(), argon2::password_hash::Error> {
    let argon2 = Argon2::default();
    let parsed = PasswordHash::new(hashed)?;

    argon2.verify_password(password.as_bytes(), &parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hash = hash_password("32193").unwrap();
        assert!(verify_password("32193", &hash).is_ok());
        assert!(verify_password("32194", &hash).is_err());
    }

    #[test]
    fn legacy_hex_digests_are_rejected() {
        let sha = "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8";
        assert!(verify_password("password", sha).is_err());
    }
}
