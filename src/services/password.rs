use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::errors::BlogError;

/// Salted one-way hashing of account passwords.
pub trait PasswordHashing: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, BlogError>;

    /// `false` for a wrong password and for a malformed stored hash alike.
    fn verify(&self, password: &str, stored_hash: &str) -> bool;
}

/// Argon2id with the crate's default cost parameters, PHC string output.
#[derive(Default)]
pub struct Argon2Hashing {
    argon2: Argon2<'static>,
}

impl PasswordHashing for Argon2Hashing {
    fn hash(&self, password: &str) -> Result<String, BlogError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| BlogError::Internal(format!("password hashing failed: {}", e)))
    }

    fn verify(&self, password: &str, stored_hash: &str) -> bool {
        match PasswordHash::new(stored_hash) {
            Ok(parsed) => self.argon2.verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }
}
