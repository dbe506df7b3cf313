//! User registration and authentication.

use super::{Database, ms_to_datetime, now_ms};
use crate::error::{AppError, AppResult};
use crate::types::User;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rusqlite::params;
use std::sync::OnceLock;
use tracing::debug;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 4;

/// Check username length and charset (ASCII letters, digits, underscore).
pub fn validate_username(username: &str) -> AppResult<()> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(AppError::validation(
            "username",
            format!("Username must be at least {} characters long.", MIN_USERNAME_LEN),
        ));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AppError::validation(
            "username",
            "Username can only contain letters, numbers, and underscores.",
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "password",
            format!("Password must be at least {} characters long.", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}

/// Hash a password into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::storage(format!("password hashing failed: {}", e)))
}

/// Constant-time check of `password` against a stored PHC string.
pub fn verify_password(password: &str, phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Hash verified when the username does not exist, so both failure paths cost the same.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash_password("taskflow-dummy-password").unwrap_or_default())
}

impl Database {
    /// Register a new user.
    pub fn create_user(&self, username: &str, password: &str) -> AppResult<User> {
        validate_username(username)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;
        let created_at = now_ms();

        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
                params![username],
                |row| row.get(0),
            )?;
            if exists {
                return Err(AppError::conflict("Username already exists.").with_field("username"));
            }

            conn.execute(
                "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
                params![username, password_hash, created_at],
            )?;
            Ok(())
        })?;

        debug!(username = %username, "User created");
        Ok(User {
            username: username.to_string(),
            created_at: ms_to_datetime(created_at),
        })
    }

    /// Look up a user without checking credentials.
    pub fn get_user(&self, username: &str) -> AppResult<Option<User>> {
        self.with_conn(|conn| {
            let result = conn.query_row(
                "SELECT created_at FROM users WHERE username = ?1",
                params![username],
                |row| row.get::<_, i64>(0),
            );
            match result {
                Ok(created_at) => Ok(Some(User {
                    username: username.to_string(),
                    created_at: ms_to_datetime(created_at),
                })),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Check credentials. Unknown users and wrong passwords fail identically.
    pub fn authenticate(&self, username: &str, password: &str) -> AppResult<User> {
        let stored: Option<(String, i64)> = self.with_conn(|conn| {
            let result = conn.query_row(
                "SELECT password_hash, created_at FROM users WHERE username = ?1",
                params![username],
                |row| Ok((row.get(0)?, row.get(1)?)),
            );
            match result {
                Ok(found) => Ok(Some(found)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })?;

        match stored {
            Some((phc, created_at)) if verify_password(password, &phc) => Ok(User {
                username: username.to_string(),
                created_at: ms_to_datetime(created_at),
            }),
            Some(_) => Err(AppError::auth_failure()),
            None => {
                verify_password(password, dummy_hash());
                Err(AppError::auth_failure())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(validate_username("al").is_err());
        assert!(validate_username("al ice").is_err());
        assert!(validate_username("al-ice").is_err());
        assert!(validate_username("alice_01").is_ok());
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("abc").is_err());
        assert!(validate_password("abcd").is_ok());
    }

    #[test]
    fn hash_is_salted_and_verifies() {
        let a = hash_password("secret").unwrap();
        let b = hash_password("secret").unwrap();
        assert_ne!(a, b);
        assert!(!a.contains("secret"));
        assert!(verify_password("secret", &a));
        assert!(!verify_password("Secret", &a));
        assert!(!verify_password("secret", "not-a-phc-string"));
    }
}
