//! Identity store: account creation, credential checks, bearer tokens.
//!
//! Tokens are opaque random strings bound 1:1 to a user and reused across
//! logins.  Every scoped store call takes the resolved user explicitly;
//! there is no ambient "current user" state.

use chrono::{DateTime, Utc};
use rand::RngCore;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;
use crate::password;

/// Minimum accepted password length, checked on create and profile update.
const MIN_PASSWORD_LEN: usize = 5;

const USER_COLUMNS: &str = "id, email, name, password_hash, is_staff, is_superuser, created_at";

/// Lower-case the domain segment of an email address, leaving the local part
/// untouched.  Addresses without `@` are returned as given.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

fn validate_password(plain: &str) -> Result<()> {
    if plain.len() < MIN_PASSWORD_LEN {
        return Err(StoreError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl Database {
    /// Create a regular account.  The password is hashed before persisting;
    /// the plaintext is never stored.
    pub fn create_user(&self, email: &str, plain_password: &str, name: &str) -> Result<User> {
        self.insert_user(email, plain_password, name, false)
    }

    /// Create an account with elevated-privilege flags set.
    pub fn create_superuser(&self, email: &str, plain_password: &str) -> Result<User> {
        self.insert_user(email, plain_password, "", true)
    }

    fn insert_user(
        &self,
        email: &str,
        plain_password: &str,
        name: &str,
        elevated: bool,
    ) -> Result<User> {
        if email.trim().is_empty() {
            return Err(StoreError::Validation("email must not be empty".into()));
        }
        validate_password(plain_password)?;

        let email = normalize_email(email);
        let hash = password::hash_password(plain_password)?;
        let now = Utc::now();

        let inserted = self.conn().execute(
            "INSERT INTO users (email, name, password_hash, is_staff, is_superuser, created_at)
             VALUES (?1, ?2, ?3, ?4, ?4, ?5)",
            params![email, name, hash, elevated, now.to_rfc3339()],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(StoreError::Validation("email already registered".into()));
            }
            Err(e) => return Err(e.into()),
        }

        let id = self.conn().last_insert_rowid();
        tracing::info!(user = id, "created user");
        self.get_user(id)
    }

    /// Fetch an account by id.
    pub fn get_user(&self, id: i64) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                row_to_user,
            )
            .optional()?
            .ok_or(StoreError::NotFound)
    }

    /// Fetch an account by (normalized) email, if it exists.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = normalize_email(email);
        Ok(self
            .conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                row_to_user,
            )
            .optional()?)
    }

    /// Check credentials and return the user's bearer token.
    ///
    /// Unknown email, wrong password, and empty password all fail with the
    /// same [`StoreError::Auth`]; the caller cannot tell which check
    /// triggered.
    pub fn authenticate(&self, email: &str, plain_password: &str) -> Result<String> {
        if plain_password.is_empty() {
            return Err(StoreError::Auth);
        }
        let user = self.get_user_by_email(email)?.ok_or(StoreError::Auth)?;
        if !password::verify_password(plain_password, &user.password_hash) {
            return Err(StoreError::Auth);
        }
        self.token_for_user(user.id)
    }

    /// Return the user's existing token or issue a fresh one.
    fn token_for_user(&self, user_id: i64) -> Result<String> {
        let existing: Option<String> = self
            .conn()
            .query_row(
                "SELECT token FROM tokens WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(token) = existing {
            return Ok(token);
        }

        let mut bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        self.conn().execute(
            "INSERT INTO tokens (token, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![token, user_id, Utc::now().to_rfc3339()],
        )?;
        tracing::debug!(user = user_id, "issued token");
        Ok(token)
    }

    /// Resolve a bearer token back to its user.
    pub fn user_for_token(&self, token: &str) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT u.id, u.email, u.name, u.password_hash, u.is_staff, u.is_superuser, u.created_at
                 FROM users u JOIN tokens t ON t.user_id = u.id
                 WHERE t.token = ?1",
                params![token],
                row_to_user,
            )
            .optional()?
            .ok_or(StoreError::Auth)
    }

    /// Self-service profile update.  Email is immutable via this path; a
    /// supplied password is length-checked and re-hashed.
    pub fn update_profile(
        &self,
        user_id: i64,
        name: Option<&str>,
        plain_password: Option<&str>,
    ) -> Result<User> {
        if let Some(plain) = plain_password {
            validate_password(plain)?;
        }

        if let Some(name) = name {
            self.conn().execute(
                "UPDATE users SET name = ?1 WHERE id = ?2",
                params![name, user_id],
            )?;
        }
        if let Some(plain) = plain_password {
            let hash = password::hash_password(plain)?;
            self.conn().execute(
                "UPDATE users SET password_hash = ?1 WHERE id = ?2",
                params![hash, user_id],
            )?;
        }
        self.get_user(user_id)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let ts_str: String = row.get(6)?;
    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&ts_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        password_hash: row.get(3)?,
        is_staff: row.get(4)?,
        is_superuser: row.get(5)?,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_create_user_hashes_password() {
        let db = test_db();
        let user = db
            .create_user("test@example.com", "testpassword123", "Test")
            .unwrap();

        assert_eq!(user.email, "test@example.com");
        assert_ne!(user.password_hash, "testpassword123");
        assert!(password::verify_password(
            "testpassword123",
            &user.password_hash
        ));
    }

    #[test]
    fn test_email_domain_is_normalized() {
        let cases = [
            ("testuser@example.com", "testuser@example.com"),
            ("Testuser@EXAMPLE.com", "Testuser@example.com"),
            ("TESTUSER@example.COM", "TESTUSER@example.com"),
            ("testUser@Example.Com", "testUser@example.com"),
        ];

        for (i, (input, expected)) in cases.iter().enumerate() {
            let db = test_db();
            let user = db
                .create_user(input, &format!("testpassword{i}"), "")
                .unwrap();
            assert_eq!(user.email, *expected);
        }
    }

    #[test]
    fn test_empty_email_rejected() {
        let db = test_db();
        let err = db.create_user("", "testpassword123", "").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_short_password_rejected() {
        let db = test_db();
        let err = db.create_user("test@example.com", "test", "").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        // The account must not have been created.
        assert!(db.get_user_by_email("test@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let db = test_db();
        db.create_user("test@example.com", "testpassword123", "")
            .unwrap();
        let err = db
            .create_user("test@example.com", "otherpassword", "")
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_create_superuser_sets_flags() {
        let db = test_db();
        let user = db
            .create_superuser("admin@example.com", "adminpassword1234")
            .unwrap();
        assert!(user.is_staff);
        assert!(user.is_superuser);

        let regular = db
            .create_user("user@example.com", "userpassword", "")
            .unwrap();
        assert!(!regular.is_staff);
        assert!(!regular.is_superuser);
    }

    #[test]
    fn test_authenticate_issues_token() {
        let db = test_db();
        db.create_user("test@example.com", "testpassword123", "")
            .unwrap();

        let token = db.authenticate("test@example.com", "testpassword123").unwrap();
        assert!(!token.is_empty());

        let user = db.user_for_token(&token).unwrap();
        assert_eq!(user.email, "test@example.com");
    }

    #[test]
    fn test_token_is_reused_across_logins() {
        let db = test_db();
        db.create_user("test@example.com", "testpassword123", "")
            .unwrap();

        let first = db.authenticate("test@example.com", "testpassword123").unwrap();
        let second = db.authenticate("test@example.com", "testpassword123").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_authenticate_failures_are_uniform() {
        let db = test_db();
        db.create_user("test@example.com", "testpassword123", "")
            .unwrap();

        for (email, pass) in [
            ("test@example.com", "wrongpass"),
            ("unknown@example.com", "testpassword123"),
            ("test@example.com", ""),
        ] {
            let err = db.authenticate(email, pass).unwrap_err();
            assert!(matches!(err, StoreError::Auth), "{email}/{pass}");
        }
    }

    #[test]
    fn test_authenticate_with_unnormalized_email() {
        let db = test_db();
        db.create_user("test@Example.COM", "testpassword123", "")
            .unwrap();
        assert!(db.authenticate("test@example.com", "testpassword123").is_ok());
    }

    #[test]
    fn test_unknown_token_rejected() {
        let db = test_db();
        let err = db.user_for_token("deadbeef").unwrap_err();
        assert!(matches!(err, StoreError::Auth));
    }

    #[test]
    fn test_update_profile() {
        let db = test_db();
        let user = db
            .create_user("test@example.com", "testpassword123", "Before")
            .unwrap();

        let updated = db
            .update_profile(user.id, Some("After"), Some("newpassword456"))
            .unwrap();
        assert_eq!(updated.name, "After");
        assert_eq!(updated.email, "test@example.com");
        assert!(password::verify_password(
            "newpassword456",
            &updated.password_hash
        ));
        assert!(db.authenticate("test@example.com", "newpassword456").is_ok());
    }

    #[test]
    fn test_update_profile_short_password_leaves_name() {
        let db = test_db();
        let user = db
            .create_user("test@example.com", "testpassword123", "Before")
            .unwrap();

        let err = db
            .update_profile(user.id, Some("After"), Some("x"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(db.get_user(user.id).unwrap().name, "Before");
    }
}
