use std::sync::LazyLock;

use regex::Regex;
use rusqlite::{params, ErrorCode, OptionalExtension};

use crate::auth::session::SessionDirectory;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// A freshly registered account, already logged in.
#[derive(Debug, Clone)]
pub struct Registration {
    pub user_id: String,
    pub session_token: String,
}

/// User records: unique email and username, bcrypt password hashes.
#[derive(Clone)]
pub struct CredentialStore {
    pool: DbPool,
    sessions: SessionDirectory,
    bcrypt_cost: u32,
}

impl CredentialStore {
    pub fn new(pool: DbPool, sessions: SessionDirectory, bcrypt_cost: u32) -> Self {
        Self {
            pool,
            sessions,
            bcrypt_cost,
        }
    }

    pub fn email_exists(&self, email: &str) -> AppResult<bool> {
        let conn = self.pool.get()?;
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
            params![email],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn username_exists(&self, username: &str) -> AppResult<bool> {
        let conn = self.pool.get()?;
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
            params![username],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Create an account and log it in.
    pub fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> AppResult<Registration> {
        let email = email.trim();
        let username = username.trim();

        if !is_valid_email(email) {
            return Err(AppError::validation("Invalid email format"));
        }
        if username.is_empty() {
            return Err(AppError::validation("Username is required"));
        }
        if password.is_empty() {
            return Err(AppError::validation("Password is required"));
        }
        if self.email_exists(email)? {
            return Err(AppError::validation("Email is already registered"));
        }
        if self.username_exists(username)? {
            return Err(AppError::validation("Username is already taken"));
        }

        let password_hash = bcrypt::hash(password, self.bcrypt_cost)
            .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))?;
        let user_id = uuid::Uuid::now_v7().to_string();

        {
            let conn = self.pool.get()?;
            conn.execute(
                "INSERT INTO users (id, email, username, password_hash) VALUES (?1, ?2, ?3, ?4)",
                params![user_id, email, username, password_hash],
            )
            .map_err(|e| match e {
                // Lost a race with a concurrent registration for the same email or username
                rusqlite::Error::SqliteFailure(ref f, _)
                    if f.code == ErrorCode::ConstraintViolation =>
                {
                    AppError::validation("Email or username is already in use")
                }
                other => other.into(),
            })?;
        }

        let session_token = self.sessions.issue(&user_id)?;

        tracing::info!("Registered user {} ({})", username, user_id);
        Ok(Registration {
            user_id,
            session_token,
        })
    }

    /// Check credentials and rotate the session token. Returns the new token.
    pub fn authenticate(&self, email: &str, password: &str) -> AppResult<String> {
        let user = self
            .find_by_email(email.trim())?
            .ok_or(AppError::InvalidCredentials)?;

        // bcrypt::verify compares in constant time
        if !bcrypt::verify(password, &user.password_hash).unwrap_or(false) {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.sessions.issue(&user.id)?;
        tracing::info!("User {} logged in", user.id);
        Ok(token)
    }

    pub fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                "SELECT id, email, username, password_hash, session_token, created_at
                 FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        username: row.get(2)?,
                        password_hash: row.get(3)?,
                        session_token: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn store() -> CredentialStore {
        let pool = test_pool();
        CredentialStore::new(pool.clone(), SessionDirectory::new(pool), 4)
    }

    fn user_count(store: &CredentialStore) -> i64 {
        let conn = store.pool.get().unwrap();
        conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last+tag@mail.example.org"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("a@x.c"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn register_stores_hashed_password_and_logs_in() {
        let store = store();
        let reg = store.register("a@x.com", "alice", "pw").unwrap();

        let user = store.find_by_email("a@x.com").unwrap().unwrap();
        assert_eq!(user.id, reg.user_id);
        assert_eq!(user.username, "alice");
        assert_ne!(user.password_hash, "pw");
        assert!(bcrypt::verify("pw", &user.password_hash).unwrap());
        assert_eq!(user.session_token.as_deref(), Some(reg.session_token.as_str()));
    }

    #[test]
    fn register_rejects_bad_email() {
        let store = store();
        let err = store.register("not-an-email", "alice", "pw").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(user_count(&store), 0);
    }

    #[test]
    fn duplicate_email_is_rejected_without_new_row() {
        let store = store();
        store.register("a@x.com", "alice", "pw").unwrap();

        let err = store.register("a@x.com", "bob", "pw").unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Email is already registered"));
        assert_eq!(user_count(&store), 1);
    }

    #[test]
    fn duplicate_username_is_rejected_without_new_row() {
        let store = store();
        store.register("a@x.com", "alice", "pw").unwrap();

        let err = store.register("b@x.com", "alice", "pw").unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Username is already taken"));
        assert_eq!(user_count(&store), 1);
    }

    #[test]
    fn authenticate_rotates_token() {
        let store = store();
        let reg = store.register("a@x.com", "alice", "pw").unwrap();

        let token = store.authenticate("a@x.com", "pw").unwrap();
        assert_ne!(token, reg.session_token);

        let user = store.find_by_email("a@x.com").unwrap().unwrap();
        assert_eq!(user.session_token.as_deref(), Some(token.as_str()));
    }

    #[test]
    fn login_tokens_go_through_the_session_directory() {
        let pool = test_pool();
        let sessions = SessionDirectory::new(pool.clone());
        let store = CredentialStore::new(pool, sessions.clone(), 4);

        let reg = store.register("a@x.com", "alice", "pw").unwrap();
        assert_eq!(sessions.resolve(&reg.session_token).unwrap().username, "alice");

        let token = store.authenticate("a@x.com", "pw").unwrap();
        assert_eq!(sessions.resolve(&token).unwrap().id, reg.user_id);
        assert!(matches!(
            sessions.resolve(&reg.session_token),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn wrong_password_keeps_stored_token() {
        let store = store();
        let reg = store.register("a@x.com", "alice", "pw").unwrap();

        let err = store.authenticate("a@x.com", "wrong").unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        let user = store.find_by_email("a@x.com").unwrap().unwrap();
        assert_eq!(user.session_token.as_deref(), Some(reg.session_token.as_str()));
    }

    #[test]
    fn unknown_email_is_invalid_credentials() {
        let err = store().authenticate("nobody@x.com", "pw").unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }
}
