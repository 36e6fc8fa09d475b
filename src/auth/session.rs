use rand::Rng;
use rusqlite::{params, OptionalExtension};

use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::DbPool;

/// Maps bearer tokens to users. Each user holds at most one live token;
/// issuing a new one invalidates the previous.
#[derive(Clone)]
pub struct SessionDirectory {
    pool: DbPool,
}

impl SessionDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Rotate the user's session token. Returns the new token.
    pub fn issue(&self, user_id: &str) -> AppResult<String> {
        let conn = self.pool.get()?;
        let token = generate_token();

        let updated = conn.execute(
            "UPDATE users SET session_token = ?1 WHERE id = ?2",
            params![token, user_id],
        )?;
        if updated == 0 {
            return Err(AppError::NotFound);
        }

        Ok(token)
    }

    /// Resolve a token to the user currently holding it.
    pub fn resolve(&self, token: &str) -> AppResult<CurrentUser> {
        if token.is_empty() {
            return Err(AppError::Unauthenticated);
        }

        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT id, username FROM users WHERE session_token = ?1",
            params![token],
            |row| {
                Ok(CurrentUser {
                    id: row.get(0)?,
                    username: row.get(1)?,
                })
            },
        )
        .optional()?
        .ok_or(AppError::Unauthenticated)
    }

    /// Clear the token if it is still the user's live one.
    pub fn revoke(&self, token: &str) -> AppResult<()> {
        if token.is_empty() {
            return Ok(());
        }

        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE users SET session_token = NULL WHERE session_token = ?1",
            params![token],
        )?;
        Ok(())
    }
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn seed_user(pool: &DbPool, id: &str, username: &str) {
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO users (id, email, username, password_hash) VALUES (?1, ?2, ?3, 'h')",
            params![id, format!("{}@example.com", username), username],
        )
        .unwrap();
    }

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn issued_token_resolves_to_user() {
        let pool = test_pool();
        seed_user(&pool, "u1", "alice");
        let sessions = SessionDirectory::new(pool);

        let token = sessions.issue("u1").unwrap();
        let user = sessions.resolve(&token).unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.username, "alice");
    }

    #[test]
    fn reissue_supersedes_previous_token() {
        let pool = test_pool();
        seed_user(&pool, "u1", "alice");
        let sessions = SessionDirectory::new(pool);

        let first = sessions.issue("u1").unwrap();
        let second = sessions.issue("u1").unwrap();

        assert!(matches!(
            sessions.resolve(&first),
            Err(AppError::Unauthenticated)
        ));
        assert_eq!(sessions.resolve(&second).unwrap().id, "u1");
    }

    #[test]
    fn unknown_or_empty_token_is_unauthenticated() {
        let sessions = SessionDirectory::new(test_pool());
        assert!(matches!(
            sessions.resolve("nope"),
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(sessions.resolve(""), Err(AppError::Unauthenticated)));
    }

    #[test]
    fn issue_for_missing_user_is_not_found() {
        let sessions = SessionDirectory::new(test_pool());
        assert!(matches!(sessions.issue("ghost"), Err(AppError::NotFound)));
    }

    #[test]
    fn revoke_clears_live_token() {
        let pool = test_pool();
        seed_user(&pool, "u1", "alice");
        let sessions = SessionDirectory::new(pool);

        let token = sessions.issue("u1").unwrap();
        sessions.revoke(&token).unwrap();
        assert!(sessions.resolve(&token).is_err());
    }
}
