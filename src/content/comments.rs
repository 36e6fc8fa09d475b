use rusqlite::{params, OptionalExtension};

use crate::content::posts;
use crate::db::models::Comment;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

#[derive(Clone)]
pub struct CommentStore {
    pool: DbPool,
}

impl CommentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn create(&self, post_id: &str, user_id: &str, content: &str) -> AppResult<String> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::validation(
                "Content is required to create a comment",
            ));
        }

        let conn = self.pool.get()?;
        if !posts::exists(&conn, post_id)? {
            return Err(AppError::NotFound);
        }

        let comment_id = uuid::Uuid::now_v7().to_string();
        conn.execute(
            "INSERT INTO comments (id, post_id, user_id, content) VALUES (?1, ?2, ?3, ?4)",
            params![comment_id, post_id, user_id, content],
        )?;

        Ok(comment_id)
    }

    /// Oldest first.
    pub fn for_post(&self, post_id: &str) -> AppResult<Vec<Comment>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.post_id, c.user_id, u.username, c.content, c.created_at, c.likes, c.dislikes
             FROM comments c
             JOIN users u ON u.id = c.user_id
             WHERE c.post_id = ?1
             ORDER BY c.created_at ASC, c.rowid ASC",
        )?;

        let comments = stmt
            .query_map(params![post_id], |row| {
                Ok(Comment {
                    id: row.get(0)?,
                    post_id: row.get(1)?,
                    user_id: row.get(2)?,
                    author: row.get(3)?,
                    content: row.get(4)?,
                    created_at: row.get(5)?,
                    likes: row.get(6)?,
                    dislikes: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(comments)
    }

    /// The post a comment belongs to, if the comment exists.
    pub fn parent_post(&self, comment_id: &str) -> AppResult<Option<String>> {
        let conn = self.pool.get()?;
        let post_id = conn
            .query_row(
                "SELECT post_id FROM comments WHERE id = ?1",
                params![comment_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(post_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn setup() -> CommentStore {
        let pool = test_pool();
        {
            let conn = pool.get().unwrap();
            conn.execute_batch(
                "INSERT INTO users (id, email, username, password_hash) VALUES ('u1', 'a@x.com', 'alice', 'h');
                 INSERT INTO users (id, email, username, password_hash) VALUES ('u2', 'b@x.com', 'bob', 'h');
                 INSERT INTO posts (id, user_id, content) VALUES ('p1', 'u1', 'hello');",
            )
            .unwrap();
        }
        CommentStore::new(pool)
    }

    #[test]
    fn comments_are_listed_oldest_first_with_authors() {
        let comments = setup();
        comments.create("p1", "u2", "first!").unwrap();
        comments.create("p1", "u1", " thanks ").unwrap();

        let listed = comments.for_post("p1").unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].author, "bob");
        assert_eq!(listed[0].content, "first!");
        assert_eq!(listed[1].author, "alice");
        assert_eq!(listed[1].content, "thanks");
    }

    #[test]
    fn empty_comment_is_rejected() {
        let comments = setup();
        let err = comments.create("p1", "u1", "  \n ").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(comments.for_post("p1").unwrap().is_empty());
    }

    #[test]
    fn comment_on_missing_post_is_not_found() {
        let comments = setup();
        let err = comments.create("nope", "u1", "hi").unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[test]
    fn parent_post_lookup() {
        let comments = setup();
        let id = comments.create("p1", "u1", "hi").unwrap();
        assert_eq!(comments.parent_post(&id).unwrap().as_deref(), Some("p1"));
        assert_eq!(comments.parent_post("missing").unwrap(), None);
    }
}
