use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::content::categories;
use crate::db::models::Post;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// Which posts a listing should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    All,
    /// Category id or name
    Category(String),
    AuthoredBy(String),
    /// Posts the user currently likes
    LikedBy(String),
}

impl PostFilter {
    /// `?category=` on the front page; blank means no filter.
    pub fn from_category_param(param: Option<&str>) -> Self {
        match param.map(str::trim) {
            Some(key) if !key.is_empty() => PostFilter::Category(key.to_string()),
            _ => PostFilter::All,
        }
    }
}

/// Input for a new post, before validation.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub content: String,
    pub categories: Vec<String>,
    pub image_path: Option<String>,
}

impl NewPost {
    /// Checks that need no database: non-blank content, at least one category.
    pub fn validate(&self) -> AppResult<()> {
        if self.content.trim().is_empty() || self.categories.is_empty() {
            return Err(AppError::validation(
                "Content and at least one category are required to create a post",
            ));
        }
        Ok(())
    }
}

const POST_COLUMNS: &str = "p.id, p.user_id, u.username, p.content, p.created_at, \
                            p.image_path, p.likes, p.dislikes";

#[derive(Clone)]
pub struct PostStore {
    pool: DbPool,
}

impl PostStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Validate and persist a post with its categories. Returns the post id.
    ///
    /// Every category is resolved before anything is written, so a rejected
    /// post leaves no rows behind.
    pub fn create(&self, user_id: &str, new_post: NewPost) -> AppResult<String> {
        new_post.validate()?;
        let content = new_post.content.trim();

        let mut conn = self.pool.get()?;

        let mut category_ids = Vec::with_capacity(new_post.categories.len());
        for key in &new_post.categories {
            let category = categories::resolve(&conn, key)?
                .ok_or_else(|| AppError::validation(format!("Unknown category: {}", key)))?;
            category_ids.push(category.id);
        }

        let post_id = uuid::Uuid::now_v7().to_string();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO posts (id, user_id, content, image_path) VALUES (?1, ?2, ?3, ?4)",
            params![post_id, user_id, content, new_post.image_path],
        )?;
        for category_id in &category_ids {
            categories::attach(&tx, &post_id, category_id)?;
        }
        tx.commit()?;

        tracing::info!("User {} created post {}", user_id, post_id);
        Ok(post_id)
    }

    pub fn get(&self, post_id: &str) -> AppResult<Post> {
        let conn = self.pool.get()?;
        let post = conn
            .query_row(
                &format!(
                    "SELECT {} FROM posts p JOIN users u ON u.id = p.user_id WHERE p.id = ?1",
                    POST_COLUMNS
                ),
                params![post_id],
                post_from_row,
            )
            .optional()?
            .ok_or(AppError::NotFound)?;
        Ok(with_categories(&conn, post)?)
    }

    /// Newest first, each with its author and category names.
    pub fn list(&self, filter: &PostFilter) -> AppResult<Vec<Post>> {
        let conn = self.pool.get()?;

        let (clause, arg) = match filter {
            PostFilter::All => ("", None),
            PostFilter::Category(key) => match categories::resolve(&conn, key)? {
                Some(category) => (
                    "JOIN post_categories pc ON pc.post_id = p.id WHERE pc.category_id = ?1",
                    Some(category.id),
                ),
                None => return Ok(Vec::new()),
            },
            PostFilter::AuthoredBy(user_id) => ("WHERE p.user_id = ?1", Some(user_id.clone())),
            PostFilter::LikedBy(user_id) => (
                "JOIN post_likes pl ON pl.post_id = p.id WHERE pl.user_id = ?1 AND pl.is_like = 1",
                Some(user_id.clone()),
            ),
        };

        let sql = format!(
            "SELECT {} FROM posts p JOIN users u ON u.id = p.user_id {}
             ORDER BY p.created_at DESC, p.rowid DESC",
            POST_COLUMNS, clause
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = match arg {
            Some(arg) => stmt.query_map(params![arg], post_from_row)?,
            None => stmt.query_map([], post_from_row)?,
        }
        .collect::<Result<Vec<_>, _>>()?;

        let posts = rows
            .into_iter()
            .map(|post| with_categories(&conn, post))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }
}

pub(crate) fn exists(conn: &Connection, post_id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
        params![post_id],
        |row| row.get(0),
    )
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        user_id: row.get(1)?,
        author: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        image_path: row.get(5)?,
        likes: row.get(6)?,
        dislikes: row.get(7)?,
        categories: Vec::new(),
    })
}

fn with_categories(conn: &Connection, mut post: Post) -> rusqlite::Result<Post> {
    post.categories = categories::names_for_post(conn, &post.id)?;
    Ok(post)
}
