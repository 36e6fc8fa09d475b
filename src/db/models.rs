use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub session_token: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    /// Username of the author
    pub author: String,
    pub content: String,
    pub created_at: String,
    pub image_path: Option<String>,
    pub likes: i64,
    pub dislikes: i64,
    /// Category names, in vocabulary order
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub author: String,
    pub content: String,
    pub created_at: String,
    pub likes: i64,
    pub dislikes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// Direction of a reaction. Stored as the `is_like` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    Like,
    Dislike,
}

impl Polarity {
    pub fn is_like(self) -> bool {
        matches!(self, Polarity::Like)
    }

    pub fn from_is_like(is_like: bool) -> Self {
        if is_like {
            Polarity::Like
        } else {
            Polarity::Dislike
        }
    }
}

/// Something a user can react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Post(String),
    Comment(String),
}

impl Target {
    pub fn id(&self) -> &str {
        match self {
            Target::Post(id) | Target::Comment(id) => id,
        }
    }

    /// Table holding the cached counters for this kind of target.
    pub(crate) fn content_table(&self) -> &'static str {
        match self {
            Target::Post(_) => "posts",
            Target::Comment(_) => "comments",
        }
    }

    /// Ledger table and its foreign-key column.
    pub(crate) fn ledger(&self) -> (&'static str, &'static str) {
        match self {
            Target::Post(_) => ("post_likes", "post_id"),
            Target::Comment(_) => ("comment_likes", "comment_id"),
        }
    }
}

/// Cached like/dislike counts for a target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub likes: i64,
    pub dislikes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polarity_maps_to_is_like_column() {
        assert!(Polarity::Like.is_like());
        assert!(!Polarity::Dislike.is_like());
        assert_eq!(Polarity::from_is_like(true), Polarity::Like);
        assert_eq!(Polarity::from_is_like(false), Polarity::Dislike);
    }

    #[test]
    fn target_selects_its_tables() {
        let post = Target::Post("p1".into());
        let comment = Target::Comment("c1".into());
        assert_eq!(post.id(), "p1");
        assert_eq!(post.content_table(), "posts");
        assert_eq!(post.ledger(), ("post_likes", "post_id"));
        assert_eq!(comment.content_table(), "comments");
        assert_eq!(comment.ledger(), ("comment_likes", "comment_id"));
    }
}
