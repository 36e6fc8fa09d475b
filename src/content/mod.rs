pub mod categories;
pub mod comments;
pub mod posts;
pub mod reactions;
