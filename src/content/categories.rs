use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::Category;
use crate::error::AppResult;
use crate::state::DbPool;

/// Post ↔ category association over the seeded vocabulary.
#[derive(Clone)]
pub struct CategoryIndex {
    pool: DbPool,
}

impl CategoryIndex {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// The whole vocabulary, in seed order.
    pub fn all(&self) -> AppResult<Vec<Category>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY rowid")?;
        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// Look a category up by id or by name.
    pub fn resolve(&self, key: &str) -> AppResult<Option<Category>> {
        let conn = self.pool.get()?;
        Ok(resolve(&conn, key)?)
    }
}

pub(crate) fn resolve(conn: &Connection, key: &str) -> rusqlite::Result<Option<Category>> {
    conn.query_row(
        "SELECT id, name FROM categories WHERE id = ?1 OR name = ?1",
        params![key.trim()],
        |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()
}

pub(crate) fn attach(conn: &Connection, post_id: &str, category_id: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO post_categories (post_id, category_id) VALUES (?1, ?2)",
        params![post_id, category_id],
    )?;
    Ok(())
}

pub(crate) fn names_for_post(conn: &Connection, post_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT c.name FROM categories c
         JOIN post_categories pc ON pc.category_id = c.id
         WHERE pc.post_id = ?1
         ORDER BY c.rowid",
    )?;
    let names = stmt
        .query_map(params![post_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_pool, SEED_CATEGORIES};

    #[test]
    fn vocabulary_is_seeded_in_order() {
        let index = CategoryIndex::new(test_pool());
        let names: Vec<String> = index.all().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, SEED_CATEGORIES);
    }

    #[test]
    fn resolve_accepts_id_or_name() {
        let index = CategoryIndex::new(test_pool());
        let comedy = index.resolve("Comedy").unwrap().unwrap();
        assert_eq!(comedy.name, "Comedy");

        let by_id = index.resolve(&comedy.id).unwrap().unwrap();
        assert_eq!(by_id, comedy);

        assert!(index.resolve("Poetry").unwrap().is_none());
    }

    #[test]
    fn attach_is_idempotent_and_names_are_listed() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        conn.execute_batch(
            "INSERT INTO users (id, email, username, password_hash) VALUES ('u1', 'a@x.com', 'alice', 'h');
             INSERT INTO posts (id, user_id, content) VALUES ('p1', 'u1', 'hello');",
        )
        .unwrap();
        let fantasy = resolve(&conn, "Fantasy").unwrap().unwrap();
        let comedy = resolve(&conn, "Comedy").unwrap().unwrap();
        attach(&conn, "p1", &fantasy.id).unwrap();
        attach(&conn, "p1", &comedy.id).unwrap();
        attach(&conn, "p1", &comedy.id).unwrap();

        assert_eq!(names_for_post(&conn, "p1").unwrap(), vec!["Comedy", "Fantasy"]);
    }
}
