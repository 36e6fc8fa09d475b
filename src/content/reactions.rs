//! Reaction ledger: each user's current like or dislike on a post or comment.
//!
//! The ledger rows are the only authority for counts. The `likes`/`dislikes`
//! columns on posts and comments are a cache that [`ReactionLedger::refresh_counters`]
//! rebuilds from the ledger.
//!
//! [`ReactionLedger::set_reaction`] and [`ReactionLedger::refresh_counters`] are
//! independent calls; a request racing between them can observe stale counters.
//! [`ReactionLedger::react`] runs both in one transaction and is what the HTTP
//! handlers use.

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::{Counters, Polarity, Target};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// What a toggle did to the ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChange {
    Added,
    /// Same polarity requested twice: the reaction was withdrawn
    Removed,
    Flipped,
}

#[derive(Clone)]
pub struct ReactionLedger {
    pool: DbPool,
}

impl ReactionLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Toggle the user's reaction. Counters are left untouched.
    pub fn set_reaction(
        &self,
        user_id: &str,
        target: &Target,
        polarity: Polarity,
    ) -> AppResult<ReactionChange> {
        let conn = self.pool.get()?;
        Ok(set_reaction(&conn, user_id, target, polarity)?)
    }

    /// Recount the ledger for `target` and overwrite its cached counters.
    pub fn refresh_counters(&self, target: &Target) -> AppResult<Counters> {
        let conn = self.pool.get()?;
        Ok(refresh_counters(&conn, target)?)
    }

    pub fn current_reaction(&self, user_id: &str, target: &Target) -> AppResult<Option<Polarity>> {
        let conn = self.pool.get()?;
        Ok(current_reaction(&conn, user_id, target)?.map(|(_, polarity)| polarity))
    }

    /// Toggle and recount atomically. Fails with `NotFound` for a missing target.
    pub fn react(&self, user_id: &str, target: &Target, polarity: Polarity) -> AppResult<Counters> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        if !target_exists(&tx, target)? {
            return Err(AppError::NotFound);
        }

        let change = set_reaction(&tx, user_id, target, polarity)?;
        let counters = refresh_counters(&tx, target)?;
        tx.commit()?;

        tracing::debug!(
            "User {} {:?} {:?} on {:?}: {:?}",
            user_id,
            change,
            polarity,
            target,
            counters
        );
        Ok(counters)
    }
}

fn current_reaction(
    conn: &Connection,
    user_id: &str,
    target: &Target,
) -> rusqlite::Result<Option<(String, Polarity)>> {
    let (table, column) = target.ledger();
    conn.query_row(
        &format!(
            "SELECT id, is_like FROM {} WHERE user_id = ?1 AND {} = ?2",
            table, column
        ),
        params![user_id, target.id()],
        |row| Ok((row.get(0)?, Polarity::from_is_like(row.get(1)?))),
    )
    .optional()
}

fn set_reaction(
    conn: &Connection,
    user_id: &str,
    target: &Target,
    polarity: Polarity,
) -> rusqlite::Result<ReactionChange> {
    let (table, column) = target.ledger();

    match current_reaction(conn, user_id, target)? {
        None => {
            conn.execute(
                &format!(
                    "INSERT INTO {} (id, user_id, {}, is_like) VALUES (?1, ?2, ?3, ?4)",
                    table, column
                ),
                params![
                    uuid::Uuid::now_v7().to_string(),
                    user_id,
                    target.id(),
                    polarity.is_like()
                ],
            )?;
            Ok(ReactionChange::Added)
        }
        Some((id, existing)) if existing == polarity => {
            conn.execute(&format!("DELETE FROM {} WHERE id = ?1", table), params![id])?;
            Ok(ReactionChange::Removed)
        }
        Some((id, _)) => {
            conn.execute(
                &format!("UPDATE {} SET is_like = ?1 WHERE id = ?2", table),
                params![polarity.is_like(), id],
            )?;
            Ok(ReactionChange::Flipped)
        }
    }
}

fn refresh_counters(conn: &Connection, target: &Target) -> rusqlite::Result<Counters> {
    let (table, column) = target.ledger();

    let counters = conn.query_row(
        &format!(
            "SELECT COALESCE(SUM(is_like = 1), 0), COALESCE(SUM(is_like = 0), 0)
             FROM {} WHERE {} = ?1",
            table, column
        ),
        params![target.id()],
        |row| {
            Ok(Counters {
                likes: row.get(0)?,
                dislikes: row.get(1)?,
            })
        },
    )?;

    conn.execute(
        &format!(
            "UPDATE {} SET likes = ?1, dislikes = ?2 WHERE id = ?3",
            target.content_table()
        ),
        params![counters.likes, counters.dislikes, target.id()],
    )?;

    Ok(counters)
}

fn target_exists(conn: &Connection, target: &Target) -> rusqlite::Result<bool> {
    conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)",
            target.content_table()
        ),
        params![target.id()],
        |row| row.get(0),
    )
}
