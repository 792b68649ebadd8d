use rusqlite::{params, Transaction};

use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// A vote lands on exactly one of these. Requests naming both a post and a
/// comment, or neither, never construct a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTarget {
    Post(i64),
    Comment(i64),
}

impl VoteTarget {
    /// Build a target from optional form fields, enforcing the XOR rule.
    pub fn from_ids(post_id: Option<i64>, comment_id: Option<i64>) -> AppResult<Self> {
        match (post_id, comment_id) {
            (Some(p), None) => Ok(VoteTarget::Post(p)),
            (None, Some(c)) => Ok(VoteTarget::Comment(c)),
            _ => Err(AppError::InvalidInput(
                "Must provide either post_id or comment_id".into(),
            )),
        }
    }
}

/// Tri-state toggle over (user, target):
///
/// - no existing vote: insert with the desired polarity
/// - existing vote, same polarity: delete (cancel)
/// - existing vote, opposite polarity: flip
///
/// The existence check and the read-modify-write run inside one
/// transaction, so a target deleted mid-request is a clean rejection and
/// two simultaneous clicks by the same user resolve deterministically;
/// the partial unique indexes backstop anything that still races.
pub fn cast(pool: &DbPool, user_id: i64, target: VoteTarget, is_like: bool) -> AppResult<()> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    if !target_exists(&tx, target)? {
        let what = match target {
            VoteTarget::Post(_) => "Post not found",
            VoteTarget::Comment(_) => "Comment not found",
        };
        return Err(AppError::InvalidInput(what.into()));
    }
    match existing_vote(&tx, user_id, target)? {
        None => insert_vote(&tx, user_id, target, is_like)?,
        Some(existing) if existing == is_like => delete_vote(&tx, user_id, target)?,
        Some(_) => update_vote(&tx, user_id, target, is_like)?,
    }
    tx.commit()?;
    Ok(())
}

/// The viewer's current polarity on a target, if any.
pub fn vote_state(pool: &DbPool, user_id: i64, target: VoteTarget) -> AppResult<Option<bool>> {
    let conn = pool.get()?;
    let (sql, id) = match target {
        VoteTarget::Post(id) => (
            "SELECT is_like FROM votes WHERE user_id = ?1 AND post_id = ?2 AND comment_id IS NULL",
            id,
        ),
        VoteTarget::Comment(id) => (
            "SELECT is_like FROM votes WHERE user_id = ?1 AND comment_id = ?2 AND post_id IS NULL",
            id,
        ),
    };
    conn.query_row(sql, params![user_id, id], |row| row.get(0))
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other.into()),
        })
}

/// Like and dislike counts for a target.
pub fn counts(pool: &DbPool, target: VoteTarget) -> AppResult<(i64, i64)> {
    let conn = pool.get()?;
    let (sql, id) = match target {
        VoteTarget::Post(id) => (
            "SELECT \
               COUNT(*) FILTER (WHERE is_like = 1), \
               COUNT(*) FILTER (WHERE is_like = 0) \
             FROM votes WHERE post_id = ?1 AND comment_id IS NULL",
            id,
        ),
        VoteTarget::Comment(id) => (
            "SELECT \
               COUNT(*) FILTER (WHERE is_like = 1), \
               COUNT(*) FILTER (WHERE is_like = 0) \
             FROM votes WHERE comment_id = ?1 AND post_id IS NULL",
            id,
        ),
    };
    let counts = conn.query_row(sql, params![id], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(counts)
}

fn target_exists(tx: &Transaction, target: VoteTarget) -> AppResult<bool> {
    let (sql, id) = match target {
        VoteTarget::Post(id) => ("SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)", id),
        VoteTarget::Comment(id) => ("SELECT EXISTS(SELECT 1 FROM comments WHERE id = ?1)", id),
    };
    Ok(tx.query_row(sql, params![id], |row| row.get(0))?)
}

fn existing_vote(tx: &Transaction, user_id: i64, target: VoteTarget) -> AppResult<Option<bool>> {
    let (sql, id) = match target {
        VoteTarget::Post(id) => (
            "SELECT is_like FROM votes WHERE user_id = ?1 AND post_id = ?2 AND comment_id IS NULL",
            id,
        ),
        VoteTarget::Comment(id) => (
            "SELECT is_like FROM votes WHERE user_id = ?1 AND comment_id = ?2 AND post_id IS NULL",
            id,
        ),
    };
    tx.query_row(sql, params![user_id, id], |row| row.get(0))
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other.into()),
        })
}

fn insert_vote(tx: &Transaction, user_id: i64, target: VoteTarget, is_like: bool) -> AppResult<()> {
    match target {
        VoteTarget::Post(id) => tx.execute(
            "INSERT INTO votes (user_id, post_id, is_like) VALUES (?1, ?2, ?3)",
            params![user_id, id, is_like],
        )?,
        VoteTarget::Comment(id) => tx.execute(
            "INSERT INTO votes (user_id, comment_id, is_like) VALUES (?1, ?2, ?3)",
            params![user_id, id, is_like],
        )?,
    };
    Ok(())
}

fn delete_vote(tx: &Transaction, user_id: i64, target: VoteTarget) -> AppResult<()> {
    match target {
        VoteTarget::Post(id) => tx.execute(
            "DELETE FROM votes WHERE user_id = ?1 AND post_id = ?2 AND comment_id IS NULL",
            params![user_id, id],
        )?,
        VoteTarget::Comment(id) => tx.execute(
            "DELETE FROM votes WHERE user_id = ?1 AND comment_id = ?2 AND post_id IS NULL",
            params![user_id, id],
        )?,
    };
    Ok(())
}

fn update_vote(tx: &Transaction, user_id: i64, target: VoteTarget, is_like: bool) -> AppResult<()> {
    match target {
        VoteTarget::Post(id) => tx.execute(
            "UPDATE votes SET is_like = ?1 WHERE user_id = ?2 AND post_id = ?3 AND comment_id IS NULL",
            params![is_like, user_id, id],
        )?,
        VoteTarget::Comment(id) => tx.execute(
            "UPDATE votes SET is_like = ?1 WHERE user_id = ?2 AND comment_id = ?3 AND post_id IS NULL",
            params![is_like, user_id, id],
        )?,
    };
    Ok(())
}
