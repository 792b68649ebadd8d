use rusqlite::params;

use crate::error::{AppError, AppResult};
use crate::state::DbPool;

pub const COMMENT_MAX_CHARS: usize = 120;

/// Why a comment submission was turned away. Carried back to the feed as a
/// machine-readable query parameter rather than an error page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentRejection {
    Empty,
    TooLong,
}

impl CommentRejection {
    pub fn code(self) -> &'static str {
        match self {
            CommentRejection::Empty => "empty_comment",
            CommentRejection::TooLong => "comment_too_long",
        }
    }

    pub fn message(code: &str) -> Option<&'static str> {
        match code {
            "empty_comment" => Some("Comment cannot be empty."),
            "comment_too_long" => Some("Comment cannot exceed 120 characters."),
            _ => None,
        }
    }
}

pub fn check_content(content: &str) -> Result<(), CommentRejection> {
    if content.trim().is_empty() {
        return Err(CommentRejection::Empty);
    }
    if content.chars().count() > COMMENT_MAX_CHARS {
        return Err(CommentRejection::TooLong);
    }
    Ok(())
}

/// Insert a comment on an existing post. Single-row write, no transaction
/// needed. Content rules are checked by the caller via `check_content` so
/// the HTTP layer can redirect with a code instead of failing.
pub fn create(pool: &DbPool, author: i64, post_id: i64, content: &str) -> AppResult<i64> {
    if !crate::db::post_exists(pool, post_id)? {
        return Err(AppError::InvalidInput("Post not found".into()));
    }
    if check_content(content).is_err() {
        return Err(AppError::InvalidInput("Invalid comment content".into()));
    }

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO comments (post_id, user_id, content) VALUES (?1, ?2, ?3)",
        params![post_id, author, content],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Delete a comment: author-only. Votes on the comment go in the same
/// transaction.
pub fn delete(pool: &DbPool, deleter: i64, comment_id: i64) -> AppResult<()> {
    match author_of(pool, comment_id)? {
        None => return Err(AppError::NotFound),
        Some(author) if author != deleter => return Err(AppError::Forbidden),
        Some(_) => {}
    }

    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM votes WHERE comment_id = ?1",
        params![comment_id],
    )?;
    let deleted = tx.execute(
        "DELETE FROM comments WHERE id = ?1 AND user_id = ?2",
        params![comment_id, deleter],
    )?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }
    tx.commit()?;
    Ok(())
}

pub fn author_of(pool: &DbPool, comment_id: i64) -> AppResult<Option<i64>> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT user_id FROM comments WHERE id = ?1",
        params![comment_id],
        |row| row.get(0),
    )
    .map(Some)
    .or_else(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => Ok(None),
        other => Err(other.into()),
    })
}
