use rand::Rng;
use rusqlite::params;

use crate::error::AppResult;
use crate::state::DbPool;

/// Create a new session for a user. Returns the session token.
pub fn create_session(pool: &DbPool, user_id: i64, hours: u64) -> AppResult<String> {
    let conn = pool.get()?;
    let token = generate_token();

    conn.execute(
        "INSERT INTO sessions (id, user_id, expiry) VALUES (?1, ?2, datetime('now', ?3))",
        params![token, user_id, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Delete a session by token. Idempotent.
pub fn delete_session(pool: &DbPool, token: &str) -> AppResult<()> {
    let conn = pool.get()?;
    conn.execute("DELETE FROM sessions WHERE id = ?1", params![token])?;
    Ok(())
}

/// Resolve a token to its user id, if the session is still live.
pub fn authenticate(pool: &DbPool, token: &str) -> AppResult<Option<i64>> {
    let conn = pool.get()?;
    let user_id = conn
        .query_row(
            "SELECT user_id FROM sessions WHERE id = ?1 AND expiry > datetime('now')",
            params![token],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;
    Ok(user_id)
}

/// Drop sessions past their expiry. Returns the number deleted. Run at
/// startup and periodically from the janitor task in main.
pub fn purge_expired(pool: &DbPool) -> AppResult<usize> {
    let conn = pool.get()?;
    let deleted = conn.execute("DELETE FROM sessions WHERE expiry <= datetime('now')", [])?;
    Ok(deleted)
}

/// Generate a random 128-bit token, hex-encoded (URL-safe).
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(bytes)
}
