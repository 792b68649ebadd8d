use rusqlite::params;

use crate::auth::validate;
use crate::auth::session;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// Wrong email and wrong password produce the same message so the login
/// form cannot be used to enumerate accounts.
pub const BAD_CREDENTIALS: &str = "Invalid email or password.";

/// Register a new user. Returns the new user id.
///
/// Validation failures come back as `InvalidInput`; duplicate email or
/// username as `Conflict`. The unique-constraint message is the only
/// database error interpreted for clients.
pub fn register(pool: &DbPool, username: &str, email: &str, password: &str) -> AppResult<i64> {
    validate::validate_username(username).map_err(AppError::InvalidInput)?;
    validate::validate_email(email).map_err(AppError::InvalidInput)?;
    validate::validate_password(password).map_err(AppError::InvalidInput)?;

    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("password hash failed: {}", e)))?;

    let conn = pool.get()?;
    match conn.execute(
        "INSERT INTO users (email, username, password_hash) VALUES (?1, ?2, ?3)",
        params![email, username, hash],
    ) {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(e) if is_unique_violation(&e, "users.email") => {
            Err(AppError::Conflict("Email is already taken.".into()))
        }
        Err(e) if is_unique_violation(&e, "users.username") => {
            Err(AppError::Conflict("Username is already taken.".into()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Verify credentials and open a session. Returns the session token, or
/// `None` when the email is unknown or the password does not match.
pub fn login(
    pool: &DbPool,
    email: &str,
    password: &str,
    session_hours: u64,
) -> AppResult<Option<String>> {
    if email.trim().is_empty() || password.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Email and password cannot be empty or only whitespace.".into(),
        ));
    }

    let conn = pool.get()?;
    let row: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, password_hash FROM users WHERE email = ?1",
            params![email],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;
    drop(conn);

    let (user_id, hash) = match row {
        Some(r) => r,
        None => return Ok(None),
    };

    // bcrypt::verify compares in constant time
    let ok = bcrypt::verify(password, &hash)
        .map_err(|e| AppError::Internal(format!("password verify failed: {}", e)))?;
    if !ok {
        return Ok(None);
    }

    let token = session::create_session(pool, user_id, session_hours)?;
    Ok(Some(token))
}

/// Tear down the session for a token. Idempotent.
pub fn logout(pool: &DbPool, token: &str) -> AppResult<()> {
    session::delete_session(pool, token)
}

fn is_unique_violation(err: &rusqlite::Error, column: &str) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains(column)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::authenticate;
    use crate::db::test_support::test_pool;

    #[test]
    fn register_login_authenticate_round_trip() {
        let pool = test_pool();
        let user_id = register(&pool, "alice", "alice@x.io", "passw0rd").unwrap();

        let token = login(&pool, "alice@x.io", "passw0rd", 24)
            .unwrap()
            .expect("valid credentials should open a session");
        assert_eq!(authenticate(&pool, &token).unwrap(), Some(user_id));

        logout(&pool, &token).unwrap();
        assert_eq!(authenticate(&pool, &token).unwrap(), None);
    }

    #[test]
    fn wrong_password_and_unknown_email_look_the_same() {
        let pool = test_pool();
        register(&pool, "alice", "alice@x.io", "passw0rd").unwrap();

        assert!(login(&pool, "alice@x.io", "wrong-pass", 24).unwrap().is_none());
        assert!(login(&pool, "nobody@x.io", "passw0rd", 24).unwrap().is_none());
    }

    #[test]
    fn duplicate_email_conflicts_and_keeps_first_user() {
        let pool = test_pool();
        register(&pool, "alice", "alice@x.io", "passw0rd").unwrap();

        let err = register(&pool, "alice2", "alice@x.io", "passw0rd").unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m.contains("Email")));

        // First registration is intact
        assert!(login(&pool, "alice@x.io", "passw0rd", 24).unwrap().is_some());
    }

    #[test]
    fn duplicate_username_conflicts() {
        let pool = test_pool();
        register(&pool, "alice", "alice@x.io", "passw0rd").unwrap();
        let err = register(&pool, "alice", "other@x.io", "passw0rd").unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m.contains("Username")));
    }

    #[test]
    fn invalid_fields_are_rejected_before_insert() {
        let pool = test_pool();
        assert!(matches!(
            register(&pool, "a b", "alice@x.io", "passw0rd"),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            register(&pool, "alice", "not-an-email", "passw0rd"),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            register(&pool, "alice", "alice@x.io", "short"),
            Err(AppError::InvalidInput(_))
        ));

        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn login_rejects_blank_fields() {
        let pool = test_pool();
        assert!(matches!(
            login(&pool, "  ", "passw0rd", 24),
            Err(AppError::InvalidInput(_))
        ));
    }
}
