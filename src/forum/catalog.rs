use rusqlite::params;

use crate::db::models::Category;
use crate::error::AppResult;
use crate::state::DbPool;

/// All categories, ordered by name for display.
pub fn list(pool: &DbPool) -> AppResult<Vec<Category>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name ASC")?;
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

pub fn exists(pool: &DbPool, category_id: i64) -> AppResult<bool> {
    let conn = pool.get()?;
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1)",
        params![category_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}
