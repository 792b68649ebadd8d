use std::collections::HashSet;
use std::path::Path;

use rusqlite::params;

use crate::db::models::Post;
use crate::error::{AppError, AppResult};
use crate::forum::uploads::{self, ImageUpload};
use crate::forum::word_wrap;
use crate::state::DbPool;

pub const TITLE_MAX_CHARS: usize = 120;
pub const CONTENT_MAX_CHARS: usize = 500;
pub const TITLE_WRAP_WORDS: usize = 20;
pub const CONTENT_WRAP_WORDS: usize = 30;

/// Form fields shared by create and edit.
#[derive(Debug, Clone)]
pub struct PostInput {
    pub title: String,
    pub content: String,
    pub category_ids: Vec<i64>,
}

/// Title/content after word-wrap, ready for storage or form re-render.
#[derive(Debug, Clone)]
pub struct NormalizedPost {
    pub title: String,
    pub content: String,
    pub category_ids: Vec<i64>,
}

/// Wrap and validate the form fields. The wrapped text is returned even on
/// error so a failing form can be re-rendered with what the user typed.
pub fn normalize(pool: &DbPool, input: &PostInput) -> (NormalizedPost, Option<AppError>) {
    let normalized = NormalizedPost {
        title: word_wrap(&input.title, TITLE_WRAP_WORDS),
        content: word_wrap(&input.content, CONTENT_WRAP_WORDS),
        category_ids: input.category_ids.clone(),
    };

    let err = validate(pool, &normalized).err();
    (normalized, err)
}

fn validate(pool: &DbPool, post: &NormalizedPost) -> AppResult<()> {
    if post.title.trim().is_empty() || post.content.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Title and content cannot be empty or only spaces.".into(),
        ));
    }
    if post.title.chars().count() > TITLE_MAX_CHARS {
        return Err(AppError::InvalidInput(format!(
            "Title cannot exceed {} characters.",
            TITLE_MAX_CHARS
        )));
    }
    if post.content.chars().count() > CONTENT_MAX_CHARS {
        return Err(AppError::InvalidInput(format!(
            "Content cannot exceed {} characters.",
            CONTENT_MAX_CHARS
        )));
    }

    let mut seen = HashSet::new();
    for id in &post.category_ids {
        if !seen.insert(*id) {
            return Err(AppError::InvalidInput(
                "Duplicate categories are not allowed.".into(),
            ));
        }
        if !crate::forum::catalog::exists(pool, *id)? {
            return Err(AppError::InvalidInput("Invalid category selected.".into()));
        }
    }
    Ok(())
}

/// Create a post with its category links in one transaction. The image, if
/// any, is validated and written first; on any image failure no row is
/// written. Returns the new post id.
pub fn create(
    pool: &DbPool,
    uploads_dir: &Path,
    author: i64,
    input: &PostInput,
    image: Option<&ImageUpload>,
) -> AppResult<i64> {
    let (post, err) = normalize(pool, input);
    if let Some(err) = err {
        return Err(err);
    }

    let image_path = match image {
        Some(upload) => Some(uploads::store(uploads_dir, author, upload)?),
        None => None,
    };

    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO posts (user_id, title, content, image_path) VALUES (?1, ?2, ?3, ?4)",
        params![author, post.title, post.content, image_path],
    )?;
    let post_id = tx.last_insert_rowid();
    link_categories(&tx, post_id, &post.category_ids)?;
    tx.commit()?;

    Ok(post_id)
}

/// Edit a post: author-only. Updates the row and replaces the category set
/// atomically. A new image replaces `image_path`; the old file stays on
/// disk (see DESIGN notes on image lifecycle).
pub fn edit(
    pool: &DbPool,
    uploads_dir: &Path,
    editor: i64,
    post_id: i64,
    input: &PostInput,
    image: Option<&ImageUpload>,
) -> AppResult<()> {
    require_author(pool, post_id, editor)?;

    let (post, err) = normalize(pool, input);
    if let Some(err) = err {
        return Err(err);
    }

    let image_path = match image {
        Some(upload) => Some(uploads::store(uploads_dir, editor, upload)?),
        None => None,
    };

    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    match image_path {
        Some(ref path) => {
            tx.execute(
                "UPDATE posts SET title = ?1, content = ?2, image_path = ?3 WHERE id = ?4",
                params![post.title, post.content, path, post_id],
            )?;
        }
        None => {
            tx.execute(
                "UPDATE posts SET title = ?1, content = ?2 WHERE id = ?3",
                params![post.title, post.content, post_id],
            )?;
        }
    }
    tx.execute(
        "DELETE FROM post_categories WHERE post_id = ?1",
        params![post_id],
    )?;
    link_categories(&tx, post_id, &post.category_ids)?;
    tx.commit()?;

    Ok(())
}

/// Delete a post: author-only. One transaction removes votes on the post
/// and on all its comments, the comments, the category links, then the
/// post itself.
pub fn delete(pool: &DbPool, deleter: i64, post_id: i64) -> AppResult<()> {
    require_author(pool, post_id, deleter)?;

    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM votes WHERE post_id = ?1",
        params![post_id],
    )?;
    tx.execute(
        "DELETE FROM votes WHERE comment_id IN (SELECT id FROM comments WHERE post_id = ?1)",
        params![post_id],
    )?;
    tx.execute("DELETE FROM comments WHERE post_id = ?1", params![post_id])?;
    tx.execute(
        "DELETE FROM post_categories WHERE post_id = ?1",
        params![post_id],
    )?;
    let deleted = tx.execute(
        "DELETE FROM posts WHERE id = ?1 AND user_id = ?2",
        params![post_id, deleter],
    )?;
    if deleted == 0 {
        // Author check passed above, so the row vanished mid-request
        return Err(AppError::NotFound);
    }
    tx.commit()?;

    Ok(())
}

pub fn author_of(pool: &DbPool, post_id: i64) -> AppResult<Option<i64>> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT user_id FROM posts WHERE id = ?1",
        params![post_id],
        |row| row.get(0),
    )
    .map(Some)
    .or_else(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => Ok(None),
        other => Err(other.into()),
    })
}

/// Load a post plus its selected category ids, for the edit form.
pub fn load(pool: &DbPool, post_id: i64) -> AppResult<Option<(Post, Vec<i64>)>> {
    let conn = pool.get()?;
    let post = conn
        .query_row(
            "SELECT id, user_id, title, content, image_path, created_at \
             FROM posts WHERE id = ?1",
            params![post_id],
            |row| {
                Ok(Post {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    title: row.get(2)?,
                    content: row.get(3)?,
                    image_path: row.get(4)?,
                    created_at: row.get(5)?,
                })
            },
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;

    let post = match post {
        Some(p) => p,
        None => return Ok(None),
    };

    let mut stmt =
        conn.prepare("SELECT category_id FROM post_categories WHERE post_id = ?1")?;
    let category_ids = stmt
        .query_map(params![post_id], |row| row.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;

    Ok(Some((post, category_ids)))
}

fn require_author(pool: &DbPool, post_id: i64, user_id: i64) -> AppResult<()> {
    match author_of(pool, post_id)? {
        None => Err(AppError::NotFound),
        Some(author) if author != user_id => Err(AppError::Forbidden),
        Some(_) => Ok(()),
    }
}

fn link_categories(tx: &rusqlite::Transaction, post_id: i64, ids: &[i64]) -> AppResult<()> {
    let mut stmt =
        tx.prepare("INSERT INTO post_categories (post_id, category_id) VALUES (?1, ?2)")?;
    for id in ids {
        stmt.execute(params![post_id, id])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{insert_user, test_pool};

    fn input(title: &str, content: &str, cats: &[i64]) -> PostInput {
        PostInput {
            title: title.to_string(),
            content: content.to_string(),
            category_ids: cats.to_vec(),
        }
    }

    fn uploads_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn create_links_categories_atomically() {
        let pool = test_pool();
        let alice = insert_user(&pool, "alice", "alice@x.io");
        let tmp = uploads_dir();

        let post_id = create(&pool, tmp.path(), alice, &input("Hello", "World", &[1, 2]), None)
            .unwrap();

        let conn = pool.get().unwrap();
        let links: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM post_categories WHERE post_id = ?1",
                params![post_id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(links, 2);
    }

    #[test]
    fn duplicate_categories_rejected_without_a_post_row() {
        let pool = test_pool();
        let alice = insert_user(&pool, "alice", "alice@x.io");
        let tmp = uploads_dir();

        let err = create(&pool, tmp.path(), alice, &input("Hello", "World", &[1, 1]), None)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref m) if m.contains("Duplicate")));

        let conn = pool.get().unwrap();
        let posts: i64 = conn
            .query_row("SELECT COUNT(*) FROM posts", [], |r| r.get(0))
            .unwrap();
        assert_eq!(posts, 0);
    }

    #[test]
    fn unknown_category_rejected() {
        let pool = test_pool();
        let alice = insert_user(&pool, "alice", "alice@x.io");
        let tmp = uploads_dir();
        assert!(create(&pool, tmp.path(), alice, &input("Hello", "World", &[999]), None).is_err());
    }

    #[test]
    fn long_title_wraps_before_storage() {
        let pool = test_pool();
        let alice = insert_user(&pool, "alice", "alice@x.io");
        let tmp = uploads_dir();

        let title = (0..25).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let post_id = create(&pool, tmp.path(), alice, &input(&title, "body", &[]), None).unwrap();

        let (stored, _) = load(&pool, post_id).unwrap().map(|(p, c)| (p.title, c)).unwrap();
        assert_eq!(stored.matches('\n').count(), 1);
    }

    #[test]
    fn title_over_limit_rejected() {
        let pool = test_pool();
        let alice = insert_user(&pool, "alice", "alice@x.io");
        let tmp = uploads_dir();
        let err = create(
            &pool,
            tmp.path(),
            alice,
            &input(&"x".repeat(121), "body", &[]),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn edit_by_non_author_is_forbidden_and_changes_nothing() {
        let pool = test_pool();
        let alice = insert_user(&pool, "alice", "alice@x.io");
        let bob = insert_user(&pool, "bob", "bob@x.io");
        let tmp = uploads_dir();

        let post_id =
            create(&pool, tmp.path(), alice, &input("Hello", "World", &[1]), None).unwrap();

        let err = edit(&pool, tmp.path(), bob, post_id, &input("X", "Y", &[]), None).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let (post, cats) = load(&pool, post_id).unwrap().unwrap();
        assert_eq!(post.title, "Hello");
        assert_eq!(cats, vec![1]);
    }

    #[test]
    fn edit_replaces_category_set() {
        let pool = test_pool();
        let alice = insert_user(&pool, "alice", "alice@x.io");
        let tmp = uploads_dir();

        let post_id =
            create(&pool, tmp.path(), alice, &input("Hello", "World", &[1, 2]), None).unwrap();
        edit(&pool, tmp.path(), alice, post_id, &input("Hello2", "World2", &[3]), None).unwrap();

        let (post, mut cats) = load(&pool, post_id).unwrap().unwrap();
        cats.sort();
        assert_eq!(post.title, "Hello2");
        assert_eq!(cats, vec![3]);
    }

    #[test]
    fn edit_missing_post_is_not_found() {
        let pool = test_pool();
        let alice = insert_user(&pool, "alice", "alice@x.io");
        let tmp = uploads_dir();
        let err = edit(&pool, tmp.path(), alice, 42, &input("X", "Y", &[]), None).unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[test]
    fn delete_cascades_comments_votes_and_links() {
        let pool = test_pool();
        let alice = insert_user(&pool, "alice", "alice@x.io");
        let bob = insert_user(&pool, "bob", "bob@x.io");
        let tmp = uploads_dir();

        let post_id =
            create(&pool, tmp.path(), alice, &input("Hello", "World", &[1]), None).unwrap();
        let comment_id =
            crate::forum::comments::create(&pool, bob, post_id, "Hi").unwrap();
        crate::forum::votes::cast(
            &pool,
            bob,
            crate::forum::votes::VoteTarget::Post(post_id),
            true,
        )
        .unwrap();
        crate::forum::votes::cast(
            &pool,
            alice,
            crate::forum::votes::VoteTarget::Comment(comment_id),
            false,
        )
        .unwrap();

        delete(&pool, alice, post_id).unwrap();

        let conn = pool.get().unwrap();
        for (table, sql) in [
            ("posts", "SELECT COUNT(*) FROM posts"),
            ("comments", "SELECT COUNT(*) FROM comments"),
            ("votes", "SELECT COUNT(*) FROM votes"),
            ("post_categories", "SELECT COUNT(*) FROM post_categories"),
        ] {
            let count: i64 = conn.query_row(sql, [], |r| r.get(0)).unwrap();
            assert_eq!(count, 0, "{} not empty after cascade", table);
        }
    }

    #[test]
    fn delete_by_non_author_is_forbidden() {
        let pool = test_pool();
        let alice = insert_user(&pool, "alice", "alice@x.io");
        let bob = insert_user(&pool, "bob", "bob@x.io");
        let tmp = uploads_dir();

        let post_id =
            create(&pool, tmp.path(), alice, &input("Hello", "World", &[]), None).unwrap();
        assert!(matches!(delete(&pool, bob, post_id), Err(AppError::Forbidden)));
        assert!(load(&pool, post_id).unwrap().is_some());
    }

    #[test]
    fn create_with_image_stores_path() {
        let pool = test_pool();
        let alice = insert_user(&pool, "alice", "alice@x.io");
        let tmp = uploads_dir();

        let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        data.extend_from_slice(&[0u8; 16]);
        let image = ImageUpload {
            filename: "pic.png".into(),
            data,
        };

        let post_id =
            create(&pool, tmp.path(), alice, &input("Hello", "World", &[]), Some(&image)).unwrap();
        let (post, _) = load(&pool, post_id).unwrap().unwrap();
        assert!(post.image_path.unwrap().starts_with("/static/uploads/"));
    }

    #[test]
    fn bad_image_means_no_post_row() {
        let pool = test_pool();
        let alice = insert_user(&pool, "alice", "alice@x.io");
        let tmp = uploads_dir();

        let image = ImageUpload {
            filename: "pic.png".into(),
            data: b"not a png".to_vec(),
        };
        assert!(
            create(&pool, tmp.path(), alice, &input("Hello", "World", &[]), Some(&image)).is_err()
        );

        let conn = pool.get().unwrap();
        let posts: i64 = conn
            .query_row("SELECT COUNT(*) FROM posts", [], |r| r.get(0))
            .unwrap();
        assert_eq!(posts, 0);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
