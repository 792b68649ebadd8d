use rusqlite::params;
use rusqlite::types::Value;

use crate::db::models::Category;
use crate::error::AppResult;
use crate::forum::posts::{CONTENT_WRAP_WORDS, TITLE_WRAP_WORDS};
use crate::forum::{format_created_at, word_wrap};
use crate::state::DbPool;

/// Which slice of the feed the viewer asked for. Unknown filter strings
/// read as All.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Created,
    Liked,
}

impl Filter {
    pub fn from_query(value: &str) -> Self {
        match value {
            "created" => Filter::Created,
            "liked" => Filter::Liked,
            _ => Filter::All,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedComment {
    pub id: i64,
    pub author: String,
    pub content: String,
    pub likes: i64,
    pub dislikes: i64,
    pub user_liked: bool,
    pub user_disliked: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct FeedPost {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author: String,
    pub created_at: String,
    pub likes: i64,
    pub dislikes: i64,
    pub user_liked: bool,
    pub user_disliked: bool,
    pub image_path: String,
    pub comments: Vec<FeedComment>,
    pub categories: Vec<Category>,
}

/// Assemble the post listing: counts, per-viewer vote state, comments
/// oldest-first, categories, newest post first. `filter` narrows to the
/// viewer's own or liked posts; `category` narrows by tag name.
pub fn load(
    pool: &DbPool,
    viewer: Option<i64>,
    filter: Filter,
    category: Option<&str>,
) -> AppResult<Vec<FeedPost>> {
    // Created/Liked are empty for anonymous viewers by definition
    let viewer_id = match (filter, viewer) {
        (Filter::Created | Filter::Liked, None) => return Ok(Vec::new()),
        (_, v) => v,
    };

    let mut sql = String::from(
        "SELECT p.id, p.title, p.content, u.username, p.created_at, \
           (SELECT COUNT(*) FROM votes WHERE post_id = p.id AND is_like = 1 AND comment_id IS NULL), \
           (SELECT COUNT(*) FROM votes WHERE post_id = p.id AND is_like = 0 AND comment_id IS NULL), \
           p.image_path \
         FROM posts p \
         JOIN users u ON p.user_id = u.id",
    );
    let mut where_clauses: Vec<&str> = Vec::new();
    let mut args: Vec<Value> = Vec::new();

    match filter {
        Filter::Created => {
            where_clauses.push("p.user_id = ?");
            args.push(Value::Integer(viewer_id.unwrap()));
        }
        Filter::Liked => {
            sql.push_str(" JOIN votes l ON p.id = l.post_id AND l.comment_id IS NULL");
            where_clauses.push("l.user_id = ? AND l.is_like = 1");
            args.push(Value::Integer(viewer_id.unwrap()));
        }
        Filter::All => {}
    }

    if let Some(name) = category {
        sql.push_str(
            " JOIN post_categories pc ON p.id = pc.post_id \
              JOIN categories cat ON pc.category_id = cat.id",
        );
        where_clauses.push("cat.name = ?");
        args.push(Value::Text(name.to_string()));
    }

    if !where_clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY p.created_at DESC, p.id DESC");

    let conn = pool.get()?;
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(args), |row| {
            Ok(FeedPost {
                id: row.get(0)?,
                title: row.get(1)?,
                content: row.get(2)?,
                author: row.get(3)?,
                created_at: row.get(4)?,
                likes: row.get(5)?,
                dislikes: row.get(6)?,
                image_path: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
                user_liked: false,
                user_disliked: false,
                comments: Vec::new(),
                categories: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    drop(stmt);
    drop(conn);

    let mut posts = Vec::with_capacity(rows.len());
    for mut post in rows {
        post.created_at = format_created_at(&post.created_at);
        // Stored text is already wrapped; wrapping again is a no-op for it
        // but keeps legacy rows consistent on screen.
        post.title = word_wrap(&post.title, TITLE_WRAP_WORDS);
        post.content = word_wrap(&post.content, CONTENT_WRAP_WORDS);

        if let Some(viewer_id) = viewer_id {
            let state = crate::forum::votes::vote_state(
                pool,
                viewer_id,
                crate::forum::votes::VoteTarget::Post(post.id),
            )?;
            post.user_liked = state == Some(true);
            post.user_disliked = state == Some(false);
        }

        post.comments = load_comments(pool, post.id, viewer_id)?;
        post.categories = load_categories(pool, post.id)?;
        posts.push(post);
    }

    Ok(posts)
}

fn load_comments(pool: &DbPool, post_id: i64, viewer: Option<i64>) -> AppResult<Vec<FeedComment>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT c.id, u.username, c.content, \
           (SELECT COUNT(*) FROM votes WHERE comment_id = c.id AND is_like = 1 AND post_id IS NULL), \
           (SELECT COUNT(*) FROM votes WHERE comment_id = c.id AND is_like = 0 AND post_id IS NULL), \
           c.created_at \
         FROM comments c \
         JOIN users u ON c.user_id = u.id \
         WHERE c.post_id = ?1 \
         ORDER BY c.created_at ASC, c.id ASC",
    )?;
    let rows = stmt
        .query_map(params![post_id], |row| {
            Ok(FeedComment {
                id: row.get(0)?,
                author: row.get(1)?,
                content: row.get(2)?,
                likes: row.get(3)?,
                dislikes: row.get(4)?,
                created_at: row.get(5)?,
                user_liked: false,
                user_disliked: false,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    drop(stmt);
    drop(conn);

    let mut comments = Vec::with_capacity(rows.len());
    for mut comment in rows {
        comment.created_at = format_created_at(&comment.created_at);
        if let Some(viewer_id) = viewer {
            let state = crate::forum::votes::vote_state(
                pool,
                viewer_id,
                crate::forum::votes::VoteTarget::Comment(comment.id),
            )?;
            comment.user_liked = state == Some(true);
            comment.user_disliked = state == Some(false);
        }
        comments.push(comment);
    }
    Ok(comments)
}

fn load_categories(pool: &DbPool, post_id: i64) -> AppResult<Vec<Category>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT c.id, c.name \
         FROM categories c \
         JOIN post_categories pc ON c.id = pc.category_id \
         WHERE pc.post_id = ?1 \
         ORDER BY c.name ASC",
    )?;
    let categories = stmt
        .query_map(params![post_id], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(categories)
}
