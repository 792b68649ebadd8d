//! End-to-end domain flows against a real on-disk database, the same way
//! the binary wires things up at startup.

use forum::auth::identity;
use forum::auth::session;
use forum::db;
use forum::forum::comments;
use forum::forum::feed::{self, Filter};
use forum::forum::posts::{self, PostInput};
use forum::forum::uploads::ImageUpload;
use forum::forum::votes::{self, VoteTarget};
use forum::state::DbPool;

struct TestForum {
    pool: DbPool,
    uploads: std::path::PathBuf,
    _tmp: tempfile::TempDir,
}

fn setup() -> TestForum {
    let tmp = tempfile::tempdir().unwrap();
    let pool = db::create_pool(&tmp.path().join("forum.db")).unwrap();
    db::run_migrations(&pool).unwrap();
    let uploads = tmp.path().join("uploads");
    std::fs::create_dir_all(&uploads).unwrap();
    TestForum {
        pool,
        uploads,
        _tmp: tmp,
    }
}

fn signup(forum: &TestForum, username: &str, email: &str) -> (i64, String) {
    let user_id = identity::register(&forum.pool, username, email, "passw0rd").unwrap();
    let token = identity::login(&forum.pool, email, "passw0rd", 24)
        .unwrap()
        .expect("fresh account should log in");
    (user_id, token)
}

fn category_id(pool: &DbPool, name: &str) -> i64 {
    let conn = pool.get().unwrap();
    conn.query_row(
        "SELECT id FROM categories WHERE name = ?1",
        rusqlite::params![name],
        |r| r.get(0),
    )
    .unwrap()
}

#[test]
fn register_post_comment_vote_and_read_back() {
    let forum = setup();
    let (alice, alice_token) = signup(&forum, "alice", "alice@example.com");
    let (bob, _) = signup(&forum, "bob", "bob@example.com");

    assert_eq!(
        session::authenticate(&forum.pool, &alice_token).unwrap(),
        Some(alice)
    );

    let questions = category_id(&forum.pool, "Questions");
    let post_id = posts::create(
        &forum.pool,
        &forum.uploads,
        alice,
        &PostInput {
            title: "How do lifetimes work?".into(),
            content: "Asking for a friend.".into(),
            category_ids: vec![questions],
        },
        None,
    )
    .unwrap();

    comments::create(&forum.pool, bob, post_id, "Read the book.").unwrap();
    votes::cast(&forum.pool, bob, VoteTarget::Post(post_id), true).unwrap();

    let feed = feed::load(&forum.pool, Some(bob), Filter::All, None).unwrap();
    assert_eq!(feed.len(), 1);
    let post = &feed[0];
    assert_eq!(post.author, "alice");
    assert_eq!((post.likes, post.dislikes), (1, 0));
    assert!(post.user_liked);
    assert_eq!(post.comments.len(), 1);
    assert_eq!(post.comments[0].author, "bob");
    assert_eq!(post.categories[0].name, "Questions");
}

#[test]
fn vote_toggles_and_inverts_across_requests() {
    let forum = setup();
    let (alice, _) = signup(&forum, "alice", "alice@example.com");
    let (bob, _) = signup(&forum, "bob", "bob@example.com");

    let post_id = posts::create(
        &forum.pool,
        &forum.uploads,
        alice,
        &PostInput {
            title: "Votes".into(),
            content: "Toggle me.".into(),
            category_ids: vec![],
        },
        None,
    )
    .unwrap();

    // like, then like again (toggle off), then dislike, then flip to like
    votes::cast(&forum.pool, bob, VoteTarget::Post(post_id), true).unwrap();
    votes::cast(&forum.pool, bob, VoteTarget::Post(post_id), true).unwrap();
    assert_eq!(
        votes::counts(&forum.pool, VoteTarget::Post(post_id)).unwrap(),
        (0, 0)
    );

    votes::cast(&forum.pool, bob, VoteTarget::Post(post_id), false).unwrap();
    votes::cast(&forum.pool, bob, VoteTarget::Post(post_id), true).unwrap();
    assert_eq!(
        votes::counts(&forum.pool, VoteTarget::Post(post_id)).unwrap(),
        (1, 0)
    );
}

#[test]
fn deleting_a_post_takes_comments_and_votes_with_it() {
    let forum = setup();
    let (alice, _) = signup(&forum, "alice", "alice@example.com");
    let (bob, _) = signup(&forum, "bob", "bob@example.com");

    let general = category_id(&forum.pool, "General");
    let post_id = posts::create(
        &forum.pool,
        &forum.uploads,
        alice,
        &PostInput {
            title: "Doomed".into(),
            content: "Soon gone.".into(),
            category_ids: vec![general],
        },
        None,
    )
    .unwrap();
    let comment_id = comments::create(&forum.pool, bob, post_id, "A pity.").unwrap();
    votes::cast(&forum.pool, bob, VoteTarget::Post(post_id), true).unwrap();
    votes::cast(&forum.pool, alice, VoteTarget::Comment(comment_id), false).unwrap();

    // Only the author may delete
    assert!(posts::delete(&forum.pool, bob, post_id).is_err());
    posts::delete(&forum.pool, alice, post_id).unwrap();

    let conn = forum.pool.get().unwrap();
    for table in ["posts", "comments", "votes", "post_categories"] {
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0, "{} should be empty", table);
    }
}

#[test]
fn post_with_image_attachment_lands_on_disk() {
    let forum = setup();
    let (alice, _) = signup(&forum, "alice", "alice@example.com");

    let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&[0u8; 64]);
    let post_id = posts::create(
        &forum.pool,
        &forum.uploads,
        alice,
        &PostInput {
            title: "With picture".into(),
            content: "See attached.".into(),
            category_ids: vec![],
        },
        Some(&ImageUpload {
            filename: "shot.png".into(),
            data,
        }),
    )
    .unwrap();

    let (post, _) = posts::load(&forum.pool, post_id).unwrap().unwrap();
    let image_path = post.image_path.expect("image path should be stored");
    assert!(image_path.starts_with("/static/uploads/"));

    let on_disk = forum
        .uploads
        .join(image_path.trim_start_matches("/static/uploads/"));
    assert!(on_disk.exists());
}

#[test]
fn logout_and_purge_close_out_sessions() {
    let forum = setup();
    let (alice, token) = signup(&forum, "alice", "alice@example.com");

    identity::logout(&forum.pool, &token).unwrap();
    assert_eq!(session::authenticate(&forum.pool, &token).unwrap(), None);

    // An already-expired session is invisible and gets swept
    let stale = session::create_session(&forum.pool, alice, 24).unwrap();
    let conn = forum.pool.get().unwrap();
    conn.execute(
        "UPDATE sessions SET expiry = datetime('now', '-1 hour') WHERE id = ?1",
        rusqlite::params![stale],
    )
    .unwrap();
    drop(conn);

    assert_eq!(session::authenticate(&forum.pool, &stale).unwrap(), None);
    assert_eq!(session::purge_expired(&forum.pool).unwrap(), 1);
}

#[test]
fn edit_replaces_text_and_category_set() {
    let forum = setup();
    let (alice, _) = signup(&forum, "alice", "alice@example.com");

    let general = category_id(&forum.pool, "General");
    let questions = category_id(&forum.pool, "Questions");
    let post_id = posts::create(
        &forum.pool,
        &forum.uploads,
        alice,
        &PostInput {
            title: "Draft".into(),
            content: "First pass.".into(),
            category_ids: vec![general],
        },
        None,
    )
    .unwrap();

    posts::edit(
        &forum.pool,
        &forum.uploads,
        alice,
        post_id,
        &PostInput {
            title: "Final".into(),
            content: "Second pass.".into(),
            category_ids: vec![questions],
        },
        None,
    )
    .unwrap();

    let (post, selected) = posts::load(&forum.pool, post_id).unwrap().unwrap();
    assert_eq!(post.title, "Final");
    assert_eq!(post.content, "Second pass.");
    assert_eq!(selected, vec![questions]);
}
