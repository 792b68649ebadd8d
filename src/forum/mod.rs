pub mod catalog;
pub mod comments;
pub mod feed;
pub mod posts;
pub mod uploads;
pub mod votes;

use chrono::NaiveDateTime;

/// Insert a newline after every `word_limit`-th whitespace-separated token.
/// Text at or under the limit passes through untouched. Applied to titles
/// at 20 tokens and content at 30 before they are stored.
pub fn word_wrap(text: &str, word_limit: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= word_limit {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + words.len() / word_limit);
    for (i, word) in words.iter().enumerate() {
        out.push_str(word);
        if (i + 1) % word_limit == 0 {
            out.push('\n');
        } else {
            out.push(' ');
        }
    }
    out.trim_end().to_string()
}

/// Render a stored `datetime('now')` timestamp for display, e.g.
/// "Aug 30, 2026 at 14:05". Unparseable values fall back to the raw string.
pub fn format_created_at(stored: &str) -> String {
    match NaiveDateTime::parse_from_str(stored, "%Y-%m-%d %H:%M:%S") {
        Ok(ts) => ts.format("%b %d, %Y at %H:%M").to_string(),
        Err(_) => stored.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(word_wrap("hello world", 20), "hello world");
    }

    #[test]
    fn wraps_after_every_nth_token() {
        let text = "a b c d e";
        assert_eq!(word_wrap(text, 2), "a b\nc d\ne");
    }

    #[test]
    fn wrapping_collapses_runs_of_whitespace() {
        // Over the limit, tokens are rejoined with single spaces
        assert_eq!(word_wrap("a  b\tc d e", 2), "a b\nc d\ne");
    }

    #[test]
    fn trailing_newline_is_trimmed() {
        assert_eq!(word_wrap("a b c d", 2), "a b\nc d");
    }

    #[test]
    fn wrap_is_idempotent() {
        let once = word_wrap("one two three four five six", 2);
        assert_eq!(word_wrap(&once, 2), once);
    }

    #[test]
    fn formats_sqlite_timestamps() {
        assert_eq!(
            format_created_at("2026-08-30 14:05:00"),
            "Aug 30, 2026 at 14:05"
        );
    }

    #[test]
    fn unparseable_timestamp_passes_through() {
        assert_eq!(format_created_at("garbage"), "garbage");
    }
}
