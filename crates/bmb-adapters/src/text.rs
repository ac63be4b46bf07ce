//! Small text helpers shared by the mappers and the note synthesizer.

use std::borrow::Cow;

use scraper::Html;

pub const TRUNCATION_MARKER: &str = "...";

/// Caps `text` at `max_chars` Unicode scalar values, marker included.
pub fn truncate_with_marker(text: &str, max_chars: usize) -> Cow<'_, str> {
    if text.chars().count() <= max_chars {
        return Cow::Borrowed(text);
    }
    let marker_len = TRUNCATION_MARKER.chars().count();
    if max_chars <= marker_len {
        return Cow::Owned(TRUNCATION_MARKER.chars().take(max_chars).collect());
    }
    let mut out: String = text.chars().take(max_chars - marker_len).collect();
    out.push_str(TRUNCATION_MARKER);
    Cow::Owned(out)
}

/// URL-friendly slug: lower-cased, non-word characters removed, runs of
/// whitespace, underscores and hyphens collapsed to one hyphen.
pub fn slugify(text: &str, max_chars: usize) -> String {
    let mut slug = String::with_capacity(text.len());
    for ch in text.trim().to_lowercase().chars() {
        let mapped = if ch.is_whitespace() || ch == '_' || ch == '-' {
            '-'
        } else if ch.is_alphanumeric() {
            ch
        } else {
            continue;
        };
        if mapped == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(mapped);
    }
    slug.chars()
        .take(max_chars)
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

/// Plain text of an HTML fragment. Input without markup is returned as-is.
pub fn strip_html(fragment: &str) -> Cow<'_, str> {
    if !fragment.contains('<') {
        return Cow::Borrowed(fragment);
    }
    let parsed = Html::parse_fragment(fragment);
    Cow::Owned(parsed.root_element().text().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_borrowed() {
        assert!(matches!(truncate_with_marker("abc", 3), Cow::Borrowed("abc")));
    }

    #[test]
    fn long_text_ends_with_marker_within_cap() {
        let long = "x".repeat(2000);
        let out = truncate_with_marker(&long, 1000);
        assert_eq!(out.chars().count(), 1000);
        assert!(out.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let out = truncate_with_marker("ééééé", 4);
        assert_eq!(out, "é...");
    }

    #[test]
    fn tiny_caps_still_respect_the_limit() {
        assert_eq!(truncate_with_marker("abcdef", 2), "..");
        assert_eq!(truncate_with_marker("abcdef", 0), "");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Hello,  World! -- Rust_lang ", 80), "hello-world-rust-lang");
        assert_eq!(slugify("Ünïcode Títle", 80), "ünïcode-títle");
        assert_eq!(slugify("!!!", 80), "");
    }

    #[test]
    fn slugify_caps_length_and_trims_hyphens() {
        let slug = slugify(&"word ".repeat(40), 80);
        assert!(slug.chars().count() <= 80);
        assert!(!slug.ends_with('-'));
        assert!(!slug.starts_with('-'));
    }

    #[test]
    fn strip_html_keeps_text_only() {
        assert_eq!(strip_html("<p>Hello <b>world</b></p>"), "Hello world");
        assert_eq!(strip_html("plain & simple"), "plain & simple");
    }
}
