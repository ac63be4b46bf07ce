//! Builds the single free-text note of the API payload from annotations and
//! the metadata fields that have no target equivalent.

use bmb_core::{Annotation, SourceRecord};

use crate::text::{strip_html, truncate_with_marker};

pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Annotations first, metadata second, capped at `max_length` characters.
pub fn build_note(record: &SourceRecord, max_length: usize) -> String {
    let sections = [annotations_section(&record.annotations), metadata_section(record)];
    let note = sections
        .iter()
        .filter(|section| !section.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR);
    truncate_with_marker(&note, max_length).into_owned()
}

/// One block per annotation with content, separated by a blank line:
/// a `> ` quote line and an indented `Note:` line.
pub fn annotations_section(annotations: &[Annotation]) -> String {
    annotations
        .iter()
        .filter_map(annotation_block)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn annotation_block(annotation: &Annotation) -> Option<String> {
    let quote = clean(annotation.quote.as_deref());
    let text = clean(annotation.text.as_deref());
    let mut lines = Vec::new();
    if let Some(quote) = quote {
        lines.push(format!("> {}", quote.replace('\n', "\n> ")));
    }
    if let Some(text) = text {
        lines.push(format!("  Note: {text}"));
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

pub fn metadata_section(record: &SourceRecord) -> String {
    let mut lines = Vec::new();

    let authors = record
        .published_by
        .iter()
        .map(|author| author.trim())
        .filter(|author| !author.is_empty())
        .collect::<Vec<_>>();
    if !authors.is_empty() {
        lines.push(format!("Author: {}", authors.join(", ")));
    }
    if let Some(published) = clean(record.published_at.as_deref()) {
        lines.push(format!("Published: {published}"));
    }
    if let Some(language) = clean(record.language.as_deref()) {
        lines.push(format!("Language: {language}"));
    }
    if let Some(origin) = clean(record.origin_url.as_deref()) {
        lines.push(format!("Origin URL: {origin}"));
    }

    lines.join("\n")
}

fn clean(value: Option<&str>) -> Option<String> {
    let stripped = strip_html(value?.trim());
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(annotations: Vec<Annotation>) -> SourceRecord {
        SourceRecord {
            annotations,
            ..SourceRecord::with_url("https://example.com")
        }
    }

    #[test]
    fn empty_annotation_contributes_nothing() {
        let record = record_with(vec![Annotation::new("", ""), Annotation::new("Q", "T")]);
        assert_eq!(build_note(&record, 5000), "> Q\n  Note: T");
    }

    #[test]
    fn annotations_are_separated_by_a_blank_line() {
        let record = record_with(vec![
            Annotation::new("First", ""),
            Annotation {
                quote: None,
                text: Some("Only a note".into()),
            },
        ]);
        assert_eq!(build_note(&record, 5000), "> First\n\n  Note: Only a note");
    }

    #[test]
    fn metadata_lines_follow_fixed_order() {
        let record = SourceRecord {
            published_by: vec!["Ada".into(), " ".into(), "Grace".into()],
            published_at: Some("2024-05-01 10:00:00".into()),
            language: Some("en".into()),
            origin_url: Some("https://origin.example".into()),
            ..SourceRecord::with_url("https://example.com")
        };
        assert_eq!(
            build_note(&record, 5000),
            "Author: Ada, Grace\nPublished: 2024-05-01 10:00:00\nLanguage: en\nOrigin URL: https://origin.example"
        );
    }

    #[test]
    fn both_sections_are_joined_by_a_rule() {
        let record = SourceRecord {
            language: Some("fr".into()),
            ..record_with(vec![Annotation::new("Q", "T")])
        };
        assert_eq!(build_note(&record, 5000), "> Q\n  Note: T\n\n---\n\nLanguage: fr");
    }

    #[test]
    fn nothing_to_say_is_the_empty_string() {
        let record = SourceRecord {
            language: Some("  ".into()),
            ..record_with(vec![Annotation::new("", "")])
        };
        assert_eq!(build_note(&record, 5000), "");
    }

    #[test]
    fn html_in_annotations_is_stripped() {
        let record = record_with(vec![Annotation::new("<em>Quoted</em> text", "<p>mine</p>")]);
        assert_eq!(build_note(&record, 5000), "> Quoted text\n  Note: mine");
    }

    #[test]
    fn note_is_capped_with_marker() {
        let record = record_with(vec![Annotation::new("q".repeat(100), "")]);
        let note = build_note(&record, 20);
        assert_eq!(note.chars().count(), 20);
        assert!(note.ends_with("..."));
        assert!(note.starts_with("> qqq"));
    }
}
