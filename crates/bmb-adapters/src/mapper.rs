//! Record mappers: one validated, normalized source record in, one target
//! record out. Validation and normalization happen once in
//! [`normalize_record`]; the two mappers only arrange the fragments.

use bmb_core::{
    ApiPayloadPair, AttachTagsRequest, BookmarkSource, BookmarkState, BookmarkType,
    ConvertConfig, CrawlPriority, CreateBookmarkRequest, ListBookmark, OutputFormat, SkipReason,
    SourceRecord, TagsMode,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::note::build_note;
use crate::tags::extract_labels;
use crate::text::{slugify, truncate_with_marker};
use crate::timestamp::{first_parsable, format_instant};
use crate::urls::{canonicalize_url, is_valid_url};

/// Prefix keeping list-format ids clear of the target's own id namespace.
pub const ID_PREFIX: &str = "wb-";
pub const MAX_TITLE_LENGTH: usize = 1000;
pub const MAX_SLUG_LENGTH: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapRejection {
    pub reason: SkipReason,
    pub detail: String,
}

impl MapRejection {
    pub fn new(reason: SkipReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

/// Per-record values derived from a source record that passed validation.
/// Only [`normalize_record`] builds these, so holding one proves the URL is valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFragments {
    url: String,
    pub canonical_url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub labels: Vec<String>,
    pub note: String,
}

impl NormalizedFragments {
    /// Original URL as found in the source, preserved in target records.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub tags_mode: TagsMode,
    /// Note cap; `None` skips note synthesis.
    pub note_length: Option<usize>,
}

impl From<&ConvertConfig> for NormalizeOptions {
    fn from(config: &ConvertConfig) -> Self {
        let wants_note = config.output_format == OutputFormat::Api && config.include_notes;
        Self {
            tags_mode: config.tags_mode,
            note_length: wants_note.then_some(config.max_note_length),
        }
    }
}

pub fn validate_record(record: &SourceRecord) -> Result<&str, MapRejection> {
    match record.url.as_deref() {
        Some(url) if is_valid_url(Some(url)) => Ok(url),
        Some(url) => Err(MapRejection::new(
            SkipReason::InvalidUrl,
            format!("not an http(s) URL: {url:?}"),
        )),
        None => Err(MapRejection::new(SkipReason::InvalidUrl, "missing url")),
    }
}

pub fn normalize_record(
    record: &SourceRecord,
    options: &NormalizeOptions,
) -> Result<NormalizedFragments, MapRejection> {
    let url = validate_record(record)?;
    Ok(NormalizedFragments {
        url: url.to_string(),
        canonical_url: canonicalize_url(url),
        created_at: first_parsable([record.created_at.as_deref(), record.updated_at.as_deref()]),
        labels: extract_labels(&record.tags, options.tags_mode),
        note: options
            .note_length
            .map(|max| build_note(record, max))
            .unwrap_or_default(),
    })
}

pub trait RecordMapper {
    type Output;

    fn options(&self) -> NormalizeOptions;

    fn map(&self, record: &SourceRecord, fragments: &NormalizedFragments) -> Self::Output;

    /// Validate, normalize and map in one step.
    fn convert(&self, record: &SourceRecord) -> Result<Self::Output, MapRejection> {
        let fragments = normalize_record(record, &self.options())?;
        Ok(self.map(record, &fragments))
    }
}

/// Maps to the JSON-array import format.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListFormatMapper {
    pub tags_mode: TagsMode,
}

impl RecordMapper for ListFormatMapper {
    type Output = ListBookmark;

    fn options(&self) -> NormalizeOptions {
        NormalizeOptions {
            tags_mode: self.tags_mode,
            note_length: None,
        }
    }

    fn map(&self, record: &SourceRecord, fragments: &NormalizedFragments) -> ListBookmark {
        let title = title_or_url(record, fragments.url());
        ListBookmark {
            id: list_id(record, fragments.url()),
            slug: slugify(&title, MAX_SLUG_LENGTH),
            title,
            url: fragments.url().to_string(),
            description: String::new(),
            saved_at: fragments.created_at.as_ref().map(format_instant),
            labels: fragments.labels.clone(),
            state: if record.is_archived {
                BookmarkState::Archived
            } else {
                BookmarkState::Active
            },
        }
    }
}

/// Maps to the create + tag-attach payload pair of the bookmark API.
#[derive(Debug, Clone, Copy)]
pub struct ApiPayloadMapper {
    pub tags_mode: TagsMode,
    pub include_notes: bool,
    pub max_note_length: usize,
}

impl Default for ApiPayloadMapper {
    fn default() -> Self {
        Self::from(&ConvertConfig::default())
    }
}

impl From<&ConvertConfig> for ApiPayloadMapper {
    fn from(config: &ConvertConfig) -> Self {
        Self {
            tags_mode: config.tags_mode,
            include_notes: config.include_notes,
            max_note_length: config.max_note_length,
        }
    }
}

impl From<&ConvertConfig> for ListFormatMapper {
    fn from(config: &ConvertConfig) -> Self {
        Self {
            tags_mode: config.tags_mode,
        }
    }
}

impl RecordMapper for ApiPayloadMapper {
    type Output = ApiPayloadPair;

    fn options(&self) -> NormalizeOptions {
        NormalizeOptions {
            tags_mode: self.tags_mode,
            note_length: self.include_notes.then_some(self.max_note_length),
        }
    }

    fn map(&self, record: &SourceRecord, fragments: &NormalizedFragments) -> ApiPayloadPair {
        let title = title_or_url(record, fragments.url());
        ApiPayloadPair {
            create: CreateBookmarkRequest {
                kind: BookmarkType::Link,
                url: fragments.url().to_string(),
                title: truncate_with_marker(&title, MAX_TITLE_LENGTH).into_owned(),
                archived: record.is_archived,
                favourited: record.is_starred,
                note: fragments.note.clone(),
                created_at: fragments.created_at.as_ref().map(format_instant),
                source: BookmarkSource::Import,
                crawl_priority: CrawlPriority::Low,
            },
            tags: AttachTagsRequest::from_labels(&fragments.labels),
        }
    }
}

fn title_or_url(record: &SourceRecord, url: &str) -> String {
    record
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or(url)
        .to_string()
}

/// Source id when present, else a UUIDv5 of the URL (stable across runs and platforms).
fn list_id(record: &SourceRecord, url: &str) -> String {
    match record.id {
        Some(id) => format!("{ID_PREFIX}{id}"),
        None => format!("{ID_PREFIX}{}", Uuid::new_v5(&Uuid::NAMESPACE_URL, url.as_bytes())),
    }
}
