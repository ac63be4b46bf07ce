//! Core domain model for bookmark conversion: the permissive source record,
//! the two strict target shapes, configuration enums and the skip taxonomy.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

mod config;
mod de;
mod error;

pub use config::{ConvertConfig, DedupMode, OutputFormat, TagsMode, DEFAULT_MAX_NOTE_LENGTH};
pub use error::{ConfigError, ConvertError, SkipReason};

pub const CRATE_NAME: &str = "bmb-core";

/// One bookmark entry as exported by the originating service.
///
/// Every field is optional and deserialization never fails on a sparse or
/// slightly mistyped entry; all "what if this is missing" decisions belong to
/// the mappers. Both the full-export snake_case names and the API camelCase
/// names are accepted; when an entry carries both, the snake_case one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(remote = "Self", default)]
pub struct SourceRecord {
    #[serde(deserialize_with = "de::lenient_id")]
    pub id: Option<i64>,
    #[serde(deserialize_with = "de::lenient_string")]
    pub url: Option<String>,
    #[serde(deserialize_with = "de::lenient_string")]
    pub title: Option<String>,
    #[serde(rename = "createdAt", alias = "created_at", deserialize_with = "de::lenient_string")]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt", alias = "updated_at", deserialize_with = "de::lenient_string")]
    pub updated_at: Option<String>,
    #[serde(rename = "publishedAt", alias = "published_at", deserialize_with = "de::lenient_string")]
    pub published_at: Option<String>,
    #[serde(rename = "archivedAt", alias = "archived_at", deserialize_with = "de::lenient_string")]
    pub archived_at: Option<String>,
    #[serde(rename = "starredAt", alias = "starred_at", deserialize_with = "de::lenient_string")]
    pub starred_at: Option<String>,
    #[serde(rename = "isArchived", alias = "is_archived", deserialize_with = "de::lenient_bool")]
    pub is_archived: bool,
    #[serde(rename = "isStarred", alias = "is_starred", deserialize_with = "de::lenient_bool")]
    pub is_starred: bool,
    #[serde(deserialize_with = "de::lenient_vec")]
    pub tags: Vec<SourceTag>,
    #[serde(deserialize_with = "de::lenient_vec")]
    pub annotations: Vec<Annotation>,
    #[serde(rename = "publishedBy", alias = "published_by", deserialize_with = "de::string_or_list")]
    pub published_by: Vec<String>,
    #[serde(rename = "originUrl", alias = "origin_url", deserialize_with = "de::lenient_string")]
    pub origin_url: Option<String>,
    #[serde(deserialize_with = "de::lenient_string")]
    pub language: Option<String>,
}

/// (export name, API name) pairs for the same field.
const FIELD_SPELLINGS: &[(&str, &str)] = &[
    ("created_at", "createdAt"),
    ("updated_at", "updatedAt"),
    ("published_at", "publishedAt"),
    ("archived_at", "archivedAt"),
    ("starred_at", "starredAt"),
    ("is_archived", "isArchived"),
    ("is_starred", "isStarred"),
    ("published_by", "publishedBy"),
    ("origin_url", "originUrl"),
];

impl<'de> Deserialize<'de> for SourceRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut fields = JsonMap::<String, JsonValue>::deserialize(deserializer)?;
        for (export_name, api_name) in FIELD_SPELLINGS {
            if fields.contains_key(*export_name) {
                fields.remove(*api_name);
            }
        }
        SourceRecord::deserialize(JsonValue::Object(fields)).map_err(D::Error::custom)
    }
}

impl SourceRecord {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Identifier used in diagnostics: the source id when present, else the input position.
    pub fn display_id(&self, index: usize) -> String {
        match self.id {
            Some(id) => format!("id={id}"),
            None => format!("#{index}"),
        }
    }
}

/// Tag element of a source record. Full exports carry plain labels, API
/// exports carry objects; both may appear in one list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SourceTag {
    Label(String),
    Object(TagObject),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TagObject {
    #[serde(deserialize_with = "de::lenient_id")]
    pub id: Option<i64>,
    #[serde(deserialize_with = "de::lenient_string")]
    pub label: Option<String>,
    #[serde(deserialize_with = "de::lenient_string")]
    pub slug: Option<String>,
}

/// Highlight fragment: the quoted passage and the reader's note on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Annotation {
    #[serde(deserialize_with = "de::lenient_string")]
    pub quote: Option<String>,
    #[serde(deserialize_with = "de::lenient_string")]
    pub text: Option<String>,
}

impl Annotation {
    pub fn new(quote: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            quote: Some(quote.into()),
            text: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookmarkState {
    Active,
    Archived,
}

/// List-format target record (JSON array import).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBookmark {
    pub id: String,
    pub title: String,
    pub url: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
    pub slug: String,
    pub labels: Vec<String>,
    pub state: BookmarkState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkType {
    #[default]
    Link,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkSource {
    #[default]
    Import,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlPriority {
    #[default]
    Low,
    Normal,
}

/// Create payload for the target service's bookmark endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookmarkRequest {
    #[serde(rename = "type")]
    pub kind: BookmarkType,
    pub url: String,
    pub title: String,
    pub archived: bool,
    pub favourited: bool,
    pub note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub source: BookmarkSource,
    pub crawl_priority: CrawlPriority,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAttachment {
    #[serde(rename = "tagName")]
    pub tag_name: String,
}

/// Tag-attach payload applied to the bookmark created by its paired create payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachTagsRequest {
    pub tags: Vec<TagAttachment>,
}

impl AttachTagsRequest {
    /// `None` for an empty label list: an empty attach payload is never emitted.
    pub fn from_labels(labels: &[String]) -> Option<Self> {
        if labels.is_empty() {
            return None;
        }
        Some(Self {
            tags: labels
                .iter()
                .map(|label| TagAttachment {
                    tag_name: label.clone(),
                })
                .collect(),
        })
    }
}

/// Create payload plus its optional tag payload, correlated by position only.
/// Serialized as the create payload with the tag payload under `_tags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiPayloadPair {
    #[serde(flatten)]
    pub create: CreateBookmarkRequest,
    #[serde(rename = "_tags", default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<AttachTagsRequest>,
}

/// Mapped output of a whole run, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConvertedOutput {
    List(Vec<ListBookmark>),
    Api(Vec<ApiPayloadPair>),
}

impl ConvertedOutput {
    pub fn len(&self) -> usize {
        match self {
            Self::List(items) => items.len(),
            Self::Api(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
