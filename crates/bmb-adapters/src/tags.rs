//! Flattens the mixed string/object tag encodings into one ordered label set.

use std::collections::HashSet;

use bmb_core::{SourceTag, TagsMode};

/// Ordered, deduplicated labels under `mode`. Never fails.
pub fn extract_labels(tags: &[SourceTag], mode: TagsMode) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .filter_map(raw_label)
        .filter_map(|raw| normalize_label(raw, mode))
        .filter(|label| seen.insert(label.clone()))
        .collect()
}

/// `label` wins over `slug`; a blank `label` counts as missing.
fn raw_label(tag: &SourceTag) -> Option<&str> {
    match tag {
        SourceTag::Label(label) => Some(label.as_str()),
        SourceTag::Object(obj) => obj
            .label
            .as_deref()
            .filter(|label| !label.trim().is_empty())
            .or(obj.slug.as_deref()),
    }
}

pub fn normalize_label(raw: &str, mode: TagsMode) -> Option<String> {
    let trimmed = raw.trim();
    let label = match mode {
        TagsMode::Preserve => trimmed.to_string(),
        TagsMode::Lowercase => trimmed.to_lowercase(),
        TagsMode::Strip => trimmed
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect(),
    };
    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}
