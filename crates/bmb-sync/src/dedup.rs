//! Run-scoped duplicate suppression.

use std::collections::HashSet;

use bmb_core::{DedupMode, SourceRecord};
use tracing::debug;

/// Exact-match seen-key set. One instance per run; first occurrence wins.
#[derive(Debug, Clone)]
pub struct DedupFilter {
    mode: DedupMode,
    seen: HashSet<String>,
}

impl DedupFilter {
    pub fn new(mode: DedupMode) -> Self {
        Self {
            mode,
            seen: HashSet::new(),
        }
    }

    /// `None` means the record is never deduplicated under the current mode.
    pub fn key_for(&self, record: &SourceRecord, canonical_url: &str) -> Option<String> {
        match self.mode {
            DedupMode::Url => Some(format!("url:{canonical_url}")),
            DedupMode::SourceId => record.id.map(|id| format!("id:{id}")),
            DedupMode::None => None,
        }
    }

    pub fn should_keep(&mut self, record: &SourceRecord, canonical_url: &str) -> bool {
        let Some(key) = self.key_for(record, canonical_url) else {
            return true;
        };
        if self.seen.contains(&key) {
            debug!(mode = ?self.mode, %key, "duplicate key");
            return false;
        }
        self.seen.insert(key);
        true
    }

    pub fn seen_keys(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bmb_adapters::canonicalize_url;

    fn keep(filter: &mut DedupFilter, record: &SourceRecord) -> bool {
        let canonical = canonicalize_url(record.url.as_deref().unwrap_or_default());
        filter.should_keep(record, &canonical)
    }

    fn with_id(id: i64, url: &str) -> SourceRecord {
        SourceRecord {
            id: Some(id),
            ..SourceRecord::with_url(url)
        }
    }

    #[test]
    fn url_mode_treats_canonical_twins_as_duplicates() {
        let mut filter = DedupFilter::new(DedupMode::Url);
        assert!(keep(&mut filter, &SourceRecord::with_url("https://example.com/a?utm_source=x")));
        assert!(!keep(&mut filter, &SourceRecord::with_url("https://EXAMPLE.com/a/")));
        assert!(keep(&mut filter, &SourceRecord::with_url("https://example.com/b")));
        assert_eq!(filter.seen_keys(), 2);
    }

    #[test]
    fn source_id_mode_ignores_urls_and_never_drops_idless_records() {
        let mut filter = DedupFilter::new(DedupMode::SourceId);
        assert!(keep(&mut filter, &with_id(1, "https://example.com")));
        assert!(keep(&mut filter, &with_id(2, "https://example.com")));
        assert!(!keep(&mut filter, &with_id(1, "https://other.example")));
        assert!(keep(&mut filter, &SourceRecord::with_url("https://example.com")));
        assert!(keep(&mut filter, &SourceRecord::with_url("https://example.com")));
    }

    #[test]
    fn none_mode_keeps_everything() {
        let mut filter = DedupFilter::new(DedupMode::None);
        for _ in 0..3 {
            assert!(keep(&mut filter, &with_id(1, "https://example.com")));
        }
        assert_eq!(filter.seen_keys(), 0);
    }

    #[test]
    fn separate_filters_do_not_share_state() {
        let mut first = DedupFilter::new(DedupMode::Url);
        let mut second = DedupFilter::new(DedupMode::Url);
        let record = SourceRecord::with_url("https://example.com");
        assert!(keep(&mut first, &record));
        assert!(keep(&mut second, &record));
    }
}
