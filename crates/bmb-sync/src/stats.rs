use bmb_adapters::{is_valid_url, ParsedEntry};
use serde::Serialize;

/// Shape of an export before conversion, for the `validate` report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportStats {
    pub total: usize,
    pub malformed: usize,
    pub valid_urls: usize,
    pub with_tags: usize,
    pub with_annotations: usize,
    pub archived: usize,
    pub starred: usize,
}

impl ExportStats {
    pub fn from_entries(entries: &[ParsedEntry]) -> Self {
        let mut stats = Self {
            total: entries.len(),
            ..Self::default()
        };
        for entry in entries {
            let record = match entry {
                ParsedEntry::Record(record) => record,
                ParsedEntry::Malformed { .. } => {
                    stats.malformed += 1;
                    continue;
                }
            };
            stats.valid_urls += usize::from(is_valid_url(record.url.as_deref()));
            stats.with_tags += usize::from(!record.tags.is_empty());
            stats.with_annotations += usize::from(!record.annotations.is_empty());
            stats.archived += usize::from(record.is_archived);
            stats.starred += usize::from(record.is_starred);
        }
        stats
    }

    pub fn invalid(&self) -> usize {
        self.total - self.valid_urls
    }

    pub fn render_table(&self) -> String {
        let rows = [
            ("Total entries", self.total),
            ("Valid URLs", self.valid_urls),
            ("Malformed entries", self.malformed),
            ("With tags", self.with_tags),
            ("With annotations", self.with_annotations),
            ("Archived", self.archived),
            ("Starred", self.starred),
        ];
        let mut lines = vec![format!("{:<18} {:>8}", "Metric", "Count")];
        lines.push(format!("{:-<18} {:->8}", "", ""));
        lines.extend(rows.iter().map(|(label, count)| format!("{label:<18} {count:>8}")));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bmb_adapters::parse_export_str;

    #[test]
    fn counts_each_property_independently() {
        let entries = parse_export_str(
            r#"[
                {"url": "https://a.example", "tags": ["x"], "is_archived": 1},
                {"url": "nope", "annotations": [{"quote": "q"}], "is_starred": true},
                {"url": "https://b.example", "is_archived": true, "is_starred": 1},
                7
            ]"#,
        )
        .unwrap();
        let stats = ExportStats::from_entries(&entries);
        assert_eq!(
            stats,
            ExportStats {
                total: 4,
                malformed: 1,
                valid_urls: 2,
                with_tags: 1,
                with_annotations: 1,
                archived: 2,
                starred: 2,
            }
        );
        assert_eq!(stats.invalid(), 2);
        assert!(stats.render_table().contains("Valid URLs"));
    }
}
