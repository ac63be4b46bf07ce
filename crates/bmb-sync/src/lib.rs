//! Conversion pipeline orchestration: parse → validate → normalize → map →
//! dedup → emit over a whole export, with a per-run summary.

use std::collections::BTreeMap;

use bmb_adapters::{
    normalize_record, parse_export, validate_record, ApiPayloadMapper, ListFormatMapper, MapRejection,
    NormalizeOptions, NormalizedFragments, ParsedEntry, RecordMapper,
};
use bmb_core::{
    ApiPayloadPair, ConfigError, ConvertConfig, ConvertError, ConvertedOutput, ListBookmark,
    OutputFormat, SkipReason, SourceRecord,
};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, info_span, warn};

mod dedup;
mod settings;
mod stats;

pub use dedup::DedupFilter;
pub use settings::{apply_env_overrides, config_from_yaml_str, load_config};
pub use stats::ExportStats;

pub const CRATE_NAME: &str = "bmb-sync";

/// Per-record progress through the pipeline. Records only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordState {
    Parsed,
    Validated,
    Normalized,
    Mapped,
    Kept,
    DroppedInvalid,
    DroppedDuplicate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub index: usize,
    /// Source id when present, else the input position.
    pub record: String,
    pub reason: SkipReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub kept: usize,
    pub dropped: BTreeMap<SkipReason, usize>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunSummary {
    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }

    pub fn dropped_for(&self, reason: SkipReason) -> usize {
        self.dropped.get(&reason).copied().unwrap_or(0)
    }

    fn record_drop(&mut self, diagnostic: Diagnostic) {
        *self.dropped.entry(diagnostic.reason).or_default() += 1;
        self.diagnostics.push(diagnostic);
    }

    pub fn render_markdown(&self) -> String {
        let mut lines = vec![
            "# Conversion Summary".to_string(),
            String::new(),
            format!("- Records read: {}", self.total),
            format!("- Kept: {}", self.kept),
            format!("- Dropped: {}", self.dropped_total()),
        ];
        for (reason, count) in &self.dropped {
            lines.push(format!("  - {reason}: {count}"));
        }
        if !self.diagnostics.is_empty() {
            lines.push(String::new());
            lines.push("## Skipped Records".to_string());
            for diag in &self.diagnostics {
                match &diag.detail {
                    Some(detail) => lines.push(format!("- {} ({}): {}", diag.record, diag.reason, detail)),
                    None => lines.push(format!("- {} ({})", diag.record, diag.reason)),
                }
            }
        }
        lines.push(String::new());
        lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub output: ConvertedOutput,
    pub summary: RunSummary,
}

/// Mapper paired with the collection its output lands in.
enum Collector {
    List(ListFormatMapper, Vec<ListBookmark>),
    Api(ApiPayloadMapper, Vec<ApiPayloadPair>),
}

impl Collector {
    fn for_config(config: &ConvertConfig) -> Self {
        match config.output_format {
            OutputFormat::List => Self::List(ListFormatMapper::from(config), Vec::new()),
            OutputFormat::Api => Self::Api(ApiPayloadMapper::from(config), Vec::new()),
        }
    }

    fn push(&mut self, record: &SourceRecord, fragments: &NormalizedFragments) {
        match self {
            Self::List(mapper, items) => items.push(mapper.map(record, fragments)),
            Self::Api(mapper, items) => items.push(mapper.map(record, fragments)),
        }
    }

    fn finish(self) -> ConvertedOutput {
        match self {
            Self::List(_, items) => ConvertedOutput::List(items),
            Self::Api(_, items) => ConvertedOutput::Api(items),
        }
    }
}

pub struct ConvertPipeline {
    config: ConvertConfig,
}

impl ConvertPipeline {
    pub fn new(config: ConvertConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Whole-export entry point; fails only when the input is not an entry collection.
    pub fn run_json(&self, value: JsonValue) -> Result<RunOutput, ConvertError> {
        let entries = parse_export(value)?;
        Ok(self.run(entries))
    }

    pub fn run_records(&self, records: Vec<SourceRecord>) -> RunOutput {
        self.run(records.into_iter().map(ParsedEntry::Record).collect())
    }

    /// Processes entries strictly in input order. Deterministic for a given
    /// input and configuration; a fresh dedup filter is used for every call.
    pub fn run(&self, entries: Vec<ParsedEntry>) -> RunOutput {
        let span = info_span!("convert_run", entries = entries.len(), format = ?self.config.output_format);
        let _guard = span.enter();

        let mut collector = Collector::for_config(&self.config);
        let options = NormalizeOptions::from(&self.config);
        let mut dedup = DedupFilter::new(self.config.dedup_mode);
        let mut summary = RunSummary {
            total: entries.len(),
            ..RunSummary::default()
        };

        for (index, entry) in entries.into_iter().enumerate() {
            let record = match entry {
                ParsedEntry::Record(record) => record,
                ParsedEntry::Malformed { detail } => {
                    warn!(index, %detail, "skipping malformed entry");
                    summary.record_drop(Diagnostic {
                        index,
                        record: format!("#{index}"),
                        reason: SkipReason::MalformedRecord,
                        detail: Some(detail),
                    });
                    continue;
                }
            };
            let record_label = record.display_id(index);
            debug!(record = %record_label, state = ?RecordState::Parsed);

            let outcome = validate_record(&record).and_then(|_| {
                debug!(record = %record_label, state = ?RecordState::Validated);
                normalize_record(&record, &options)
            });
            let fragments = match outcome {
                Ok(fragments) => fragments,
                Err(MapRejection { reason, detail }) => {
                    warn!(record = %record_label, %reason, %detail, "skipping record");
                    debug!(record = %record_label, state = ?RecordState::DroppedInvalid);
                    summary.record_drop(Diagnostic {
                        index,
                        record: record_label,
                        reason,
                        detail: Some(detail),
                    });
                    continue;
                }
            };
            debug!(record = %record_label, state = ?RecordState::Normalized, canonical_url = %fragments.canonical_url);

            // Dedup keys come from the normalized fragments, not the mapped output.
            if !dedup.should_keep(&record, &fragments.canonical_url) {
                warn!(record = %record_label, url = fragments.url(), "skipping duplicate record");
                debug!(record = %record_label, state = ?RecordState::DroppedDuplicate);
                summary.record_drop(Diagnostic {
                    index,
                    record: record_label,
                    reason: SkipReason::DuplicateKey,
                    detail: dedup.key_for(&record, &fragments.canonical_url),
                });
                continue;
            }

            collector.push(&record, &fragments);
            debug!(record = %record_label, state = ?RecordState::Mapped);
            summary.kept += 1;
            debug!(record = %record_label, state = ?RecordState::Kept);
        }

        info!(
            total = summary.total,
            kept = summary.kept,
            dropped = summary.dropped_total(),
            "conversion finished"
        );
        RunOutput {
            output: collector.finish(),
            summary,
        }
    }
}
