//! Source export adapter, field normalizers and target record mappers.
//!
//! Everything in this crate works on one record (or one field) at a time and
//! holds no state between calls; the run-scoped pieces live in `bmb-sync`.

pub mod export;
pub mod mapper;
pub mod note;
pub mod tags;
pub mod text;
pub mod timestamp;
pub mod urls;

pub use export::{parse_export, parse_export_str, ParsedEntry};
pub use mapper::{
    normalize_record, validate_record, ApiPayloadMapper, ListFormatMapper, MapRejection,
    NormalizeOptions, NormalizedFragments, RecordMapper,
};
pub use note::build_note;
pub use tags::extract_labels;
pub use timestamp::{format_instant, parse_timestamp, TimestampError};
pub use urls::{canonicalize_url, is_valid_url};

pub const CRATE_NAME: &str = "bmb-adapters";
