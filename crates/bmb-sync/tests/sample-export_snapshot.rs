use std::path::{Path, PathBuf};

use bmb_core::{ConvertConfig, ConvertedOutput, ListBookmark, OutputFormat, SkipReason};
use bmb_sync::{ConvertPipeline, ExportStats};

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .join("fixtures")
        .join("sample-export")
        .join("sample")
}

fn read_snapshot(path: &Path) -> Vec<ListBookmark> {
    let text = std::fs::read_to_string(path).expect("read snapshot");
    serde_json::from_str(&text).expect("parse snapshot")
}

#[test]
fn list_conversion_matches_golden_snapshot() {
    let entries = bmb_storage::read_export_file(fixture_dir().join("export.json")).unwrap();
    let run = ConvertPipeline::new(ConvertConfig::default())
        .unwrap()
        .run(entries);

    let ConvertedOutput::List(actual) = run.output else {
        panic!("expected list output");
    };
    let expected = read_snapshot(&fixture_dir().join("snapshot.json"));
    assert_eq!(actual, expected);

    assert_eq!(run.summary.total, 6);
    assert_eq!(run.summary.kept, 3);
    assert_eq!(run.summary.dropped_for(SkipReason::DuplicateKey), 1);
    assert_eq!(run.summary.dropped_for(SkipReason::InvalidUrl), 1);
    assert_eq!(run.summary.dropped_for(SkipReason::MalformedRecord), 1);
}

#[test]
fn api_conversion_of_sample_export() {
    let entries = bmb_storage::read_export_file(fixture_dir().join("export.json")).unwrap();
    let run = ConvertPipeline::new(ConvertConfig {
        output_format: OutputFormat::Api,
        ..ConvertConfig::default()
    })
    .unwrap()
    .run(entries);

    let ConvertedOutput::Api(pairs) = run.output else {
        panic!("expected api output");
    };
    assert_eq!(pairs.len(), 3);

    let first = serde_json::to_value(&pairs[0]).unwrap();
    assert_eq!(first["type"], "link");
    assert_eq!(first["favourited"], true);
    assert_eq!(first["archived"], false);
    assert_eq!(first["createdAt"], "2024-03-05T08:20:30.000Z");
    assert_eq!(first["note"], "");
    assert_eq!(
        first["_tags"]["tags"],
        serde_json::json!([{"tagName": "Rust"}, {"tagName": "Programming"}])
    );

    let second = serde_json::to_value(&pairs[1]).unwrap();
    assert!(second.get("_tags").is_none());
    assert_eq!(second["archived"], true);

    assert_eq!(
        pairs[2].create.note,
        "> Deep focus\n  Note: key idea\n\n---\n\nAuthor: Cal\nLanguage: en"
    );
}

#[test]
fn export_stats_for_sample_export() {
    let entries = bmb_storage::read_export_file(fixture_dir().join("export.json")).unwrap();
    let stats = ExportStats::from_entries(&entries);
    assert_eq!(stats.total, 6);
    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.valid_urls, 4);
    assert_eq!(stats.invalid(), 2);
    assert_eq!(stats.with_tags, 3);
    assert_eq!(stats.with_annotations, 1);
    assert_eq!(stats.archived, 2);
    assert_eq!(stats.starred, 1);
}
