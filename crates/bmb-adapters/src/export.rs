//! Accepts the two export shapes of the originating service: a bare JSON
//! array of entries, or an object wrapping them under `entries`.

use bmb_core::{ConvertError, SourceRecord};
use serde_json::Value as JsonValue;

/// One element of the export, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedEntry {
    Record(SourceRecord),
    /// The element was not a record at all (a string, a number, ...).
    Malformed { detail: String },
}

pub fn parse_export_str(text: &str) -> Result<Vec<ParsedEntry>, ConvertError> {
    let value: JsonValue = serde_json::from_str(text)
        .map_err(|e| ConvertError::MalformedInput(format!("invalid JSON: {e}")))?;
    parse_export(value)
}

pub fn parse_export(value: JsonValue) -> Result<Vec<ParsedEntry>, ConvertError> {
    let items = match value {
        JsonValue::Array(items) => items,
        JsonValue::Object(mut map) => match map.remove("entries") {
            Some(JsonValue::Array(items)) => items,
            Some(other) => {
                return Err(ConvertError::MalformedInput(format!(
                    "`entries` must be an array, found {}",
                    json_kind(&other)
                )))
            }
            None => {
                return Err(ConvertError::MalformedInput(
                    "expected an array of entries or an object with an `entries` key".to_string(),
                ))
            }
        },
        other => {
            return Err(ConvertError::MalformedInput(format!(
                "expected an array of entries, found {}",
                json_kind(&other)
            )))
        }
    };

    Ok(items.into_iter().map(parse_entry).collect())
}

fn parse_entry(item: JsonValue) -> ParsedEntry {
    // serde would happily read a JSON array positionally into the struct.
    if !item.is_object() {
        return ParsedEntry::Malformed {
            detail: format!("expected an object, found {}", json_kind(&item)),
        };
    }
    match serde_json::from_value::<SourceRecord>(item) {
        Ok(record) => ParsedEntry::Record(record),
        Err(e) => ParsedEntry::Malformed {
            detail: e.to_string(),
        },
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_array_and_wrapper_are_equivalent() {
        let bare = parse_export_str(r#"[{"url": "https://a.example"}]"#).unwrap();
        let wrapped = parse_export_str(r#"{"entries": [{"url": "https://a.example"}]}"#).unwrap();
        assert_eq!(bare, wrapped);
        assert_eq!(bare.len(), 1);
    }

    #[test]
    fn non_collection_input_is_malformed() {
        assert!(matches!(
            parse_export_str(r#"{"items": []}"#),
            Err(ConvertError::MalformedInput(_))
        ));
        assert!(matches!(parse_export_str("42"), Err(ConvertError::MalformedInput(_))));
        assert!(matches!(parse_export_str("not json"), Err(ConvertError::MalformedInput(_))));
        assert!(matches!(
            parse_export_str(r#"{"entries": "nope"}"#),
            Err(ConvertError::MalformedInput(_))
        ));
    }

    #[test]
    fn bad_elements_are_kept_as_malformed_entries() {
        let entries = parse_export_str(r#"[{"url": "https://a.example"}, "junk", [1, 2], null]"#).unwrap();
        assert_eq!(entries.len(), 4);
        assert!(matches!(entries[0], ParsedEntry::Record(_)));
        assert!(matches!(entries[1], ParsedEntry::Malformed { .. }));
        assert!(matches!(entries[2], ParsedEntry::Malformed { .. }));
        assert!(matches!(entries[3], ParsedEntry::Malformed { .. }));
    }

    #[test]
    fn empty_export_is_not_an_error() {
        assert!(parse_export_str("[]").unwrap().is_empty());
    }
}
