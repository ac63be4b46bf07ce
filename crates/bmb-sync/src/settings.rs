//! Layered engine configuration: defaults, then an optional YAML file, then
//! `BMB_*` environment variables. CLI flags are applied last by the caller.

use std::path::Path;

use anyhow::{Context, Result};
use bmb_core::{ConfigError, ConvertConfig};

pub fn load_config(yaml_path: Option<&Path>) -> Result<ConvertConfig> {
    let base = match yaml_path {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            config_from_yaml_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => ConvertConfig::default(),
    };
    let config = apply_env_overrides(base, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Missing keys keep their defaults.
pub fn config_from_yaml_str(text: &str) -> Result<ConvertConfig> {
    if text.trim().is_empty() {
        return Ok(ConvertConfig::default());
    }
    let config: ConvertConfig = serde_yaml::from_str(text).context("invalid conversion config")?;
    config.validate()?;
    Ok(config)
}

pub fn apply_env_overrides(
    mut config: ConvertConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ConvertConfig, ConfigError> {
    if let Some(v) = lookup("BMB_TAGS_MODE") {
        config.tags_mode = v.parse()?;
    }
    if let Some(v) = lookup("BMB_DEDUP_MODE") {
        config.dedup_mode = v.parse()?;
    }
    if let Some(v) = lookup("BMB_OUTPUT_FORMAT") {
        config.output_format = v.parse()?;
    }
    if let Some(v) = lookup("BMB_INCLUDE_NOTES") {
        config.include_notes = parse_flag(&v).ok_or(ConfigError::InvalidValue {
            field: "include notes",
            value: v.clone(),
        })?;
    }
    if let Some(v) = lookup("BMB_MAX_NOTE_LENGTH") {
        config.max_note_length = v.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: "max note length",
            value: v.clone(),
        })?;
    }
    config.validate()?;
    Ok(config)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bmb_core::{DedupMode, OutputFormat, TagsMode};
    use std::collections::HashMap;

    #[test]
    fn yaml_overrides_only_given_keys() {
        let config = config_from_yaml_str("tags_mode: lowercase\ndedup_mode: source-id\n").unwrap();
        assert_eq!(config.tags_mode, TagsMode::Lowercase);
        assert_eq!(config.dedup_mode, DedupMode::SourceId);
        assert_eq!(config.output_format, OutputFormat::List);
        assert!(config.include_notes);
        assert_eq!(config.max_note_length, 5000);
    }

    #[test]
    fn yaml_with_zero_note_length_is_rejected() {
        assert!(config_from_yaml_str("max_note_length: 0").is_err());
        assert!(config_from_yaml_str("tags_mode: loud").is_err());
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BMB_TAGS_MODE", "strip"),
            ("BMB_OUTPUT_FORMAT", "api-json"),
            ("BMB_INCLUDE_NOTES", "0"),
            ("BMB_MAX_NOTE_LENGTH", "120"),
        ]);
        let config = apply_env_overrides(ConvertConfig::default(), |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.tags_mode, TagsMode::Strip);
        assert_eq!(config.output_format, OutputFormat::Api);
        assert!(!config.include_notes);
        assert_eq!(config.max_note_length, 120);
    }

    #[test]
    fn bad_env_values_are_reported() {
        let err = apply_env_overrides(ConvertConfig::default(), |k| {
            (k == "BMB_MAX_NOTE_LENGTH").then(|| "lots".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = apply_env_overrides(ConvertConfig::default(), |k| {
            (k == "BMB_DEDUP_MODE").then(|| "fuzzy".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownValue { .. }));

        for bad in ["on", "yes please", "ture"] {
            let err = apply_env_overrides(ConvertConfig::default(), |k| {
                (k == "BMB_INCLUDE_NOTES").then(|| bad.to_string())
            })
            .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { field: "include notes", .. }), "{bad}");
        }
    }

    #[test]
    fn include_notes_flag_accepts_common_spellings() {
        for (raw, expected) in [("1", true), ("TRUE", true), (" yes ", true), ("0", false), ("False", false), ("NO", false)] {
            let config = apply_env_overrides(ConvertConfig::default(), |k| {
                (k == "BMB_INCLUDE_NOTES").then(|| raw.to_string())
            })
            .unwrap();
            assert_eq!(config.include_notes, expected, "{raw}");
        }
    }

    #[test]
    fn config_file_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bmb.yaml");
        std::fs::write(&path, "output_format: api\ninclude_notes: false\n").unwrap();
        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.output_format, OutputFormat::Api);
        assert!(!config.include_notes);

        let missing = load_config(Some(dir.path().join("absent.yaml").as_path())).unwrap_err();
        assert!(missing.to_string().contains("absent.yaml"));
    }
}
