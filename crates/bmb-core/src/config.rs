use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

pub const DEFAULT_MAX_NOTE_LENGTH: usize = 5000;

/// Casing policy applied to tag labels before deduplication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagsMode {
    #[default]
    Preserve,
    Lowercase,
    /// Lower-case and drop every non-alphanumeric character.
    Strip,
}

/// Key used to suppress repeated records within one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupMode {
    #[default]
    Url,
    #[serde(alias = "wallabag-id")]
    SourceId,
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    #[serde(alias = "omnivore")]
    List,
    #[serde(alias = "api-json")]
    Api,
}

impl FromStr for TagsMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(Self::Preserve),
            "lowercase" => Ok(Self::Lowercase),
            "strip" => Ok(Self::Strip),
            _ => Err(ConfigError::UnknownValue {
                field: "tags mode",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for DedupMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "url" => Ok(Self::Url),
            "source-id" | "wallabag-id" | "id" => Ok(Self::SourceId),
            "none" => Ok(Self::None),
            _ => Err(ConfigError::UnknownValue {
                field: "dedup mode",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "list" | "omnivore" => Ok(Self::List),
            "api" | "api-json" => Ok(Self::Api),
            _ => Err(ConfigError::UnknownValue {
                field: "output format",
                value: s.to_string(),
            }),
        }
    }
}

/// Engine configuration. Supplied by the CLI, a YAML file or the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    pub tags_mode: TagsMode,
    pub dedup_mode: DedupMode,
    /// API format only.
    pub include_notes: bool,
    pub max_note_length: usize,
    pub output_format: OutputFormat,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            tags_mode: TagsMode::default(),
            dedup_mode: DedupMode::default(),
            include_notes: true,
            max_note_length: DEFAULT_MAX_NOTE_LENGTH,
            output_format: OutputFormat::default(),
        }
    }
}

impl ConvertConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_note_length == 0 {
            return Err(ConfigError::InvalidMaxNoteLength);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legacy_cli_names() {
        assert_eq!("wallabag-id".parse::<DedupMode>().unwrap(), DedupMode::SourceId);
        assert_eq!("omnivore".parse::<OutputFormat>().unwrap(), OutputFormat::List);
        assert_eq!("api-json".parse::<OutputFormat>().unwrap(), OutputFormat::Api);
        assert_eq!("LOWERCASE".parse::<TagsMode>().unwrap(), TagsMode::Lowercase);
        assert!("shout".parse::<TagsMode>().is_err());
    }

    #[test]
    fn zero_note_length_is_rejected() {
        let config = ConvertConfig {
            max_note_length: 0,
            ..ConvertConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidMaxNoteLength));
        assert!(ConvertConfig::default().validate().is_ok());
    }
}
