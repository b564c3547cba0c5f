//! Runtime settings for loading and logging.
//! Read from an optional JSON file; every field has a default.

use crate::record;

/// Validity-log and CSV parsing settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Single-byte field delimiter. `' '` splits on runs of spaces.
    pub delimiter: char,
    pub has_headers: bool,
    /// Every accepted line is appended here; `null` disables the log.
    pub valid_log: Option<std::path::PathBuf>,
    /// Every rejected line and its reason is appended here; `null` disables the log.
    pub error_log: Option<std::path::PathBuf>,
    pub default_channel: record::Channel,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            delimiter: ',',
            has_headers: false,
            valid_log: Some(std::path::PathBuf::from("log_data.txt")),
            error_log: Some(std::path::PathBuf::from("log_error_data.txt")),
            default_channel: record::Channel::SelfConsumption,
        }
    }
}

impl Settings {
    /// Delimiter as the byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> anyhow::Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(anyhow::anyhow!("Delimiter must be a single ASCII character, got '{}'", self.delimiter))
        }
    }
}

/// Loads settings from a JSON file, or defaults when no path is given.
///
/// # Errors
/// * If the file cannot be read or contains unknown or malformed fields.
pub fn load_settings<P: AsRef<std::path::Path>>(path: Option<P>) -> anyhow::Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.as_ref().display(), e))?;
    let settings: Settings = serde_json::from_str(&text)
        .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.as_ref().display(), e))?;
    settings.delimiter_byte()?;
    log::debug!("Loaded settings from {}: {:?}", path.as_ref().display(), settings);
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let s = load_settings::<&str>(None).unwrap();
        assert_eq!(s.delimiter, ',');
        assert!(!s.has_headers);
        assert_eq!(s.default_channel, record::Channel::SelfConsumption);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "delimiter": ";", "error_log": null, "default_channel": "production" }"#).unwrap();
        let s = load_settings(Some(&path)).unwrap();
        assert_eq!(s.delimiter_byte().unwrap(), b';');
        assert!(s.error_log.is_none());
        assert!(s.valid_log.is_some());
        assert_eq!(s.default_channel, record::Channel::Production);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "separator": ";" }"#).unwrap();
        assert!(load_settings(Some(&path)).is_err());
    }
}
