//! JSON / YAML decoding shared by [`crate::recipe::Recipe`] and [`crate::quality::RuleSet`].

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::ConfigError;

/// Config file formats, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// `json` → JSON, `yaml` / `yml` → YAML (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => Ok(ConfigFormat::Json),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

pub fn from_json_str<T: DeserializeOwned>(text: &str) -> Result<T, ConfigError> {
    Ok(serde_json::from_str(text)?)
}

pub fn from_yaml_str<T: DeserializeOwned>(text: &str) -> Result<T, ConfigError> {
    Ok(serde_yaml::from_str(text)?)
}

/// Read and decode a config file, choosing the format by extension.
pub fn from_path<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let text = std::fs::read_to_string(path)?;
    match format {
        ConfigFormat::Json => from_json_str(&text),
        ConfigFormat::Yaml => from_yaml_str(&text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn format_from_extension() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("r.JSON")).unwrap(),
            ConfigFormat::Json
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("r.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert!(matches!(
            ConfigFormat::from_path(Path::new("r.toml")),
            Err(ConfigError::UnsupportedFormat { path }) if path == PathBuf::from("r.toml")
        ));
    }
}
