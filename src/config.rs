use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_preferred_provider")]
    pub preferred_provider: String,
    #[serde(default)]
    pub providers: ProviderOverrides,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

/// Optional per-provider model and endpoint overrides. Anything left unset
/// falls back to the provider's built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderOverrides {
    #[serde(default)]
    pub openai: ProviderConfig,
    #[serde(default)]
    pub anthropic: ProviderConfig,
    #[serde(default)]
    pub google: ProviderConfig,
    #[serde(default)]
    pub groq: ProviderConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_preferred_provider() -> String {
    "groq".to_string()
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_provider: default_preferred_provider(),
            providers: ProviderOverrides::default(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("codemaster").join("config.yaml")
    }

    /// Loads the config file if it exists and parses, otherwise falls back
    /// to defaults. A missing file is written out on first run so there is
    /// something to edit; a malformed file is left untouched and is not
    /// fatal to startup.
    pub fn load_or_default() -> Self {
        Self::load_or_init(Self::config_path())
    }

    fn load_or_init<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if path.exists() {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(err) => {
                    tracing::warn!("ignoring unreadable config {}: {err:#}", path.display());
                    return Self::default();
                }
            }
        }
        let config = Self::default();
        if let Err(err) = config.save_to_file(path) {
            tracing::warn!("could not write default config {}: {err:#}", path.display());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.preferred_provider, "groq");
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.temperature, 0.7);
        assert!(config.providers.openai.model.is_none());
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let config: Config =
            serde_yaml::from_str("preferred_provider: openai\n").expect("parse");
        assert_eq!(config.preferred_provider, "openai");
        assert_eq!(config.max_tokens, 2000);
    }

    #[test]
    fn first_run_writes_the_default_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("codemaster").join("config.yaml");

        let config = Config::load_or_init(&path);
        assert_eq!(config.preferred_provider, "groq");

        let written = Config::load_from_file(&path).expect("written file parses");
        assert_eq!(written.max_tokens, 2000);
    }

    #[test]
    fn malformed_config_is_left_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        fs::write(&path, "preferred_provider: [not: valid").expect("write");

        let config = Config::load_or_init(&path);
        assert_eq!(config.preferred_provider, "groq");
        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            "preferred_provider: [not: valid"
        );
    }

    #[test]
    fn round_trips_through_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.preferred_provider = "anthropic".to_string();
        config.providers.groq.model = Some("llama-3.1-70b-versatile".to_string());
        config.save_to_file(&path).expect("save");

        let loaded = Config::load_from_file(&path).expect("load");
        assert_eq!(loaded.preferred_provider, "anthropic");
        assert_eq!(
            loaded.providers.groq.model.as_deref(),
            Some("llama-3.1-70b-versatile")
        );
    }
}
