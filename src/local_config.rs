//! Per-checkout settings kept beside the project file, for include paths and
//! compiler options that differ between machines.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

const VERSIONS: &[&str] = &["1.0", "1.1"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConfig {
    pub version: String,
    #[serde(default)]
    pub include_paths: Vec<String>,
    #[serde(default)]
    pub compilation_options: Vec<String>,
}

impl Default for LocalConfig {
    fn default() -> Self {
        LocalConfig {
            version: VERSIONS[VERSIONS.len() - 1].to_string(),
            include_paths: Vec::new(),
            compilation_options: Vec::new(),
        }
    }
}

impl LocalConfig {
    pub fn parse(text: &str, path: &str) -> Result<LocalConfig> {
        let config: LocalConfig =
            toml::from_str(text).map_err(|err| Error::Config(format!("{}: {}", path, err)))?;
        if !VERSIONS.contains(&config.version.as_str()) {
            return Err(Error::Config(format!(
                "{}: config file version '{}' incorrect",
                path, config.version
            )));
        }
        Ok(config)
    }

    pub fn load(path: &str) -> Result<LocalConfig> {
        let text = std::fs::read_to_string(path)?;
        LocalConfig::parse(&text, path)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let text = toml::to_string(self).map_err(|err| Error::Config(err.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }
}
