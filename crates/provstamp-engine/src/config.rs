//! Engine configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! vocabulary = 2
//! wipe = "recognized"
//!
//! [tool]
//! backend = "exiftool"
//! program = "/usr/bin/exiftool"
//! timeout_secs = 30
//! ```

use crate::request::WipeMode;
use provstamp_format::{ExifTool, FormatRegistry, PngTextTool, TagTool};
use provstamp_record::Vocabulary;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Which tool edits PNG text tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process chunk editor
    #[default]
    Native,
    /// External exiftool binary
    Exiftool,
}

/// `[tool]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    pub backend: Backend,
    /// Program used by the exiftool backend
    pub program: PathBuf,
    /// Per-invocation timeout
    pub timeout_secs: u64,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Native,
            program: PathBuf::from("exiftool"),
            timeout_secs: 30,
        }
    }
}

impl ToolConfig {
    /// Timeout as a duration
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// PNG tag tool for this configuration
    #[must_use]
    pub fn png_tool(&self) -> Arc<dyn TagTool> {
        match self.backend {
            Backend::Native => Arc::new(PngTextTool::new()),
            Backend::Exiftool => Arc::new(
                ExifTool::new()
                    .with_program(&self.program)
                    .with_timeout(self.timeout()),
            ),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Vocabulary written by `stamp` and read by `extract`
    pub vocabulary: Vocabulary,
    /// Default wipe mode
    pub wipe: WipeMode,
    pub tool: ToolConfig,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns error on invalid TOML, unknown keys, or out-of-range values
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// With vocabulary
    #[inline]
    #[must_use]
    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// With wipe mode
    #[inline]
    #[must_use]
    pub fn with_wipe(mut self, wipe: WipeMode) -> Self {
        self.wipe = wipe;
        self
    }

    /// With tool settings
    #[inline]
    #[must_use]
    pub fn with_tool(mut self, tool: ToolConfig) -> Self {
        self.tool = tool;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tool.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "tool.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.tool.backend == Backend::Exiftool && self.tool.program.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "tool.program",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Format registry using the configured PNG tool
    #[must_use]
    pub fn registry(&self) -> Arc<FormatRegistry> {
        match self.tool.backend {
            Backend::Native => FormatRegistry::global(),
            Backend::Exiftool => Arc::new(FormatRegistry::with_png_tool(self.tool.png_tool())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_is_default() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.vocabulary, Vocabulary::V2);
        assert_eq!(config.wipe, WipeMode::Recognized);
        assert_eq!(config.tool.backend, Backend::Native);
        assert_eq!(config.tool.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn full_document() {
        let config = EngineConfig::from_toml_str(
            r#"
            vocabulary = 1
            wipe = "all"

            [tool]
            backend = "exiftool"
            program = "/opt/exiftool"
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(
            config,
            EngineConfig::new()
                .with_vocabulary(Vocabulary::V1)
                .with_wipe(WipeMode::All)
                .with_tool(ToolConfig {
                    backend: Backend::Exiftool,
                    program: PathBuf::from("/opt/exiftool"),
                    timeout_secs: 5,
                })
        );
        assert_eq!(config.tool.png_tool().name(), "exiftool");
    }

    #[test]
    fn rejects_unknown_version_and_keys() {
        assert!(matches!(
            EngineConfig::from_toml_str("vocabulary = 7"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("colour = \"blue\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = EngineConfig::from_toml_str("[tool]\ntimeout_secs = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "tool.timeout_secs", .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("provstamp.toml");
        fs::write(&path, "wipe = \"none\"\n").unwrap();

        assert_eq!(EngineConfig::load(&path).unwrap().wipe, WipeMode::None);
        assert!(matches!(
            EngineConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
