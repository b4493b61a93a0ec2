// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, WatermarkError};
use crate::logging::LoggingConfig;
use crate::pipeline::PipelineConfig;
use crate::video::EncoderConfig;
use crate::watermark::{FontConfig, WatermarkConfig};

/// Top-level configuration file.
///
/// Every section is optional and falls back to its defaults.
///
/// ```yaml
/// watermark:
///   text: "${TILEMARK_TEXT}"
///   angle: 30
/// font:
///   path: /opt/fonts/MiSans-Medium.ttf
/// pipeline:
///   workers: 8
/// encoder:
///   video_codec: libx264
///   output_args: ["-crf", "20"]
/// logging:
///   level: debug
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub watermark: WatermarkConfig,
    #[serde(default)]
    pub font: FontConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse YAML, replacing `${VAR_NAME}` with environment variable values.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .map_err(|e| WatermarkError::configuration(e.to_string()))?;

        // Check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                WatermarkError::configuration(format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                ))
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        serde_yaml::from_str(&substituted).map_err(|e| {
            WatermarkError::configuration(format!("Failed to parse config: {}", e))
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            WatermarkError::configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        self.watermark.validate()?;
        self.encoder.validate()?;

        if let Some(path) = &self.font.path {
            if path.as_os_str().is_empty() {
                return Err(WatermarkError::configuration("font path cannot be empty"));
            }
        }
        if self.font.path.is_none() && self.font.file_name.trim().is_empty() {
            return Err(WatermarkError::configuration(
                "font file_name cannot be empty when no path is set",
            ));
        }

        self.logging.env_filter()?;
        Ok(())
    }
}
