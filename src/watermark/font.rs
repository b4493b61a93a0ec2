//! Font lookup and loading.
//!
//! The overlay generator never knows where fonts live on disk. It receives
//! a loaded font, and the path comes from a [`FontResolver`]:
//!
//! - [`FontPath`] - a fixed, explicitly configured file
//! - [`FontSearch`] - an ordered search over the `TILEMARK_FONT` environment
//!   variable, configured directories and well-known system font locations

use ab_glyph::FontVec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, WatermarkError};

/// Environment variable that overrides every configured font location.
pub const FONT_ENV_VAR: &str = "TILEMARK_FONT";

/// Common TrueType locations tried when nothing else is configured.
pub const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

fn default_file_name() -> String {
    "MiSans-Medium.ttf".to_string()
}

fn default_system_fallback() -> bool {
    true
}

/// Font section of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontConfig {
    /// Explicit font file. When set, no search is performed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// File name looked up in each of `search_dirs` (default: "MiSans-Medium.ttf")
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Directories searched in order for `file_name`
    #[serde(default)]
    pub search_dirs: Vec<PathBuf>,

    /// Fall back to well-known system fonts (default: true)
    #[serde(default = "default_system_fallback")]
    pub system_fallback: bool,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            path: None,
            file_name: default_file_name(),
            search_dirs: Vec::new(),
            system_fallback: default_system_fallback(),
        }
    }
}

impl FontConfig {
    /// Build the resolver described by this configuration.
    pub fn resolver(&self) -> Box<dyn FontResolver> {
        match &self.path {
            Some(path) => Box::new(FontPath::new(path)),
            None => Box::new(FontSearch {
                file_name: self.file_name.clone(),
                search_dirs: self.search_dirs.clone(),
                system_fallback: self.system_fallback,
            }),
        }
    }
}

/// Provides the path of a TrueType-compatible font asset.
pub trait FontResolver: Send + Sync {
    fn resolve(&self) -> Result<PathBuf>;
}

/// A single, explicitly configured font file.
#[derive(Debug, Clone)]
pub struct FontPath(PathBuf);

impl FontPath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }
}

impl FontResolver for FontPath {
    fn resolve(&self) -> Result<PathBuf> {
        if self.0.is_file() {
            Ok(self.0.clone())
        } else {
            Err(WatermarkError::configuration(format!(
                "Font file not found: {}",
                self.0.display()
            )))
        }
    }
}

/// Ordered font search: env var, configured directories, system fonts.
#[derive(Debug, Clone)]
pub struct FontSearch {
    pub file_name: String,
    pub search_dirs: Vec<PathBuf>,
    pub system_fallback: bool,
}

impl FontSearch {
    /// Search only the well-known system font locations.
    pub fn system() -> Self {
        Self {
            file_name: default_file_name(),
            search_dirs: Vec::new(),
            system_fallback: true,
        }
    }

    fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(from_env) = std::env::var_os(FONT_ENV_VAR) {
            candidates.push(PathBuf::from(from_env));
        }

        candidates.extend(self.search_dirs.iter().map(|dir| dir.join(&self.file_name)));

        if self.system_fallback {
            candidates.extend(SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from));
        }

        candidates
    }
}

impl FontResolver for FontSearch {
    fn resolve(&self) -> Result<PathBuf> {
        let candidates = self.candidates();

        for candidate in &candidates {
            if candidate.is_file() {
                debug!(font = %candidate.display(), "Resolved watermark font");
                return Ok(candidate.clone());
            }
        }

        let searched: Vec<String> = candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        Err(WatermarkError::configuration(format!(
            "No font found for '{}' (searched: {})",
            self.file_name,
            if searched.is_empty() {
                "nothing".to_string()
            } else {
                searched.join(", ")
            }
        )))
    }
}

/// Read and parse a font file.
pub fn load_font(path: &Path) -> Result<FontVec> {
    let data = std::fs::read(path).map_err(|e| {
        WatermarkError::configuration(format!(
            "Failed to read font file {}: {}",
            path.display(),
            e
        ))
    })?;

    FontVec::try_from_vec(data).map_err(|e| {
        WatermarkError::configuration(format!(
            "Failed to parse font file {}: {}",
            path.display(),
            e
        ))
    })
}

/// Resolve and load in one step.
pub fn load_resolved_font(resolver: &dyn FontResolver) -> Result<FontVec> {
    let path = resolver.resolve()?;
    load_font(&path)
}
