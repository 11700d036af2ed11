use std::path::Path;

use serde::{Deserialize, Serialize};

use docdelta_graphs::{DepthBounds, MAX_DEPTH, MIN_DEPTH, ModificationPolicy};

use crate::error::ConfigError;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "docdelta.toml";

/// Which diff sets seed propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SeedScope {
    /// Added, modified, and removed components.
    #[default]
    All,
    /// Added and modified components only.
    Changed,
}

impl SeedScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Changed => "changed",
        }
    }
}

impl std::str::FromStr for SeedScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "changed" => Ok(Self::Changed),
            other => Err(format!("unknown seed scope {other:?} (expected all or changed)")),
        }
    }
}

/// Top-level docdelta configuration, matching `docdelta.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeltaConfig {
    #[serde(default)]
    pub propagation: PropagationSection,
    #[serde(default)]
    pub diff: DiffSection,
    #[serde(default)]
    pub layout: LayoutSection,
    #[serde(default)]
    pub loader: LoaderSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationSection {
    pub depth: u32,
    pub min_depth: u32,
    pub max_depth: u32,
    pub seed: SeedScope,
}

impl Default for PropagationSection {
    fn default() -> Self {
        Self {
            depth: 2,
            min_depth: MIN_DEPTH,
            max_depth: MAX_DEPTH,
            seed: SeedScope::All,
        }
    }
}

impl PropagationSection {
    pub fn bounds(&self) -> Result<DepthBounds, ConfigError> {
        DepthBounds::new(self.min_depth, self.max_depth)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffSection {
    pub policy: ModificationPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSection {
    /// Graph file name inside a snapshot directory.
    pub graph_file: String,
    /// Module tree file name inside the new snapshot directory.
    pub module_tree_file: String,
}

impl Default for LayoutSection {
    fn default() -> Self {
        Self {
            graph_file: "dependency_graph.json".into(),
            module_tree_file: "module_tree.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSection {
    /// Inputs larger than this are loaded anyway, with a warning.
    pub large_file_warning_mb: u64,
}

impl Default for LoaderSection {
    fn default() -> Self {
        Self {
            large_file_warning_mb: 100,
        }
    }
}

impl DeltaConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Load `docdelta.toml` from `dir` if present, otherwise defaults.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject bounds that cannot hold and a default depth outside them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bounds = self.propagation.bounds()?;
        bounds
            .check(self.propagation.depth)
            .map_err(|e| ConfigError::Invalid(format!("propagation.{e}")))?;
        if self.layout.graph_file.is_empty() || self.layout.module_tree_file.is_empty() {
            return Err(ConfigError::Invalid(
                "layout file names must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn large_file_threshold_bytes(&self) -> u64 {
        self.loader.large_file_warning_mb.saturating_mul(1024 * 1024)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
