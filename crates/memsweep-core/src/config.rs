//! Run configuration.
//!
//! Loaded from an optional TOML file, then overridden by `MEMSWEEP_*`
//! environment variables; the CLI applies its own flags last.
//!
//! ```toml
//! base_dir = "/data/experiment_result"
//! output_dir = "/data/reports"
//! chunk_size = 20
//! min_samples = 20
//!
//! [catalog]
//! methods = ["vanilla_True_False", "vanilla_True_True"]
//! environments = [{ identifier = "frozenlake-explicit", label = "frozen lake" }]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::aggregate::{ChunkPolicy, ITEMS_PER_ENV, MIN_SAMPLES};
use crate::catalog::{Catalog, EnvironmentSpec, ModelAlias, ModelSpec, TierExpectations};
use crate::error::{Result, SweepError};
use crate::scores::ScoreTransform;
use crate::table::{BuildSettings, SUMMARY_FILE};

pub const ENV_BASE_DIR: &str = "MEMSWEEP_BASE_DIR";
pub const ENV_OUTPUT_DIR: &str = "MEMSWEEP_OUTPUT_DIR";

/// An environment entry in a catalog override. Short name and regime are
/// derived from the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentEntry {
    pub identifier: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl EnvironmentEntry {
    fn to_spec(&self) -> EnvironmentSpec {
        let spec = EnvironmentSpec::from_identifier(&self.identifier);
        match &self.label {
            Some(label) => spec.with_label(label),
            None => spec,
        }
    }
}

/// Replaces parts of the standard catalog. Absent fields keep the
/// standard value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogOverride {
    pub models: Option<Vec<ModelSpec>>,
    pub environments: Option<Vec<EnvironmentEntry>>,
    pub methods: Option<Vec<String>>,
    pub tiers: Option<TierExpectations>,
    pub model_fragments: Option<Vec<String>>,
    pub scan_aliases: Option<Vec<ModelAlias>>,
}

impl CatalogOverride {
    pub fn apply(&self, mut catalog: Catalog) -> Catalog {
        if let Some(models) = &self.models {
            catalog.models = models.clone();
        }
        if let Some(envs) = &self.environments {
            catalog.environments = envs.iter().map(EnvironmentEntry::to_spec).collect();
        }
        if let Some(methods) = &self.methods {
            catalog.methods = methods.clone();
        }
        if let Some(tiers) = self.tiers {
            catalog.tiers = tiers;
        }
        if let Some(fragments) = &self.model_fragments {
            catalog.model_fragments = fragments.clone();
        }
        if let Some(aliases) = &self.scan_aliases {
            catalog.scan_aliases = aliases.clone();
        }
        catalog
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Root of the experiment tree. Defaults to the working directory.
    pub base_dir: Option<PathBuf>,
    /// Where reports go. Defaults to `base_dir`.
    pub output_dir: Option<PathBuf>,
    pub chunk_size: usize,
    pub min_samples: usize,
    /// Score CSV path relative to a run folder.
    pub summary_file: PathBuf,
    pub catalog: Option<CatalogOverride>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            output_dir: None,
            chunk_size: ITEMS_PER_ENV,
            min_samples: MIN_SAMPLES,
            summary_file: PathBuf::from(SUMMARY_FILE),
            catalog: None,
        }
    }
}

impl SweepConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path` if given, else start from defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = fs::read_to_string(path)?;
                tracing::debug!(path = %path.display(), "loaded config file");
                Self::from_toml_str(&raw)
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply `MEMSWEEP_BASE_DIR` / `MEMSWEEP_OUTPUT_DIR` from the process
    /// environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(ENV_BASE_DIR).filter(|v| !v.is_empty()) {
            self.base_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.is_empty()) {
            self.output_dir = Some(PathBuf::from(dir));
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(SweepError::InvalidConfig("chunk_size must be positive".to_string()));
        }
        if self.min_samples == 0 {
            return Err(SweepError::InvalidConfig("min_samples must be positive".to_string()));
        }
        if self.summary_file.as_os_str().is_empty() {
            return Err(SweepError::InvalidConfig("summary_file must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn base_dir(&self) -> PathBuf {
        self.base_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| self.base_dir())
    }

    /// The standard catalog with any `[catalog]` overrides applied,
    /// validated.
    pub fn catalog(&self) -> Result<Catalog> {
        let catalog = match &self.catalog {
            Some(over) => over.apply(Catalog::standard()),
            None => Catalog::standard(),
        };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn build_settings(&self, transform: ScoreTransform) -> BuildSettings {
        BuildSettings {
            chunk: ChunkPolicy {
                chunk_size: self.chunk_size,
                min_samples: self.min_samples,
            },
            transform,
            summary_file: self.summary_file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Regime;

    #[test]
    fn test_empty_toml_is_default() {
        let config = SweepConfig::from_toml_str("").unwrap();
        assert_eq!(config, SweepConfig::default());
        assert_eq!(config.base_dir(), PathBuf::from("."));
        assert_eq!(config.output_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_output_dir_defaults_to_base_dir() {
        let config = SweepConfig::from_toml_str("base_dir = \"/data/sweep\"").unwrap();
        assert_eq!(config.output_dir(), PathBuf::from("/data/sweep"));
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let err = SweepConfig::from_toml_str("chunk_size = 0").unwrap_err();
        assert!(matches!(err, SweepError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = SweepConfig::from_toml_str("chunk_size = \"twenty\"").unwrap_err();
        assert!(matches!(err, SweepError::Config(_)));
    }

    #[test]
    fn test_catalog_override() {
        let raw = r#"
[catalog]
methods = ["vanilla_True_False"]
environments = [
    { identifier = "frozenlake-implicit", label = "frozen lake" },
    { identifier = "mountaincar" },
]

[catalog.tiers]
explicit = 4
implicit = 2
"#;
        let catalog = SweepConfig::from_toml_str(raw).unwrap().catalog().unwrap();
        assert_eq!(catalog.methods, vec!["vanilla_True_False"]);
        assert_eq!(catalog.environments.len(), 2);
        assert_eq!(catalog.environments[0].regime, Regime::Implicit);
        assert_eq!(catalog.environments[0].label(), "frozen lake");
        assert_eq!(catalog.environments[1].label(), "mountaincar");
        assert_eq!(catalog.tiers.explicit, 4);
        assert_eq!(catalog.models.len(), Catalog::standard().models.len());
    }

    #[test]
    fn test_catalog_override_validated() {
        let raw = "[catalog]\nmethods = [\"reflexion_True_False\"]\n";
        let err = SweepConfig::from_toml_str(raw).unwrap().catalog().unwrap_err();
        assert!(matches!(err, SweepError::InvalidCatalog(_)));
    }

    #[test]
    fn test_env_overrides() {
        let config = SweepConfig::default().with_overrides_from(|key| match key {
            ENV_BASE_DIR => Some("/srv/runs".to_string()),
            ENV_OUTPUT_DIR => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.base_dir(), PathBuf::from("/srv/runs"));
        assert_eq!(config.output_dir(), PathBuf::from("/srv/runs"));
    }

    #[test]
    fn test_build_settings() {
        let config = SweepConfig::from_toml_str("min_samples = 10").unwrap();
        let settings = config.build_settings(ScoreTransform::Ceiling);
        assert_eq!(settings.chunk.min_samples, 10);
        assert_eq!(settings.chunk.chunk_size, 20);
        assert_eq!(settings.transform, ScoreTransform::Ceiling);
    }
}
