//! Static experiment catalog: which models, environments and methods a sweep
//! is expected to contain, and how many scenario tiers each regime produces.
//!
//! The catalog is plain immutable data. Components take it by reference
//! rather than reading module-level tables, so tests can hand them synthetic
//! catalogs.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::descriptor::parse_structured;
use crate::error::{Result, SweepError};

// ---------------------------------------------------------------------------
// Regime
// ---------------------------------------------------------------------------

/// Whether the agent was given an explicit goal/hint during the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    Explicit,
    Implicit,
}

impl Regime {
    /// Both regimes in report order.
    pub const ALL: [Regime; 2] = [Regime::Explicit, Regime::Implicit];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Implicit => "implicit",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Regime {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "explicit" => Ok(Self::Explicit),
            "implicit" => Ok(Self::Implicit),
            other => Err(format!("unknown regime: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// One evaluated model and the names it appears under on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Top-level folder under the base directory. Identity of the model.
    pub folder_key: String,
    /// Prefix used in environment and log folder names.
    pub canonical_prefix: String,
    /// Every spelling of the model name seen in method folder names.
    pub name_variants: Vec<String>,
    /// Name shown in report headers.
    pub display_name: String,
}

impl ModelSpec {
    pub fn new(folder_key: &str, canonical_prefix: &str, variants: &[&str], display: &str) -> Self {
        Self {
            folder_key: folder_key.to_string(),
            canonical_prefix: canonical_prefix.to_string(),
            name_variants: variants.iter().map(|v| v.to_string()).collect(),
            display_name: display.to_string(),
        }
    }

    /// Whether `folder_name` contains any of the model's name variants,
    /// case-insensitively.
    pub fn matches_folder_name(&self, folder_name: &str) -> bool {
        let lower = folder_name.to_lowercase();
        self.name_variants
            .iter()
            .any(|variant| lower.contains(&variant.to_lowercase()))
    }

    /// Lookup keys for locating this model's folder inside a version bucket:
    /// the folder key first, then each variant, deduplicated in order.
    pub fn lookup_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for key in std::iter::once(self.folder_key.as_str())
            .chain(self.name_variants.iter().map(String::as_str))
        {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    /// Names to try in log folder templates: the canonical prefix, then each
    /// variant, deduplicated in order.
    pub fn log_name_candidates(&self) -> Vec<&str> {
        let mut names: Vec<&str> = vec![self.canonical_prefix.as_str()];
        for variant in &self.name_variants {
            if !names.contains(&variant.as_str()) {
                names.push(variant.as_str());
            }
        }
        names
    }
}

// ---------------------------------------------------------------------------
// Environments
// ---------------------------------------------------------------------------

/// One evaluated environment/regime combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    /// Identifier as it appears in environment folder names,
    /// e.g. `frozenlake-explicit`.
    pub identifier: String,
    /// Identifier with regime/version suffixes removed, e.g. `frozenlake`.
    pub short_name: String,
    pub regime: Regime,
    /// Column group header in CSV tables. Defaults to `short_name`.
    #[serde(default)]
    pub label: Option<String>,
}

impl EnvironmentSpec {
    /// Build a spec from its identifier, deriving short name and regime.
    pub fn from_identifier(identifier: &str) -> Self {
        let short_name = short_env_name(identifier);
        let regime = regime_of(identifier);
        Self {
            identifier: identifier.to_string(),
            short_name,
            regime,
            label: None,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.short_name)
    }
}

const REGIME_SUFFIXES: [&str; 2] = ["explicit", "implicit"];

fn is_version_token(token: &str) -> bool {
    matches!(token.chars().next(), Some('v') | Some('V'))
        && !token[1..].is_empty()
        && token[1..].chars().all(|c| c.is_ascii_digit())
}

/// Strip trailing regime and version tokens from an environment identifier.
///
/// `frozenlake-explicit`, `frozenlake_implicit` and `frozenlake-explicit-v2`
/// all reduce to `frozenlake`; identifiers without such suffixes are
/// returned unchanged.
pub fn short_env_name(identifier: &str) -> String {
    let mut short = identifier;
    loop {
        let Some(idx) = short.rfind(&['-', '_'][..]) else {
            break;
        };
        let tail = &short[idx + 1..];
        let lower = tail.to_ascii_lowercase();
        if REGIME_SUFFIXES.contains(&lower.as_str()) || is_version_token(tail) {
            short = &short[..idx];
        } else {
            break;
        }
    }
    short.to_string()
}

/// Regime of an environment identifier. `mountaincar` has no implicit
/// variant and is always explicit.
pub fn regime_of(identifier: &str) -> Regime {
    if short_env_name(identifier) == "mountaincar" {
        return Regime::Explicit;
    }
    if identifier.to_ascii_lowercase().contains("implicit") {
        Regime::Implicit
    } else {
        Regime::Explicit
    }
}

// ---------------------------------------------------------------------------
// Scan aliases
// ---------------------------------------------------------------------------

/// Folder-matching rule for the free-form directory scan.
///
/// A directory matches when its lower-cased name contains at least one of
/// `any_of` and every entry of `all_of`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelAlias {
    pub model: String,
    pub any_of: Vec<String>,
    #[serde(default)]
    pub all_of: Vec<String>,
}

impl ModelAlias {
    pub fn matches(&self, dir_name: &str) -> bool {
        let lower = dir_name.to_lowercase();
        self.any_of.iter().any(|s| lower.contains(s.as_str()))
            && self.all_of.iter().all(|s| lower.contains(s.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Number of scenario tiers each regime is expected to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierExpectations {
    pub explicit: usize,
    pub implicit: usize,
}

impl Default for TierExpectations {
    fn default() -> Self {
        Self {
            explicit: 3,
            implicit: 2,
        }
    }
}

impl TierExpectations {
    pub fn for_regime(&self, regime: Regime) -> usize {
        match regime {
            Regime::Explicit => self.explicit,
            Regime::Implicit => self.implicit,
        }
    }

    /// The widest tier count, i.e. the number of tier columns per
    /// environment group in a combined table.
    pub fn max(&self) -> usize {
        self.explicit.max(self.implicit)
    }
}

/// One environment column group in a rendered table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnGroup {
    pub short_name: String,
    pub label: String,
    pub has_explicit: bool,
    pub has_implicit: bool,
}

/// The full set of static tables a sweep is interpreted against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub models: Vec<ModelSpec>,
    pub environments: Vec<EnvironmentSpec>,
    /// Structured method tokens, e.g. `vanilla_True_False`.
    pub methods: Vec<String>,
    pub tiers: TierExpectations,
    /// Lower-case fragments identifying a model token inside free-form
    /// folder names.
    pub model_fragments: Vec<String>,
    /// Matching rules for the free-form directory scan.
    pub scan_aliases: Vec<ModelAlias>,
}

impl Catalog {
    /// The catalog of the agent-memory benchmark sweep.
    pub fn standard() -> Self {
        let models = vec![
            ModelSpec::new(
                "llama3.1_8b",
                "llama3.1_8b",
                &["llama3.1_8b", "llama3.1-8b"],
                "Llama3.1-8B",
            ),
            ModelSpec::new(
                "llama-3.3-70b-instruct",
                "llama-3.3-70b-instruct",
                &["llama-3.3-70b-instruct", "llama-3.3-70b"],
                "Llama3.3-70B",
            ),
            ModelSpec::new(
                "qwen2.5-7b",
                "qwen2.5-7b-instruct",
                &["qwen2.5-7b", "qwen2.5-7b-instruct"],
                "Qwen2.5-7B",
            ),
            ModelSpec::new(
                "qwen3-30b",
                "qwen3-30b-instruct",
                &["qwen3-30b", "qwen3-30b-instruct"],
                "Qwen3-30B",
            ),
            ModelSpec::new("gpt4o", "gpt4o", &["gpt4o", "gpt-4o"], "GPT-4o"),
            ModelSpec::new("grok-3", "grok-3", &["grok-3"], "Grok-3"),
            ModelSpec::new("deepseek-r1", "deepseek-r1", &["deepseek-r1"], "DeepSeek-R1"),
            ModelSpec::new(
                "deepseek-v3.2",
                "deepseek-v3.2",
                &["deepseek-v3.2"],
                "DeepSeek-V3.2",
            ),
        ];

        let environments = vec![
            EnvironmentSpec::from_identifier("webshop-explicit"),
            EnvironmentSpec::from_identifier("webshop-implicit"),
            EnvironmentSpec::from_identifier("frozenlake-explicit").with_label("frozen lake"),
            EnvironmentSpec::from_identifier("frozenlake-implicit").with_label("frozen lake"),
            EnvironmentSpec::from_identifier("mountaincar").with_label("mountain car"),
        ];

        let methods = [
            "generative_True_False",
            "generative_True_True",
            "memorybank_True_False",
            "memorybank_True_True",
            "vanilla_False_False",
            "vanilla_True_False",
            "vanilla_True_True",
            "voyager_True_False",
            "voyager_True_True",
        ]
        .iter()
        .map(|m| m.to_string())
        .collect();

        let scan_aliases = vec![
            ModelAlias {
                model: "gpt-4o".to_string(),
                any_of: vec!["gpt4o".into(), "gpt40".into(), "gpt-4o".into()],
                all_of: vec![],
            },
            ModelAlias {
                model: "llama3.1-8b".to_string(),
                any_of: vec!["llama3.1".into(), "llama31".into()],
                all_of: vec!["8b".into()],
            },
        ];

        Self {
            models,
            environments,
            methods,
            tiers: TierExpectations::default(),
            model_fragments: vec!["gpt".to_string(), "llama".to_string()],
            scan_aliases,
        }
    }

    /// Reject catalogs the pipeline cannot interpret.
    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(SweepError::InvalidCatalog("no models".to_string()));
        }
        if self.environments.is_empty() {
            return Err(SweepError::InvalidCatalog("no environments".to_string()));
        }
        if self.tiers.explicit == 0 || self.tiers.implicit == 0 {
            return Err(SweepError::InvalidCatalog(
                "tier counts must be positive".to_string(),
            ));
        }

        let mut keys = HashSet::new();
        for model in &self.models {
            if !keys.insert(model.folder_key.as_str()) {
                return Err(SweepError::InvalidCatalog(format!(
                    "duplicate model folder key: {}",
                    model.folder_key
                )));
            }
        }

        for method in &self.methods {
            parse_structured(method).map_err(|e| {
                SweepError::InvalidCatalog(format!("method {method:?}: {e}"))
            })?;
        }
        Ok(())
    }

    pub fn model(&self, folder_key: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|m| m.folder_key == folder_key)
    }

    /// Scan alias for `model_name`, if one is configured.
    pub fn scan_alias(&self, model_name: &str) -> Option<&ModelAlias> {
        self.scan_aliases.iter().find(|a| a.model == model_name)
    }

    /// Environment column groups in first-appearance order of their short
    /// names.
    pub fn column_groups(&self) -> Vec<ColumnGroup> {
        let mut groups: Vec<ColumnGroup> = Vec::new();
        for env in &self.environments {
            let idx = match groups.iter().position(|g| g.short_name == env.short_name) {
                Some(idx) => idx,
                None => {
                    groups.push(ColumnGroup {
                        short_name: env.short_name.clone(),
                        label: env.label().to_string(),
                        has_explicit: false,
                        has_implicit: false,
                    });
                    groups.len() - 1
                }
            };
            let group = &mut groups[idx];
            match env.regime {
                Regime::Explicit => group.has_explicit = true,
                Regime::Implicit => group.has_implicit = true,
            }
        }
        groups
    }

    /// Column groups that have an environment in `regime`.
    pub fn column_groups_for(&self, regime: Regime) -> Vec<ColumnGroup> {
        self.column_groups()
            .into_iter()
            .filter(|g| match regime {
                Regime::Explicit => g.has_explicit,
                Regime::Implicit => g.has_implicit,
            })
            .collect()
    }

    /// Short environment names known to the catalog, in column order.
    pub fn short_names(&self) -> Vec<String> {
        self.column_groups()
            .into_iter()
            .map(|g| g.short_name)
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_env_name_strips_regime() {
        assert_eq!(short_env_name("frozenlake-explicit"), "frozenlake");
        assert_eq!(short_env_name("frozenlake-implicit"), "frozenlake");
        assert_eq!(short_env_name("webshop_implicit"), "webshop");
        assert_eq!(short_env_name("mountaincar"), "mountaincar");
    }

    #[test]
    fn test_short_env_name_strips_version() {
        assert_eq!(short_env_name("frozenlake-explicit-v2"), "frozenlake");
        assert_eq!(short_env_name("frozenlake-v10"), "frozenlake");
        assert_eq!(short_env_name("webshop-vx"), "webshop-vx");
    }

    #[test]
    fn test_regime_of() {
        assert_eq!(regime_of("webshop-implicit"), Regime::Implicit);
        assert_eq!(regime_of("webshop-explicit"), Regime::Explicit);
        assert_eq!(regime_of("mountaincar"), Regime::Explicit);
        assert_eq!(regime_of("mountaincar-implicit"), Regime::Explicit);
    }

    #[test]
    fn test_standard_catalog_is_valid() {
        let catalog = Catalog::standard();
        catalog.validate().expect("standard catalog valid");
        assert_eq!(catalog.models.len(), 8);
        assert_eq!(catalog.methods.len(), 9);
    }

    #[test]
    fn test_column_groups_order_and_labels() {
        let groups = Catalog::standard().column_groups();
        let names: Vec<&str> = groups.iter().map(|g| g.short_name.as_str()).collect();
        assert_eq!(names, vec!["webshop", "frozenlake", "mountaincar"]);
        assert_eq!(groups[1].label, "frozen lake");
        assert!(groups[1].has_implicit);
        assert!(!groups[2].has_implicit);
    }

    #[test]
    fn test_validate_rejects_duplicate_models() {
        let mut catalog = Catalog::standard();
        let dup = catalog.models[0].clone();
        catalog.models.push(dup);
        let err = catalog.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate model"));
    }

    #[test]
    fn test_validate_rejects_bad_method_token() {
        let mut catalog = Catalog::standard();
        catalog.methods.push("reflexion_True_False".to_string());
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_model_alias_requires_all_of() {
        let alias = Catalog::standard()
            .scan_alias("llama3.1-8b")
            .cloned()
            .expect("alias");
        assert!(alias.matches("Llama3.1_8B-frozenlake"));
        assert!(!alias.matches("llama3.1_70b-frozenlake"));
    }

    #[test]
    fn test_lookup_keys_dedup() {
        let model = ModelSpec::new("gpt4o", "gpt4o", &["gpt4o", "gpt-4o"], "GPT-4o");
        assert_eq!(model.lookup_keys(), vec!["gpt4o", "gpt-4o"]);
        assert_eq!(model.log_name_candidates(), vec!["gpt4o", "gpt-4o"]);
    }
}
