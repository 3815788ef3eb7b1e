//! Sweep integrity checks: which model/environment/method runs exist, whether
//! their score CSVs have the expected length, and whether folder names agree
//! with the slot they were found in.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, EnvironmentSpec, ModelSpec, Regime};
use crate::obs;
use crate::resolver::{resolve_env_folder, resolve_method_folder};
use crate::scores::count_lines;
use crate::table::BuildSettings;

/// A folder name that disagrees with where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsistencyIssue {
    /// None of the model's name variants appear in the folder name.
    ModelMismatch { expected: Vec<String> },
    /// The environment short name does not appear in the folder name.
    EnvironmentMismatch { expected: String },
    /// Implicit run folder without `hidden` in its name.
    MissingHiddenMarker,
    /// Explicit run folder with `hidden` in its name.
    UnexpectedHiddenMarker,
}

impl fmt::Display for ConsistencyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelMismatch { expected } => {
                write!(f, "model mismatch: expected one of [{}]", expected.join(", "))
            }
            Self::EnvironmentMismatch { expected } => {
                write!(f, "environment mismatch: expected '{expected}'")
            }
            Self::MissingHiddenMarker => f.write_str("implicit environment but name lacks 'hidden'"),
            Self::UnexpectedHiddenMarker => {
                f.write_str("explicit environment but name contains 'hidden'")
            }
        }
    }
}

fn name_issues(folder_name: &str, model: &ModelSpec, env: &EnvironmentSpec) -> Vec<ConsistencyIssue> {
    let mut issues = Vec::new();
    if !model.matches_folder_name(folder_name) {
        issues.push(ConsistencyIssue::ModelMismatch {
            expected: model.name_variants.clone(),
        });
    }
    if !folder_name
        .to_lowercase()
        .contains(&env.short_name.to_lowercase())
    {
        issues.push(ConsistencyIssue::EnvironmentMismatch {
            expected: env.short_name.clone(),
        });
    }
    issues
}

/// Consistency issues of an environment folder name.
pub fn check_env_folder_name(
    folder_name: &str,
    model: &ModelSpec,
    env: &EnvironmentSpec,
) -> Vec<ConsistencyIssue> {
    name_issues(folder_name, model, env)
}

/// Consistency issues of a method folder name, including the hidden marker
/// that separates implicit from explicit runs.
pub fn check_method_folder_name(
    folder_name: &str,
    model: &ModelSpec,
    env: &EnvironmentSpec,
) -> Vec<ConsistencyIssue> {
    let mut issues = name_issues(folder_name, model, env);
    let hidden = folder_name.to_lowercase().contains("hidden");
    match (env.regime, hidden) {
        (Regime::Implicit, false) => issues.push(ConsistencyIssue::MissingHiddenMarker),
        (Regime::Explicit, true) => issues.push(ConsistencyIssue::UnexpectedHiddenMarker),
        _ => {}
    }
    issues
}

// ---------------------------------------------------------------------------
// Check results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodCheck {
    pub method: String,
    /// `None` when no method folder was found.
    pub folder_name: Option<String>,
    pub csv_exists: bool,
    /// Physical line count of the score CSV, header included.
    pub csv_lines: Option<usize>,
    pub expected_lines: usize,
    pub issues: Vec<ConsistencyIssue>,
}

impl MethodCheck {
    pub fn exists(&self) -> bool {
        self.folder_name.is_some()
    }

    pub fn csv_ok(&self) -> bool {
        self.csv_lines == Some(self.expected_lines)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentCheck {
    pub identifier: String,
    pub folder_name: Option<String>,
    pub methods: Vec<MethodCheck>,
    pub issues: Vec<ConsistencyIssue>,
}

impl EnvironmentCheck {
    pub fn exists(&self) -> bool {
        self.folder_name.is_some()
    }

    pub fn method_count(&self) -> usize {
        self.methods.iter().filter(|m| m.exists()).count()
    }

    pub fn missing_methods(&self) -> Vec<&str> {
        self.methods
            .iter()
            .filter(|m| !m.exists())
            .map(|m| m.method.as_str())
            .collect()
    }

    /// Found methods whose CSV is missing or has the wrong length.
    pub fn csv_problems(&self) -> Vec<&MethodCheck> {
        self.methods
            .iter()
            .filter(|m| m.exists() && !m.csv_ok())
            .collect()
    }

    /// Issues on the environment folder plus all of its method folders.
    pub fn consistency_issue_count(&self) -> usize {
        self.issues.len() + self.methods.iter().map(|m| m.issues.len()).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCheck {
    pub folder_key: String,
    pub exists: bool,
    pub environments: Vec<EnvironmentCheck>,
}

impl ModelCheck {
    pub fn env_count(&self) -> usize {
        self.environments.iter().filter(|e| e.exists()).count()
    }

    pub fn consistency_issue_count(&self) -> usize {
        self.environments
            .iter()
            .filter(|e| e.exists())
            .map(EnvironmentCheck::consistency_issue_count)
            .sum()
    }

    /// Distinct completeness problems, in first-seen order.
    pub fn completeness_problems(&self, expected_methods: usize) -> Vec<String> {
        let mut problems: Vec<String> = Vec::new();
        let mut push = |p: String| {
            if !problems.contains(&p) {
                problems.push(p);
            }
        };
        let missing_envs = self.environments.len() - self.env_count();
        if missing_envs > 0 {
            push(format!("missing {missing_envs} environment(s)"));
        }
        for env in self.environments.iter().filter(|e| e.exists()) {
            if env.method_count() < expected_methods {
                push(format!("{} missing methods", env.identifier));
            }
            if !env.csv_problems().is_empty() {
                push("CSV line count errors".to_string());
            }
        }
        problems
    }
}

/// Totals over a whole integrity run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegritySummary {
    pub models_present: usize,
    pub models_total: usize,
    pub environments_present: usize,
    pub environments_total: usize,
    pub methods_present: usize,
    pub methods_total: usize,
    pub csv_ok: usize,
    pub csv_checked: usize,
    pub consistency_issues: usize,
}

impl IntegritySummary {
    /// Percentage of checked CSVs with the right length; `None` if none were
    /// checked.
    pub fn csv_ok_percent(&self) -> Option<f64> {
        if self.csv_checked == 0 {
            None
        } else {
            Some(100.0 * self.csv_ok as f64 / self.csv_checked as f64)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub base_dir: PathBuf,
    pub models: Vec<ModelCheck>,
    pub expected_environments: usize,
    pub expected_methods: usize,
}

impl IntegrityReport {
    pub fn summary(&self) -> IntegritySummary {
        let mut summary = IntegritySummary {
            models_present: 0,
            models_total: self.models.len(),
            environments_present: 0,
            environments_total: self.models.len() * self.expected_environments,
            methods_present: 0,
            methods_total: self.models.len() * self.expected_environments * self.expected_methods,
            csv_ok: 0,
            csv_checked: 0,
            consistency_issues: 0,
        };
        for model in self.models.iter().filter(|m| m.exists) {
            summary.models_present += 1;
            summary.consistency_issues += model.consistency_issue_count();
            for env in model.environments.iter().filter(|e| e.exists()) {
                summary.environments_present += 1;
                for method in env.methods.iter().filter(|m| m.exists()) {
                    summary.methods_present += 1;
                    summary.csv_checked += 1;
                    if method.csv_ok() {
                        summary.csv_ok += 1;
                    }
                }
            }
        }
        summary
    }

    /// True when nothing is missing, short, or misnamed.
    pub fn is_clean(&self) -> bool {
        let s = self.summary();
        s.models_present == s.models_total
            && s.methods_present == s.methods_total
            && s.csv_ok == s.csv_checked
            && s.consistency_issues == 0
    }
}

// ---------------------------------------------------------------------------
// Checker
// ---------------------------------------------------------------------------

/// Walks the catalog against a base directory laid out like the one
/// [`crate::TableBuilder`] reads.
pub struct IntegrityChecker<'a> {
    catalog: &'a Catalog,
    settings: BuildSettings,
}

impl<'a> IntegrityChecker<'a> {
    pub fn new(catalog: &'a Catalog, settings: BuildSettings) -> Self {
        Self { catalog, settings }
    }

    /// Expected physical line count of a complete score CSV for `regime`:
    /// one header plus `chunk_size` rows per tier.
    pub fn expected_lines(&self, regime: Regime) -> usize {
        self.catalog.tiers.for_regime(regime) * self.settings.chunk.chunk_size + 1
    }

    pub fn check(&self, base_dir: &Path) -> IntegrityReport {
        let models = self
            .catalog
            .models
            .iter()
            .map(|model| self.check_model(base_dir, model))
            .collect();
        IntegrityReport {
            base_dir: base_dir.to_path_buf(),
            models,
            expected_environments: self.catalog.environments.len(),
            expected_methods: self.catalog.methods.len(),
        }
    }

    pub fn check_model(&self, base_dir: &Path, model: &ModelSpec) -> ModelCheck {
        let _span = obs::ScanSpan::enter(&model.folder_key);
        let model_dir = base_dir.join(&model.folder_key);
        if !model_dir.is_dir() {
            obs::emit_folder_missing("model", base_dir, &model.folder_key);
            return ModelCheck {
                folder_key: model.folder_key.clone(),
                exists: false,
                environments: Vec::new(),
            };
        }

        let environments = self
            .catalog
            .environments
            .iter()
            .map(|env| self.check_environment(&model_dir, model, env))
            .collect();
        ModelCheck {
            folder_key: model.folder_key.clone(),
            exists: true,
            environments,
        }
    }

    fn check_environment(
        &self,
        model_dir: &Path,
        model: &ModelSpec,
        env: &EnvironmentSpec,
    ) -> EnvironmentCheck {
        let resolution = resolve_env_folder(model_dir, &model.canonical_prefix, env);
        let Some(env_folder) = resolution.path() else {
            return EnvironmentCheck {
                identifier: env.identifier.clone(),
                folder_name: None,
                methods: Vec::new(),
                issues: Vec::new(),
            };
        };
        let folder_name = resolution.folder_name();
        let issues = folder_name
            .as_deref()
            .map(|name| check_env_folder_name(name, model, env))
            .unwrap_or_default();

        let expected_lines = self.expected_lines(env.regime);
        let methods = self
            .catalog
            .methods
            .iter()
            .map(|method| {
                let found = resolve_method_folder(env_folder, model, env, method);
                let folder_name = found.folder_name();
                let csv_lines = found
                    .path()
                    .and_then(|p| count_lines(&p.join(&self.settings.summary_file)));
                let issues = folder_name
                    .as_deref()
                    .map(|name| check_method_folder_name(name, model, env))
                    .unwrap_or_default();
                MethodCheck {
                    method: method.clone(),
                    folder_name,
                    csv_exists: csv_lines.is_some(),
                    csv_lines,
                    expected_lines,
                    issues,
                }
            })
            .collect();

        EnvironmentCheck {
            identifier: env.identifier.clone(),
            folder_name,
            methods,
            issues,
        }
    }
}
