//! Naming resolver: locates result folders on disk.
//!
//! The experiment harness changed its folder naming several times, so every
//! lookup runs an ordered list of strategies and stops at the first hit:
//! exact name templates first, then a substring scan over the parent's
//! immediate child directories. Each hit is tagged with the strategy that
//! produced it. Absence is an ordinary [`Resolution::NotFound`], never an
//! error.
//!
//! Substring scans iterate children in lexicographic order of their file
//! names, so ties resolve the same way on every filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::catalog::{EnvironmentSpec, ModelSpec, Regime};
use crate::obs;

/// How a folder was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolveStrategy {
    /// An exact candidate name existed.
    Template { name: String },
    /// The first child (lexicographically) containing `token`.
    SubstringScan { token: String },
}

/// Outcome of a folder lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found {
        path: PathBuf,
        strategy: ResolveStrategy,
    },
    NotFound,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Found { path, .. } => Some(path),
            Self::NotFound => None,
        }
    }

    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Self::Found { path, .. } => Some(path),
            Self::NotFound => None,
        }
    }

    pub fn strategy(&self) -> Option<&ResolveStrategy> {
        match self {
            Self::Found { strategy, .. } => Some(strategy),
            Self::NotFound => None,
        }
    }

    /// Run `next` only when this lookup found nothing.
    pub fn or_else(self, next: impl FnOnce() -> Resolution) -> Resolution {
        match self {
            Self::NotFound => next(),
            found => found,
        }
    }

    /// Final path component of the resolved folder.
    pub fn folder_name(&self) -> Option<String> {
        self.path()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
    }
}

// ---------------------------------------------------------------------------
// Strategy primitives
// ---------------------------------------------------------------------------

/// First candidate name that exists as a directory under `parent`.
pub fn try_templates<S: AsRef<str>>(parent: &Path, candidates: &[S]) -> Resolution {
    for name in candidates {
        let path = parent.join(name.as_ref());
        if path.is_dir() {
            return Resolution::Found {
                path,
                strategy: ResolveStrategy::Template {
                    name: name.as_ref().to_string(),
                },
            };
        }
    }
    Resolution::NotFound
}

/// Immediate child directories of `parent`, sorted by file name.
/// An unreadable or missing parent yields an empty list.
pub fn sorted_child_dirs(parent: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(parent) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(parent = %parent.display(), error = %e, "cannot list directory");
            return Vec::new();
        }
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    dirs
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// First child directory of `parent` whose name contains `token` and passes
/// `accept`.
pub fn scan_for_substring(
    parent: &Path,
    token: &str,
    accept: impl Fn(&str) -> bool,
) -> Resolution {
    sorted_child_dirs(parent)
        .into_iter()
        .find(|path| {
            let name = dir_name(path);
            name.contains(token) && accept(&name)
        })
        .map(|path| Resolution::Found {
            path,
            strategy: ResolveStrategy::SubstringScan {
                token: token.to_string(),
            },
        })
        .unwrap_or(Resolution::NotFound)
}

// ---------------------------------------------------------------------------
// Environment folders
// ---------------------------------------------------------------------------

/// Exact candidate names for an environment folder, in try order.
pub fn env_folder_templates(prefix: &str, env: &EnvironmentSpec) -> Vec<String> {
    let id = &env.identifier;
    let mut names = vec![format!("{prefix}-{id}"), format!("{prefix}_{id}")];
    let underscored = format!("{prefix}_{}", id.replace('-', "_"));
    if !names.contains(&underscored) {
        names.push(underscored);
    }
    names
}

/// Locate the folder holding `env`'s runs inside `model_dir`.
///
/// Strategies, in order:
/// 1. templates from [`env_folder_templates`];
/// 2. first child containing the full identifier;
/// 3. explicit environments only: first child containing the short name and
///    not naming the implicit regime. Regime-less legacy folders hold
///    explicit runs, so implicit environments never fall back this far.
pub fn resolve_env_folder(model_dir: &Path, prefix: &str, env: &EnvironmentSpec) -> Resolution {
    let resolution = try_templates(model_dir, &env_folder_templates(prefix, env))
        .or_else(|| scan_for_substring(model_dir, &env.identifier, |_| true))
        .or_else(|| match env.regime {
            Regime::Explicit => scan_for_substring(model_dir, &env.short_name, |name| {
                !name.to_lowercase().contains(Regime::Implicit.as_str())
            }),
            Regime::Implicit => Resolution::NotFound,
        });
    if !resolution.is_found() {
        obs::emit_folder_missing("environment", model_dir, &env.identifier);
    }
    resolution
}

// ---------------------------------------------------------------------------
// Method folders
// ---------------------------------------------------------------------------

/// Log folder name for a method run: `log_{env_short}_{model}_{method}`, or
/// `log_hidden_...` for implicit environments.
pub fn log_folder_name(env: &EnvironmentSpec, model_name: &str, method: &str) -> String {
    match env.regime {
        Regime::Implicit => format!("log_hidden_{}_{model_name}_{method}", env.short_name),
        Regime::Explicit => format!("log_{}_{model_name}_{method}", env.short_name),
    }
}

/// Locate a method's log folder inside an environment folder.
///
/// Strategies, in order:
/// 1. the log template with the canonical prefix, then with each name
///    variant;
/// 2. first child containing the method token.
pub fn resolve_method_folder(
    env_folder: &Path,
    model: &ModelSpec,
    env: &EnvironmentSpec,
    method: &str,
) -> Resolution {
    let templates: Vec<String> = model
        .log_name_candidates()
        .into_iter()
        .map(|name| log_folder_name(env, name, method))
        .collect();
    let resolution = try_templates(env_folder, &templates)
        .or_else(|| scan_for_substring(env_folder, method, |_| true));
    if !resolution.is_found() {
        obs::emit_folder_missing("method", env_folder, method);
    }
    resolution
}

// ---------------------------------------------------------------------------
// Version-bucketed trees
// ---------------------------------------------------------------------------

/// Locate a model folder inside a version bucket: for each lookup key in
/// order, the first child whose lower-cased name contains the lower-cased
/// key.
pub fn resolve_model_folder(version_dir: &Path, model: &ModelSpec) -> Resolution {
    let children = sorted_child_dirs(version_dir);
    for key in model.lookup_keys() {
        let wanted = key.to_lowercase();
        if let Some(path) = children
            .iter()
            .find(|path| dir_name(path).to_lowercase().contains(&wanted))
        {
            return Resolution::Found {
                path: path.clone(),
                strategy: ResolveStrategy::SubstringScan {
                    token: key.to_string(),
                },
            };
        }
    }
    obs::emit_folder_missing("model", version_dir, &model.folder_key);
    Resolution::NotFound
}

/// Locate a method's log folder directly under a model folder, trying
/// `log_{env_short}_{name}_{method}` for every model name candidate, then a
/// method substring scan.
pub fn resolve_log_folder(
    model_folder: &Path,
    env_short: &str,
    model: &ModelSpec,
    method: &str,
) -> Resolution {
    let templates: Vec<String> = model
        .log_name_candidates()
        .into_iter()
        .map(|name| format!("log_{env_short}_{name}_{method}"))
        .collect();
    let resolution = try_templates(model_folder, &templates)
        .or_else(|| scan_for_substring(model_folder, method, |_| true));
    if !resolution.is_found() {
        obs::emit_folder_missing("log", model_folder, method);
    }
    resolution
}
