//! Policy name configuration.
//!
//! The audit is driven entirely by configured names so the same policy can be
//! applied to differently-named codebases: the sensitive operation, the two
//! predicate callees, and the scalar/aggregate versioned-state roots. The
//! defaults match the classic firmware-update fixture.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The configured policy names consumed by the classifier and evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyNames {
    /// Callee whose execution is the irreversible, security-relevant effect.
    pub sensitive_call: String,
    /// Predicate whose call counts as a signature verification.
    pub signature_predicate: String,
    /// Predicate whose call counts as an origin/trust validation.
    pub source_predicate: String,
    /// Scalar global holding the currently-running version.
    pub version_global: String,
    /// Aggregate state record carrying the version field.
    pub version_aggregate: String,
    /// Field name of the version inside the aggregate.
    pub version_field: String,
}

impl Default for PolicyNames {
    fn default() -> Self {
        Self {
            sensitive_call: "install".to_string(),
            signature_predicate: "verifySignature".to_string(),
            source_predicate: "sourceTrusted".to_string(),
            version_global: "current_version".to_string(),
            version_aggregate: "device_config".to_string(),
            version_field: "version".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateGuardConfig {
    #[serde(default)]
    pub policy: PolicyNames,
}

pub const DEFAULT_CONFIG_FILE_NAME: &str = "update-guard.toml";

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut cur = Some(start_dir);
    while let Some(dir) = cur {
        let candidate = dir.join(DEFAULT_CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        cur = dir.parent();
    }
    None
}

pub fn load_config_file(path: &Path) -> Result<UpdateGuardConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let cfg: UpdateGuardConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(cfg)
}

pub fn load_config(
    explicit_path: Option<&Path>,
    start_dir: &Path,
) -> Result<Option<(PathBuf, UpdateGuardConfig)>> {
    if let Some(p) = explicit_path {
        let cfg = load_config_file(p)?;
        return Ok(Some((p.to_path_buf(), cfg)));
    }

    let Some(p) = find_config_file(start_dir) else {
        return Ok(None);
    };
    let cfg = load_config_file(&p)?;
    Ok(Some((p, cfg)))
}
