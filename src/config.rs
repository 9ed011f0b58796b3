//! # Configuration
//!
//! Run configuration for the bootstrap sequencer.
//!
//! The original installer communicated between steps through exported shell
//! variables; here everything a step needs lives in [`BootstrapConfig`],
//! built once from the CLI and passed down explicitly. Per-environment
//! settings come from a YAML values file (`values-<environment>.yaml`) in the
//! environments directory.

use crate::constants::VAULT_PATH_PREFIX_FIELD;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Everything the bootstrap sequencer needs for one run.
///
/// Immutable for the run's duration.
pub struct BootstrapConfig {
    /// Environment name selecting the values overlay (e.g. "minikube")
    pub environment: String,
    /// Vault path the AppRole role id is read from
    pub role_id_path: String,
    /// AppRole secret id, injected verbatim into the credential secret
    pub secret_id: Zeroizing<String>,
    /// Vault endpoint
    pub vault_addr: String,
    /// Directory holding `values-<environment>.yaml` files
    pub environments_dir: PathBuf,
    /// Directory holding the operator and GitOps controller charts
    pub charts_dir: PathBuf,
    /// Whether to declare and sync the top-level application after install
    pub sync_app: bool,
}

impl std::fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("environment", &self.environment)
            .field("role_id_path", &self.role_id_path)
            .field("secret_id", &"<redacted>")
            .field("vault_addr", &self.vault_addr)
            .field("environments_dir", &self.environments_dir)
            .field("charts_dir", &self.charts_dir)
            .field("sync_app", &self.sync_app)
            .finish()
    }
}

impl BootstrapConfig {
    /// Path of the per-environment values file
    pub fn values_file(&self) -> PathBuf {
        self.environments_dir
            .join(format!("values-{}.yaml", self.environment))
    }

    /// Directory of a chart by release name
    pub fn chart_dir(&self, release: &str) -> PathBuf {
        self.charts_dir.join(release)
    }
}

/// Typed view of the per-environment values file.
///
/// Only the fields the bootstrapper consumes are modeled; charts read the
/// rest of the file themselves.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentValues {
    /// Prefix namespacing all of this environment's Vault secret lookups
    pub vault_path_prefix: String,
}

/// Load and parse the per-environment values file.
pub fn load_environment_values(path: &Path) -> Result<EnvironmentValues> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read environment values file: {}", path.display()))?;

    let values: EnvironmentValues = serde_yaml::from_str(&raw).with_context(|| {
        format!(
            "Failed to parse environment values file ({VAULT_PATH_PREFIX_FIELD} missing?): {}",
            path.display()
        )
    })?;

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_values(dir: &Path, environment: &str, contents: &str) -> PathBuf {
        let path = dir.join(format!("values-{environment}.yaml"));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_resolves_vault_path_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_values(
            dir.path(),
            "minikube",
            "vaultPathPrefix: secret/minikube\nrepoUrl: https://example.com/repo\n",
        );

        let values = load_environment_values(&path).unwrap();
        assert_eq!(values.vault_path_prefix, "secret/minikube");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_environment_values(&dir.path().join("values-absent.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_prefix_field_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_values(dir.path(), "minikube", "someOtherField: true\n");
        assert!(load_environment_values(&path).is_err());
    }

    #[test]
    fn test_values_file_path_shape() {
        let config = BootstrapConfig {
            environment: "production".to_string(),
            role_id_path: "auth/approle/role/operator/role-id".to_string(),
            secret_id: Zeroizing::new("s".to_string()),
            vault_addr: "https://vault.example.com".to_string(),
            environments_dir: PathBuf::from("environments"),
            charts_dir: PathBuf::from("charts"),
            sync_app: false,
        };

        assert_eq!(
            config.values_file(),
            PathBuf::from("environments/values-production.yaml")
        );
        assert_eq!(config.chart_dir("argocd"), PathBuf::from("charts/argocd"));
    }

    #[test]
    fn test_debug_redacts_secret_id() {
        let config = BootstrapConfig {
            environment: "minikube".to_string(),
            role_id_path: "auth/approle/role/operator/role-id".to_string(),
            secret_id: Zeroizing::new("super-secret".to_string()),
            vault_addr: "https://vault.example.com".to_string(),
            environments_dir: PathBuf::from("environments"),
            charts_dir: PathBuf::from("charts"),
            sync_app: false,
        };

        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
