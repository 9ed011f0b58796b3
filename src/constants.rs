//! # Constants
//!
//! Shared constants used throughout the bootstrapper.
//!
//! These values represent the fixed contract between the bootstrapper and the
//! cluster; the handful that operators legitimately need to vary (Vault
//! address, directory layout) are overridable via CLI flags.

/// Default Vault endpoint the installer authenticates against
pub const DEFAULT_VAULT_ADDR: &str = "https://vault.microscaler.io";

/// Namespace that hosts the secrets operator and its credential secret
pub const OPERATOR_NAMESPACE: &str = "vault-secrets-operator";

/// Name of the credential secret consumed by the secrets operator
pub const OPERATOR_SECRET_NAME: &str = "vault-secrets-operator";

/// Helm release name (and chart directory name) of the secrets operator
pub const OPERATOR_RELEASE: &str = "vault-secrets-operator";

/// Helm release name (and chart directory name) of the GitOps controller
pub const GITOPS_RELEASE: &str = "argocd";

/// Namespace the GitOps controller is installed into
pub const GITOPS_NAMESPACE: &str = "argocd";

/// Maximum TTL (seconds) for tokens the operator derives from its AppRole.
/// Baked into the credential secret; identical for every environment.
pub const VAULT_TOKEN_MAX_TTL_SECS: u64 = 600;

/// Upper bound on each Helm install-or-upgrade, including the readiness wait
pub const HELM_WAIT_TIMEOUT_SECS: u64 = 300;

/// Field manager identity for server-side apply of cluster objects
pub const FIELD_MANAGER: &str = "cluster-bootstrapper";

/// Credential secret key holding the AppRole role id
pub const SECRET_KEY_ROLE_ID: &str = "VAULT_ROLE_ID";

/// Credential secret key holding the AppRole secret id
pub const SECRET_KEY_SECRET_ID: &str = "VAULT_SECRET_ID";

/// Credential secret key holding the derived token TTL
pub const SECRET_KEY_TOKEN_MAX_TTL: &str = "VAULT_TOKEN_MAX_TTL";

/// Helm value the GitOps controller chart reads the per-environment Vault
/// path prefix from
pub const VAULT_SECRETS_PATH_VALUE: &str = "global.vaultSecretsPath";

/// Field in the per-environment values file holding the Vault path prefix
pub const VAULT_PATH_PREFIX_FIELD: &str = "vaultPathPrefix";

/// Vault KV entry (relative to the path prefix) holding installer secrets
pub const INSTALLER_KV_ENTRY: &str = "installer";

/// Field within the installer KV entry holding the GitOps admin password
pub const ADMIN_PASSWORD_FIELD: &str = "argocd.admin.plaintext_password";

/// Name of the top-level application declared when app sync is enabled
pub const DEFAULT_APP_NAME: &str = "apps";

/// Destination API server for the top-level application
pub const DEFAULT_DEST_SERVER: &str = "https://kubernetes.default.svc";
