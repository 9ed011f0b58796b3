//! # Bootstrap Sequencer
//!
//! The linear state machine behind `install`: validate inputs, resolve the
//! environment's Vault path prefix, provision the operator's credential
//! secret, then install the secrets operator and the GitOps controller in
//! strict order.
//!
//! Every transition is guarded by its external call's success. Failure
//! aborts the run immediately and leaves already-committed cluster mutations
//! in place: the sequence is idempotent, so the recovery path is to fix the
//! root cause and re-run, not to roll back.

use crate::argocd::{AppSpec, GitOpsClient};
use crate::cluster::ClusterClient;
use crate::config::{load_environment_values, BootstrapConfig};
use crate::constants::{
    ADMIN_PASSWORD_FIELD, DEFAULT_APP_NAME, GITOPS_NAMESPACE, GITOPS_RELEASE,
    HELM_WAIT_TIMEOUT_SECS, INSTALLER_KV_ENTRY, OPERATOR_NAMESPACE, OPERATOR_RELEASE,
    OPERATOR_SECRET_NAME, SECRET_KEY_ROLE_ID, SECRET_KEY_SECRET_ID, SECRET_KEY_TOKEN_MAX_TTL,
    VAULT_SECRETS_PATH_VALUE, VAULT_TOKEN_MAX_TTL_SECS,
};
use crate::git::{self, RepoContext};
use crate::helm::{ReleaseManager, ReleaseRequest};
use crate::vault::SecretStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use zeroize::Zeroizing;

/// Progress of a bootstrap run.
///
/// States are strictly ordered; the sequencer only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootstrapState {
    /// Nothing has happened yet
    Pending,
    /// Inputs and environment configuration check out; no cluster mutation
    Validated,
    /// Operator namespace exists
    NamespaceEnsured,
    /// Credential secret applied
    SecretApplied,
    /// Secrets operator release installed and ready
    OperatorReleased,
    /// GitOps controller release installed and ready
    GitOpsReleased,
    /// Top-level application declared and synchronized
    AppSynced,
}

/// Why a bootstrap run stopped.
///
/// The source chain carries the failing tool's own diagnostics verbatim.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("missing required input: {0}")]
    MissingInput(&'static str),

    #[error("failed to resolve environment configuration")]
    Config(#[source] anyhow::Error),

    #[error("vault operation failed")]
    Vault(#[source] anyhow::Error),

    #[error("cluster operation failed")]
    Cluster(#[source] anyhow::Error),

    #[error("release {release} failed")]
    Release {
        release: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("application sync failed")]
    GitOps(#[source] anyhow::Error),
}

/// The bootstrap sequencer.
///
/// External systems are reached only through the four adapter traits, so the
/// sequencing contract is testable with fakes.
pub struct Sequencer {
    config: BootstrapConfig,
    secrets: Arc<dyn SecretStore>,
    cluster: Arc<dyn ClusterClient>,
    releases: Arc<dyn ReleaseManager>,
    gitops: Arc<dyn GitOpsClient>,
    state: BootstrapState,
    repo: Option<RepoContext>,
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish()
    }
}

impl Sequencer {
    pub fn new(
        config: BootstrapConfig,
        secrets: Arc<dyn SecretStore>,
        cluster: Arc<dyn ClusterClient>,
        releases: Arc<dyn ReleaseManager>,
        gitops: Arc<dyn GitOpsClient>,
    ) -> Self {
        Self {
            config,
            secrets,
            cluster,
            releases,
            gitops,
            state: BootstrapState::Pending,
            repo: None,
        }
    }

    /// Preset the repository context instead of detecting it from the
    /// checkout. Used by tests and CI wrappers.
    #[must_use]
    pub fn with_repo_context(mut self, repo: RepoContext) -> Self {
        self.repo = Some(repo);
        self
    }

    /// The last state this run reached.
    pub fn state(&self) -> BootstrapState {
        self.state
    }

    /// Run the full sequence, returning the final state.
    pub async fn run(&mut self) -> Result<BootstrapState, BootstrapError> {
        let prefix = self.validate()?;

        // Prefetched for the optional login step; tolerated on failure.
        let admin_password = self.fetch_admin_password(&prefix).await;

        if self.repo.is_none() {
            self.repo = git::detect_repo_context().await;
        }

        self.ensure_namespace().await?;
        self.apply_credential_secret().await?;
        self.release_operator().await?;
        self.release_gitops(&prefix).await?;

        if self.config.sync_app {
            self.sync_application(admin_password).await?;
        }

        info!(state = ?self.state, "Bootstrap complete");
        Ok(self.state)
    }

    /// Steps 1–2: input presence and environment configuration. No cluster
    /// mutation happens before this returns.
    fn validate(&mut self) -> Result<String, BootstrapError> {
        if self.config.environment.is_empty() {
            return Err(BootstrapError::MissingInput("ENVIRONMENT"));
        }
        if self.config.role_id_path.is_empty() {
            return Err(BootstrapError::MissingInput("VAULT_ROLE_ID_PATH"));
        }
        if self.config.secret_id.is_empty() {
            return Err(BootstrapError::MissingInput("VAULT_SECRET_ID"));
        }

        let values =
            load_environment_values(&self.config.values_file()).map_err(BootstrapError::Config)?;

        self.state = BootstrapState::Validated;
        info!(
            environment = self.config.environment,
            prefix = values.vault_path_prefix,
            "Environment configuration resolved"
        );

        Ok(values.vault_path_prefix)
    }

    /// Step 3: fetch the GitOps admin password for the optional login step.
    /// Allowed to fail; the required steps never depend on it.
    async fn fetch_admin_password(&self, prefix: &str) -> Option<Zeroizing<String>> {
        let path = format!("{prefix}/{INSTALLER_KV_ENTRY}");
        match self.secrets.kv_get_field(&path, ADMIN_PASSWORD_FIELD).await {
            Ok(password) => Some(Zeroizing::new(password)),
            Err(err) => {
                warn!("Admin password unavailable ({err:#}); app sync would be skipped");
                None
            }
        }
    }

    /// Step 5: idempotent namespace creation.
    async fn ensure_namespace(&mut self) -> Result<(), BootstrapError> {
        self.cluster
            .ensure_namespace(OPERATOR_NAMESPACE)
            .await
            .map_err(BootstrapError::Cluster)?;

        self.state = BootstrapState::NamespaceEnsured;
        Ok(())
    }

    /// Step 6: credential secret from a fresh role id, the supplied secret
    /// id, and the fixed TTL. Apply semantics, safe to repeat.
    async fn apply_credential_secret(&mut self) -> Result<(), BootstrapError> {
        let role_id = self
            .secrets
            .read_field(&self.config.role_id_path, "role_id")
            .await
            .map_err(BootstrapError::Vault)?;

        let mut data = BTreeMap::new();
        data.insert(SECRET_KEY_ROLE_ID.to_string(), role_id);
        data.insert(
            SECRET_KEY_SECRET_ID.to_string(),
            self.config.secret_id.to_string(),
        );
        data.insert(
            SECRET_KEY_TOKEN_MAX_TTL.to_string(),
            VAULT_TOKEN_MAX_TTL_SECS.to_string(),
        );

        self.cluster
            .apply_secret(OPERATOR_NAMESPACE, OPERATOR_SECRET_NAME, &data)
            .await
            .map_err(BootstrapError::Cluster)?;

        self.state = BootstrapState::SecretApplied;
        Ok(())
    }

    /// Step 7: secrets operator release. Blocks until ready.
    async fn release_operator(&mut self) -> Result<(), BootstrapError> {
        self.release(OPERATOR_RELEASE, OPERATOR_NAMESPACE, Vec::new())
            .await?;

        self.state = BootstrapState::OperatorReleased;
        Ok(())
    }

    /// Step 8: GitOps controller release, templated with the environment's
    /// Vault path prefix. Blocks until ready.
    async fn release_gitops(&mut self, prefix: &str) -> Result<(), BootstrapError> {
        self.release(
            GITOPS_RELEASE,
            GITOPS_NAMESPACE,
            vec![(VAULT_SECRETS_PATH_VALUE.to_string(), prefix.to_string())],
        )
        .await?;

        self.state = BootstrapState::GitOpsReleased;
        Ok(())
    }

    async fn release(
        &self,
        release: &str,
        namespace: &str,
        set_values: Vec<(String, String)>,
    ) -> Result<(), BootstrapError> {
        let chart_dir = self.config.chart_dir(release);

        self.releases
            .update_dependencies(&chart_dir)
            .await
            .map_err(|source| BootstrapError::Release {
                release: release.to_string(),
                source,
            })?;

        let request = ReleaseRequest {
            release: release.to_string(),
            chart_dir: chart_dir.clone(),
            namespace: namespace.to_string(),
            values_files: vec![
                chart_dir.join("values.yaml"),
                chart_dir.join(format!("values-{}.yaml", self.config.environment)),
            ],
            set_values,
            timeout: Duration::from_secs(HELM_WAIT_TIMEOUT_SECS),
        };

        self.releases
            .upgrade_install(&request)
            .await
            .map_err(|source| BootstrapError::Release {
                release: release.to_string(),
                source,
            })
    }

    /// Step 9 (optional): declare and synchronize the top-level application.
    async fn sync_application(
        &mut self,
        admin_password: Option<Zeroizing<String>>,
    ) -> Result<(), BootstrapError> {
        let password = admin_password.ok_or_else(|| {
            BootstrapError::GitOps(anyhow::anyhow!(
                "admin password was not retrievable from vault"
            ))
        })?;

        let repo = self.repo.clone().ok_or_else(|| {
            BootstrapError::GitOps(anyhow::anyhow!(
                "origin repository could not be determined from the checkout"
            ))
        })?;

        self.gitops
            .login(&password)
            .await
            .map_err(BootstrapError::GitOps)?;

        let app = AppSpec {
            name: DEFAULT_APP_NAME.to_string(),
            repo_url: repo.url,
            revision: repo.branch,
            path: self.config.environments_dir.display().to_string(),
            values_file: format!("values-{}.yaml", self.config.environment),
        };

        self.gitops
            .upsert_app(&app)
            .await
            .map_err(BootstrapError::GitOps)?;

        self.gitops
            .sync_app(&app.name)
            .await
            .map_err(BootstrapError::GitOps)?;

        self.state = BootstrapState::AppSynced;
        Ok(())
    }
}
