//! # GitOps Controller Session
//!
//! Declares and synchronizes the top-level application through the `argocd`
//! CLI. Only reachable when app sync is enabled on the run; the required
//! bootstrap steps never call into this module.
//!
//! The CLI is driven in port-forward mode so the controller does not need an
//! ingress before its own application tree has synced.

use crate::constants::{DEFAULT_DEST_SERVER, GITOPS_NAMESPACE};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

/// The top-level application to declare.
#[derive(Debug, Clone)]
pub struct AppSpec {
    /// Application name
    pub name: String,
    /// Canonical HTTPS URL of the manifest repository
    pub repo_url: String,
    /// Branch to track
    pub revision: String,
    /// Path of the manifests within the repository
    pub path: String,
    /// Per-environment values file within that path
    pub values_file: String,
}

/// Narrow seam over the GitOps CLI so the sequencer is testable without a
/// controller.
#[async_trait]
pub trait GitOpsClient: Send + Sync {
    /// Authenticate a CLI session as the admin user
    async fn login(&self, password: &str) -> Result<()>;

    /// Create or update the top-level application declaration
    async fn upsert_app(&self, app: &AppSpec) -> Result<()>;

    /// Trigger a sync of the named application
    async fn sync_app(&self, name: &str) -> Result<()>;
}

/// Production [`GitOpsClient`] backed by the `argocd` CLI.
#[derive(Debug, Default)]
pub struct ArgoCdCli;

impl ArgoCdCli {
    async fn run(&self, args: &[String]) -> Result<()> {
        which::which("argocd").context("argocd CLI not found on PATH")?;

        let output = Command::new("argocd")
            .args(args)
            .args(port_forward_args())
            .output()
            .await
            .context("Failed to execute argocd")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("argocd {} failed: {}", args[0], stderr.trim()));
        }

        Ok(())
    }
}

fn port_forward_args() -> [String; 3] {
    [
        "--port-forward".to_string(),
        "--port-forward-namespace".to_string(),
        GITOPS_NAMESPACE.to_string(),
    ]
}

#[async_trait]
impl GitOpsClient for ArgoCdCli {
    async fn login(&self, password: &str) -> Result<()> {
        info!("Logging in to the GitOps controller");

        // The password is an argument to a child process, never logged.
        self.run(&[
            "login".to_string(),
            "--plaintext".to_string(),
            "--username".to_string(),
            "admin".to_string(),
            "--password".to_string(),
            password.to_string(),
        ])
        .await
    }

    async fn upsert_app(&self, app: &AppSpec) -> Result<()> {
        info!(app = app.name, revision = app.revision, "Declaring application");

        self.run(&[
            "app".to_string(),
            "create".to_string(),
            app.name.clone(),
            "--repo".to_string(),
            app.repo_url.clone(),
            "--path".to_string(),
            app.path.clone(),
            "--revision".to_string(),
            app.revision.clone(),
            "--dest-server".to_string(),
            DEFAULT_DEST_SERVER.to_string(),
            "--dest-namespace".to_string(),
            "default".to_string(),
            "--values".to_string(),
            app.values_file.clone(),
            "--upsert".to_string(),
        ])
        .await
    }

    async fn sync_app(&self, name: &str) -> Result<()> {
        info!(app = name, "Synchronizing application");

        self.run(&["app".to_string(), "sync".to_string(), name.to_string()])
            .await
    }
}
