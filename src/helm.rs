//! # Helm Releases
//!
//! Install-or-upgrade of chart releases by shelling out to the `helm` CLI.
//!
//! Every upgrade runs with `--wait` and a bounded timeout: the call does not
//! return until the release's workloads report ready or the bound elapses,
//! which is what lets the sequencer order the GitOps controller strictly
//! after the secrets operator.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{error, info};

/// One install-or-upgrade invocation.
#[derive(Debug, Clone)]
pub struct ReleaseRequest {
    /// Release name
    pub release: String,
    /// Chart directory
    pub chart_dir: PathBuf,
    /// Target namespace (created if absent)
    pub namespace: String,
    /// Values files, applied in order (base first, overlay last)
    pub values_files: Vec<PathBuf>,
    /// Inline `--set` overrides
    pub set_values: Vec<(String, String)>,
    /// Upper bound on the upgrade including the readiness wait
    pub timeout: Duration,
}

/// Narrow seam over Helm so the sequencer is testable without a cluster.
#[async_trait]
pub trait ReleaseManager: Send + Sync {
    /// Fetch/lock the sub-charts a chart references (`helm dependency update`)
    async fn update_dependencies(&self, chart_dir: &Path) -> Result<()>;

    /// Install the release if absent, upgrade it in place otherwise, and
    /// block until its workloads are ready or the timeout elapses
    async fn upgrade_install(&self, request: &ReleaseRequest) -> Result<()>;
}

/// Production [`ReleaseManager`] backed by the `helm` CLI.
#[derive(Debug, Default)]
pub struct HelmCli;

impl HelmCli {
    async fn run(&self, args: &[String]) -> Result<()> {
        which::which("helm").context("helm CLI not found on PATH")?;

        let output = Command::new("helm")
            .args(args)
            .output()
            .await
            .context("Failed to execute helm")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("helm {} failed: {}", args[0], stderr.trim());
            return Err(anyhow!("helm {} failed: {}", args[0], stderr.trim()));
        }

        Ok(())
    }
}

#[async_trait]
impl ReleaseManager for HelmCli {
    async fn update_dependencies(&self, chart_dir: &Path) -> Result<()> {
        info!(chart = %chart_dir.display(), "Updating chart dependencies");

        self.run(&[
            "dependency".to_string(),
            "update".to_string(),
            chart_dir.display().to_string(),
        ])
        .await
    }

    async fn upgrade_install(&self, request: &ReleaseRequest) -> Result<()> {
        info!(
            release = request.release,
            namespace = request.namespace,
            "Installing or upgrading release"
        );

        let mut args = vec![
            "upgrade".to_string(),
            "--install".to_string(),
            request.release.clone(),
            request.chart_dir.display().to_string(),
            "--namespace".to_string(),
            request.namespace.clone(),
            "--create-namespace".to_string(),
        ];

        for values in &request.values_files {
            args.push("--values".to_string());
            args.push(values.display().to_string());
        }

        for (key, value) in &request.set_values {
            args.push("--set".to_string());
            args.push(format!("{key}={value}"));
        }

        args.push("--timeout".to_string());
        args.push(format!("{}s", request.timeout.as_secs()));
        args.push("--wait".to_string());

        self.run(&args).await?;

        info!(release = request.release, "Release ready");
        Ok(())
    }
}
