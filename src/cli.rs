//! # CLI
//!
//! Command-line interface for the cluster bootstrapper.
//!
//! ## Usage
//!
//! ```bash
//! # Bootstrap the minikube environment
//! cluster-bootstrapper install minikube \
//!     auth/approle/role/vault-secrets-operator/role-id \
//!     "$VAULT_SECRET_ID"
//!
//! # Bootstrap and synchronize the top-level application
//! cluster-bootstrapper install production ... --sync-app
//!
//! # Collect/refresh the per-component secret files
//! cluster-bootstrapper generate-secrets minikube --regenerate
//! ```

use crate::constants::DEFAULT_VAULT_ADDR;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cluster bootstrapper CLI
#[derive(Debug, Parser)]
#[command(name = "cluster-bootstrapper")]
#[command(
    about = "Bootstraps a cluster's secret management and GitOps controller via Helm",
    version,
    long_version = concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("BUILD_GIT_HASH"), ", built ", env!("BUILD_DATETIME"), ")"
    ),
    after_help = "\
Examples:
  cluster-bootstrapper install minikube auth/approle/role/vault-secrets-operator/role-id $SECRET_ID
  cluster-bootstrapper install production $ROLE_ID_PATH $SECRET_ID --sync-app
  cluster-bootstrapper generate-secrets minikube --regenerate
"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Provision the Vault credential secret, then install the secrets
    /// operator and the GitOps controller in order
    Install {
        /// Environment name selecting the values overlay (e.g. "minikube")
        #[arg(value_name = "ENVIRONMENT")]
        environment: String,

        /// Vault path the operator's AppRole role id is read from
        #[arg(value_name = "VAULT_ROLE_ID_PATH")]
        vault_role_id_path: String,

        /// AppRole secret id injected into the credential secret
        #[arg(value_name = "VAULT_SECRET_ID")]
        vault_secret_id: String,

        /// Vault endpoint
        #[arg(long, default_value = DEFAULT_VAULT_ADDR)]
        vault_addr: String,

        /// Directory holding values-<ENVIRONMENT>.yaml files
        #[arg(long, default_value = "environments")]
        environments_dir: PathBuf,

        /// Directory holding the operator and GitOps controller charts
        #[arg(long, default_value = "charts")]
        charts_dir: PathBuf,

        /// Declare and synchronize the top-level application after install
        #[arg(long)]
        sync_app: bool,
    },

    /// Collect or generate the per-component secret files under secrets/
    GenerateSecrets {
        /// Environment name the secrets are generated for
        #[arg(value_name = "ENVIRONMENT")]
        environment: String,

        /// Recreate generated (non-prompted) secrets even if present
        #[arg(long)]
        regenerate: bool,

        /// Directory of per-component secret files
        #[arg(long, default_value = "secrets")]
        secrets_dir: PathBuf,
    },
}
