//! # Cluster Bootstrapper
//!
//! Binary entry point. Parses the CLI, wires the production adapters
//! (Vault, Kubernetes, Helm, ArgoCD) into the sequencer, and maps failures
//! to exit codes: 2 for usage errors (from clap), 1 for anything that failed
//! after argument parsing.

use anyhow::Result;
use clap::Parser;
use cluster_bootstrapper::argocd::ArgoCdCli;
use cluster_bootstrapper::cli::{Cli, Commands};
use cluster_bootstrapper::cluster::KubeClusterClient;
use cluster_bootstrapper::config::BootstrapConfig;
use cluster_bootstrapper::generator::{SecretGenerator, StdinPrompt};
use cluster_bootstrapper::helm::HelmCli;
use cluster_bootstrapper::sequencer::Sequencer;
use cluster_bootstrapper::vault::VaultSecretStore;
use std::sync::Arc;
use tracing::{error, info};
use zeroize::Zeroizing;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cluster_bootstrapper=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Install {
            environment,
            vault_role_id_path,
            vault_secret_id,
            vault_addr,
            environments_dir,
            charts_dir,
            sync_app,
        } => {
            let config = BootstrapConfig {
                environment,
                role_id_path: vault_role_id_path,
                secret_id: Zeroizing::new(vault_secret_id),
                vault_addr,
                environments_dir,
                charts_dir,
                sync_app,
            };

            install(config).await
        }
        Commands::GenerateSecrets {
            environment,
            regenerate,
            secrets_dir,
        } => {
            let mut prompt = StdinPrompt;
            let mut generator =
                SecretGenerator::new(&environment, regenerate, secrets_dir, &mut prompt);

            generator.load()?;
            generator.generate()?;
            generator.save()?;

            info!(environment, "Component secrets saved");
            Ok(())
        }
    }
}

async fn install(config: BootstrapConfig) -> Result<()> {
    info!(environment = config.environment, "Starting bootstrap");

    let secrets = Arc::new(VaultSecretStore::new(&config.vault_addr)?);
    let cluster = Arc::new(KubeClusterClient::try_default().await?);

    let mut sequencer = Sequencer::new(
        config,
        secrets,
        cluster,
        Arc::new(HelmCli),
        Arc::new(ArgoCdCli),
    );

    match sequencer.run().await {
        Ok(state) => {
            info!(state = ?state, "Bootstrap finished");
            Ok(())
        }
        Err(err) => {
            error!(state = ?sequencer.state(), "Bootstrap aborted");
            Err(err.into())
        }
    }
}
