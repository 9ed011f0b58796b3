//! # Cluster Bootstrapper
//!
//! A CLI that bootstraps a Kubernetes cluster's secret management and GitOps
//! controller via Helm.
//!
//! ## Overview
//!
//! The `install` command runs a strictly ordered, idempotent sequence:
//!
//! 1. **Validate** - required inputs and the per-environment values file
//! 2. **Resolve** - the environment's Vault path prefix (`vaultPathPrefix`)
//! 3. **Provision** - the operator namespace and a credential secret built
//!    from a freshly fetched AppRole role id
//! 4. **Release** - the Vault secrets operator, waiting for readiness
//! 5. **Release** - the GitOps controller (ArgoCD), templated with the Vault
//!    path prefix
//! 6. **Sync** (optional) - the top-level application, via the ArgoCD CLI
//!
//! Failure at any step aborts the run; committed mutations stay in place and
//! the sequence is safe to re-run.
//!
//! All external systems sit behind narrow traits ([`vault::SecretStore`],
//! [`cluster::ClusterClient`], [`helm::ReleaseManager`],
//! [`argocd::GitOpsClient`]) so the sequencing contract in
//! [`sequencer::Sequencer`] is testable without a cluster.

pub mod argocd;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod generator;
pub mod git;
pub mod helm;
pub mod sequencer;
pub mod vault;
