//! # Vault Access
//!
//! Reads the AppRole role id and installer secrets from HashiCorp Vault.
//!
//! Mode is auto-negotiated, matching how operators actually authenticate:
//!
//! - `VAULT_TOKEN` set → Vault HTTP API for KV v2 reads
//! - otherwise → the `vault` CLI, which resolves its own token helper from a
//!   previous `vault login`
//!
//! Generic single-field reads (`vault read -field=…`, used for the AppRole
//! role id) always go through the CLI; only it exposes that read shape for
//! an opaque path.
//!
//! Either way the configured endpoint is pinned: the HTTP client is built
//! with it, and spawned CLI processes get it as `VAULT_ADDR`. No retry, no
//! token caching across runs.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::process::Command;
use tracing::debug;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};

/// Narrow seam over Vault so the sequencer is testable without a live server.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read a single field from an arbitrary Vault path (`vault read -field=…`)
    async fn read_field(&self, path: &str, field: &str) -> Result<String>;

    /// Read a single field from a KV v2 entry (`vault kv get -field=…`).
    /// `path` includes the mount, e.g. `secret/minikube/installer`.
    async fn kv_get_field(&self, path: &str, field: &str) -> Result<String>;
}

/// Production [`SecretStore`] backed by the Vault HTTP API or CLI.
pub struct VaultSecretStore {
    addr: String,
    client: Option<VaultClient>,
}

impl std::fmt::Debug for VaultSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSecretStore")
            .field("addr", &self.addr)
            .field("mode", &if self.client.is_some() { "http" } else { "cli" })
            .finish()
    }
}

impl VaultSecretStore {
    /// Create a store for the given endpoint, using HTTP mode when a
    /// `VAULT_TOKEN` is present in the environment.
    pub fn new(addr: &str) -> Result<Self> {
        let client = match std::env::var("VAULT_TOKEN") {
            Ok(token) if !token.is_empty() => {
                let settings = VaultClientSettingsBuilder::default()
                    .address(addr)
                    .token(token)
                    .build()
                    .context("Failed to build Vault client settings")?;
                Some(VaultClient::new(settings).context("Failed to create Vault client")?)
            }
            _ => None,
        };

        let mode = if client.is_some() { "http" } else { "cli" };
        debug!(mode, addr, "Vault access configured");

        Ok(Self {
            addr: addr.to_string(),
            client,
        })
    }

    async fn cli(&self, args: &[&str]) -> Result<String> {
        which::which("vault").context(
            "vault CLI not found on PATH (set VAULT_TOKEN to use the HTTP API instead)",
        )?;

        let output = Command::new("vault")
            .args(args)
            .env("VAULT_ADDR", &self.addr)
            .output()
            .await
            .context("Failed to execute vault CLI")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("vault {} failed: {}", args[0], stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl SecretStore for VaultSecretStore {
    async fn read_field(&self, path: &str, field: &str) -> Result<String> {
        // role_id_path is an opaque path (`vault read` semantics); only the
        // CLI exposes a generic single-field read.
        self.cli(&["read", &format!("-field={field}"), path]).await
    }

    async fn kv_get_field(&self, path: &str, field: &str) -> Result<String> {
        if let Some(client) = &self.client {
            let (mount, entry) = split_kv_path(path)
                .ok_or_else(|| anyhow!("KV path has no mount component: {path}"))?;

            let data: HashMap<String, String> = vaultrs::kv2::read(client, mount, entry)
                .await
                .with_context(|| format!("Failed to read KV entry {path}"))?;

            return data
                .get(field)
                .cloned()
                .ok_or_else(|| anyhow!("Field '{field}' not found in KV entry {path}"));
        }

        self.cli(&["kv", "get", &format!("-field={field}"), path])
            .await
    }
}

/// Split a CLI-style KV path (`secret/minikube/installer`) into mount and
/// entry path.
fn split_kv_path(path: &str) -> Option<(&str, &str)> {
    let (mount, entry) = path.split_once('/')?;
    if mount.is_empty() || entry.is_empty() {
        return None;
    }
    Some((mount, entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_kv_path() {
        assert_eq!(
            split_kv_path("secret/minikube/installer"),
            Some(("secret", "minikube/installer"))
        );
        assert_eq!(split_kv_path("secret"), None);
        assert_eq!(split_kv_path("secret/"), None);
    }
}
