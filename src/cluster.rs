//! # Cluster Access
//!
//! Namespace and secret provisioning against the Kubernetes API, via the
//! ambient kubeconfig context.
//!
//! Both operations are declarative: namespace creation treats "already
//! exists" as success, and the credential secret is written with server-side
//! apply so re-running with identical content is a no-op and changed content
//! overwrites.

use crate::constants::FIELD_MANAGER;
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::Client;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Narrow seam over the Kubernetes API so the sequencer is testable without
/// a cluster.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Create the namespace if absent; succeed if it already exists
    async fn ensure_namespace(&self, name: &str) -> Result<()>;

    /// Create or overwrite an Opaque secret (apply semantics)
    async fn apply_secret(
        &self,
        namespace: &str,
        name: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<()>;
}

/// Production [`ClusterClient`] backed by kube.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl std::fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterClient").finish()
    }
}

impl KubeClusterClient {
    /// Connect using the ambient kubeconfig context.
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default()
            .await
            .context("Failed to create Kubernetes client from ambient kubeconfig")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn ensure_namespace(&self, name: &str) -> Result<()> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());

        let namespace = Namespace {
            metadata: kube::api::ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        match namespaces.create(&PostParams::default(), &namespace).await {
            Ok(_) => {
                info!(namespace = name, "Created namespace");
                Ok(())
            }
            Err(kube::Error::Api(err)) if err.code == 409 => {
                debug!(namespace = name, "Namespace already exists");
                Ok(())
            }
            Err(err) => {
                Err(err).with_context(|| format!("Failed to ensure namespace {name}"))
            }
        }
    }

    async fn apply_secret(
        &self,
        namespace: &str,
        name: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<()> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);

        // Server-side apply needs apiVersion/kind in the payload, which the
        // typed k8s-openapi structs omit from serialization.
        let secret = json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": name,
                "namespace": namespace,
            },
            "type": "Opaque",
            "stringData": data,
        });

        secrets
            .patch(
                name,
                &PatchParams::apply(FIELD_MANAGER).force(),
                &Patch::Apply(&secret),
            )
            .await
            .with_context(|| format!("Failed to apply secret {namespace}/{name}"))?;

        info!(namespace, secret = name, "Applied credential secret");
        Ok(())
    }
}
