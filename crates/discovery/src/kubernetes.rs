//! Discovery of plugins published as resources on a Kubernetes cluster.

use std::{collections::HashMap, sync::Arc};

use {
    async_trait::async_trait,
    plugctl_config::DiscoveryType,
    tracing::{debug, info},
};

use crate::{
    discovery::Discovery,
    error::Result,
    normalize::{PluginResource, apply_image_repository_override},
    types::Discovered,
};

/// Cluster access needed by [`KubernetesDiscovery`]. Client construction and
/// the resource wire format live outside this crate.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Whether the plugin resource type is installed on the cluster.
    async fn verify_plugin_resource_present(&self) -> anyhow::Result<bool>;

    async fn list_plugin_resources(&self) -> anyhow::Result<Vec<PluginResource>>;

    /// Original registry -> override registry pairs configured on the cluster.
    async fn image_repository_override(&self) -> anyhow::Result<HashMap<String, String>>;
}

/// Creates cluster clients for a kubeconfig path and context.
pub trait ClusterConnector: Send + Sync {
    fn connect(&self, kubeconfig: &str, context: &str) -> anyhow::Result<Arc<dyn ClusterClient>>;
}

pub struct KubernetesDiscovery {
    name: String,
    client: Arc<dyn ClusterClient>,
}

impl KubernetesDiscovery {
    pub fn new(name: impl Into<String>, client: Arc<dyn ClusterClient>) -> Self {
        Self {
            name: name.into(),
            client,
        }
    }
}

#[async_trait]
impl Discovery for KubernetesDiscovery {
    fn name(&self) -> &str {
        &self.name
    }

    fn discovery_type(&self) -> DiscoveryType {
        DiscoveryType::Kubernetes
    }

    async fn list(&self) -> Result<Vec<Discovered>> {
        match self.client.verify_plugin_resource_present().await {
            Ok(true) => {},
            Ok(false) => {
                debug!(
                    source = %self.name,
                    "plugin resource type not present on cluster, skipping context-aware discovery"
                );
                return Ok(Vec::new());
            },
            Err(e) => {
                debug!(
                    source = %self.name,
                    error = %e,
                    "could not verify plugin resource type, skipping context-aware discovery"
                );
                return Ok(Vec::new());
            },
        }

        let resources = self.client.list_plugin_resources().await?;

        let overrides = self
            .client
            .image_repository_override()
            .await
            .unwrap_or_else(|e| {
                info!(
                    source = %self.name,
                    error = %e,
                    "unable to get image repository override information"
                );
                HashMap::new()
            });

        let mut plugins = Vec::with_capacity(resources.len());
        for mut resource in resources {
            apply_image_repository_override(&mut resource.spec, &overrides);
            plugins.push(Discovered::from_spec(
                &resource.metadata.name,
                resource.spec,
                &self.name,
                self.discovery_type(),
            )?);
        }
        debug!(source = %self.name, count = plugins.len(), "listed cluster plugins");
        Ok(plugins)
    }
}
