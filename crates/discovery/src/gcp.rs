//! Discovery from the deprecated bucket-hosted plugin manifests.
//!
//! The bucket holds one YAML manifest listing plugin names and versions.
//! Binaries live under `artifacts/<name>/<version>/` in the same bucket; the
//! installer appends the platform-specific file name to that prefix.

use std::{collections::BTreeMap, sync::Arc};

use {
    async_trait::async_trait,
    plugctl_config::{DiscoveryType, trust::gcp_bucket_uri},
    serde::Deserialize,
    tracing::debug,
};

use crate::{
    discovery::Discovery,
    error::{Error, Result},
    normalize::PluginSpec,
    types::{Artifact, Discovered},
    version::latest_version,
};

/// Artifact type recorded for bucket-hosted binaries.
pub const GCP_ARTIFACT_TYPE: &str = "gcp";

/// Reads objects from a storage bucket.
#[async_trait]
pub trait BucketReader: Send + Sync {
    async fn read_object(&self, bucket: &str, path: &str) -> anyhow::Result<Vec<u8>>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyManifest {
    plugins: Vec<LegacyPlugin>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LegacyPlugin {
    name: String,
    description: String,
    versions: Vec<String>,
    recommended_version: String,
    target: String,
}

pub struct GcpLegacyDiscovery {
    name: String,
    bucket: String,
    manifest_path: String,
    reader: Arc<dyn BucketReader>,
}

impl GcpLegacyDiscovery {
    pub fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        manifest_path: impl Into<String>,
        reader: Arc<dyn BucketReader>,
    ) -> Self {
        Self {
            name: name.into(),
            bucket: bucket.into(),
            manifest_path: manifest_path.into(),
            reader,
        }
    }

    fn artifact_uri(&self, plugin: &str, version: &str) -> String {
        format!(
            "{}artifacts/{plugin}/{version}/",
            gcp_bucket_uri(&self.bucket)
        )
    }

    fn spec_for(&self, plugin: &LegacyPlugin) -> PluginSpec {
        let artifacts: BTreeMap<_, _> = plugin
            .versions
            .iter()
            .map(|v| {
                (v.clone(), vec![Artifact {
                    uri: self.artifact_uri(&plugin.name, v),
                    artifact_type: GCP_ARTIFACT_TYPE.to_string(),
                    ..Default::default()
                }])
            })
            .collect();
        let recommended_version = if plugin.recommended_version.is_empty() {
            latest_version(&plugin.versions)
                .unwrap_or_default()
                .to_string()
        } else {
            plugin.recommended_version.clone()
        };
        PluginSpec {
            description: plugin.description.clone(),
            recommended_version,
            artifacts,
            optional: false,
            target: plugin.target.clone(),
        }
    }
}

#[async_trait]
impl Discovery for GcpLegacyDiscovery {
    fn name(&self) -> &str {
        &self.name
    }

    fn discovery_type(&self) -> DiscoveryType {
        DiscoveryType::GcpLegacy
    }

    async fn list(&self) -> Result<Vec<Discovered>> {
        let raw = self
            .reader
            .read_object(&self.bucket, &self.manifest_path)
            .await?;
        let manifest: LegacyManifest =
            serde_yaml::from_slice(&raw).map_err(|source| Error::Manifest {
                file: format!("{}{}", gcp_bucket_uri(&self.bucket), self.manifest_path),
                source,
            })?;
        debug!(
            source = %self.name,
            bucket = %self.bucket,
            count = manifest.plugins.len(),
            "read legacy bucket manifest"
        );

        manifest
            .plugins
            .iter()
            .filter(|p| !p.name.is_empty())
            .map(|p| {
                Discovered::from_spec(&p.name, self.spec_for(p), &self.name, self.discovery_type())
            })
            .collect()
    }
}
