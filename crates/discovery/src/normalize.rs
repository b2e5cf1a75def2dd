//! Conversion of backend payloads into [`Discovered`] records.
//!
//! Cluster resources, REST entries, local manifests and OCI image contents all
//! carry the same plugin spec; this module is the single place that turns it
//! into the canonical record.

use std::collections::{BTreeMap, HashMap};

use {
    plugctl_common::Target,
    plugctl_config::DiscoveryType,
    serde::{Deserialize, Serialize},
};

use crate::{
    error::{Error, Result},
    types::{ArtifactList, Discovered, Distribution},
    version::sort_versions,
};

/// Kind of the plugin resource documents.
pub const PLUGIN_RESOURCE_KIND: &str = "CLIPlugin";

/// Plugin description shared by every structured payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginSpec {
    pub description: String,
    pub recommended_version: String,
    /// Artifact list per supported version.
    pub artifacts: BTreeMap<String, ArtifactList>,
    /// Optional plugins are not installed automatically on sync.
    pub optional: bool,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceMeta {
    pub name: String,
}

/// A plugin resource document, as served by a cluster or stored in a
/// local or OCI manifest directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginResource {
    pub api_version: String,
    pub kind: String,
    pub metadata: ResourceMeta,
    pub spec: PluginSpec,
}

impl PluginResource {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

impl Discovered {
    /// Build the canonical record for one plugin.
    ///
    /// Supported versions come from the artifact map and are sorted by
    /// semantic version; a malformed version fails the whole record.
    pub fn from_spec(
        name: &str,
        spec: PluginSpec,
        source: &str,
        discovery_type: DiscoveryType,
    ) -> Result<Self> {
        let versions: Vec<&String> = spec.artifacts.keys().collect();
        let supported_versions = sort_versions(&versions).map_err(|err| Error::VersionParse {
            plugin: name.to_string(),
            source: err,
        })?;

        Ok(Self {
            name: name.to_string(),
            description: spec.description,
            recommended_version: spec.recommended_version,
            optional: spec.optional,
            target: Target::from(spec.target.as_str()),
            supported_versions,
            distribution: Distribution::new(spec.artifacts),
            source: source.to_string(),
            discovery_type,
        })
    }
}

/// Rewrite artifact images whose reference starts with an original registry
/// to use the override registry instead.
pub fn apply_image_repository_override(
    spec: &mut PluginSpec,
    overrides: &HashMap<String, String>,
) {
    if overrides.is_empty() {
        return;
    }
    for artifact in spec.artifacts.values_mut().flatten() {
        if artifact.image.is_empty() {
            continue;
        }
        for (original, replacement) in overrides {
            if artifact.image.starts_with(original.as_str()) {
                artifact.image = artifact.image.replacen(original.as_str(), replacement, 1);
            }
        }
    }
}

/// Parse plugin resource documents from manifest files.
///
/// Only `.yaml`/`.yml` files are considered. Files may hold several
/// documents; documents of another kind are ignored.
pub fn parse_plugin_manifests<'a>(
    files: impl IntoIterator<Item = (&'a str, &'a [u8])>,
) -> Result<Vec<PluginResource>> {
    let mut resources = Vec::new();
    for (file_name, content) in files {
        if !is_manifest_file(file_name) {
            continue;
        }
        for document in serde_yaml::Deserializer::from_slice(content) {
            let value = serde_yaml::Value::deserialize(document).map_err(|source| {
                Error::Manifest {
                    file: file_name.to_string(),
                    source,
                }
            })?;
            if value.is_null() {
                continue;
            }
            let resource: PluginResource =
                serde_yaml::from_value(value).map_err(|source| Error::Manifest {
                    file: file_name.to_string(),
                    source,
                })?;
            if !resource.kind.is_empty() && resource.kind != PLUGIN_RESOURCE_KIND {
                continue;
            }
            resources.push(resource);
        }
    }
    Ok(resources)
}

fn is_manifest_file(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    lower.ends_with(".yaml") || lower.ends_with(".yml")
}

/// Normalize resources listed by one backend.
pub fn discovered_from_resources(
    resources: Vec<PluginResource>,
    source: &str,
    discovery_type: DiscoveryType,
) -> Result<Vec<Discovered>> {
    resources
        .into_iter()
        .filter(|r| !r.name().is_empty())
        .map(|r| Discovered::from_spec(&r.metadata.name, r.spec, source, discovery_type))
        .collect()
}
