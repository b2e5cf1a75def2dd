//! The backend-independent discovered plugin record and its artifacts.

use std::collections::BTreeMap;

use {
    plugctl_common::Target,
    plugctl_config::DiscoveryType,
    serde::{Deserialize, Serialize},
};

/// Where to fetch one build of a plugin version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Artifact {
    /// OCI image reference, when the artifact is served from a registry.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image: String,
    /// Direct download URI, when the artifact is served over HTTP.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uri: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub digest: String,
    pub os: String,
    pub arch: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub artifact_type: String,
}

pub type ArtifactList = Vec<Artifact>;

/// Artifacts for every supported version of a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distribution(BTreeMap<String, ArtifactList>);

impl Distribution {
    pub fn new(artifacts: BTreeMap<String, ArtifactList>) -> Self {
        Self(artifacts)
    }

    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn artifacts(&self, version: &str) -> Option<&ArtifactList> {
        self.0.get(version)
    }

    /// The artifact for `version` built for `os`/`arch`.
    pub fn artifact_for(&self, version: &str, os: &str, arch: &str) -> Option<&Artifact> {
        self.0
            .get(version)?
            .iter()
            .find(|a| a.os.eq_ignore_ascii_case(os) && a.arch.eq_ignore_ascii_case(arch))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A discoverable plugin, independent of the backend that listed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Discovered {
    pub name: String,
    pub description: String,
    pub recommended_version: String,
    pub optional: bool,
    pub target: Target,
    /// Ascending, without duplicates.
    pub supported_versions: Vec<String>,
    pub distribution: Distribution,
    /// Name of the discovery source that listed the plugin.
    pub source: String,
    pub discovery_type: DiscoveryType,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(os: &str, arch: &str, image: &str) -> Artifact {
        Artifact {
            image: image.into(),
            os: os.into(),
            arch: arch.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_artifact_for_platform() {
        let dist = Distribution::new(BTreeMap::from([(
            "v1.0.0".to_string(),
            vec![
                artifact("linux", "amd64", "repo/foo-linux:v1.0.0"),
                artifact("darwin", "arm64", "repo/foo-darwin:v1.0.0"),
            ],
        )]));

        assert_eq!(
            dist.artifact_for("v1.0.0", "darwin", "arm64")
                .map(|a| a.image.as_str()),
            Some("repo/foo-darwin:v1.0.0")
        );
        assert!(dist.artifact_for("v1.0.0", "windows", "amd64").is_none());
        assert!(dist.artifact_for("v2.0.0", "linux", "amd64").is_none());
        assert_eq!(dist.versions().collect::<Vec<_>>(), vec!["v1.0.0"]);
    }
}
