//! Discovery source descriptors as they appear in the CLI configuration.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::settings::{DEFAULT_STANDALONE_DISCOVERY_NAME, Settings};

/// Kind of backend a discovery source is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryType {
    Local,
    Oci,
    Kubernetes,
    Rest,
    /// Deprecated bucket-hosted manifests.
    GcpLegacy,
}

impl DiscoveryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Oci => "oci",
            Self::Kubernetes => "kubernetes",
            Self::Rest => "rest",
            Self::GcpLegacy => "gcp-legacy",
        }
    }
}

impl std::fmt::Display for DiscoveryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DiscoveryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "oci" => Ok(Self::Oci),
            "kubernetes" | "k8s" => Ok(Self::Kubernetes),
            "rest" => Ok(Self::Rest),
            "gcp" | "gcp-legacy" => Ok(Self::GcpLegacy),
            other => Err(format!("unknown discovery type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSource {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OciSource {
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubernetesSource {
    pub name: String,
    /// Kubeconfig path.
    #[serde(default)]
    pub path: String,
    /// Kubeconfig context.
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestSource {
    pub name: String,
    pub endpoint: String,
    pub base_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpSource {
    pub name: String,
    pub bucket: String,
    pub manifest_path: String,
}

/// One configured place plugins can be discovered from.
///
/// Serialized as a single-key map (`oci: {name, image}`) in every format,
/// including YAML where serde_yaml would otherwise emit a `!oci` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoverySource {
    Local(LocalSource),
    Oci(OciSource),
    Kubernetes(KubernetesSource),
    Rest(RestSource),
    Gcp(GcpSource),
}

#[derive(Serialize, Deserialize)]
#[serde(remote = "DiscoverySource", rename_all = "lowercase")]
enum DiscoverySourceDef {
    Local(LocalSource),
    Oci(OciSource),
    Kubernetes(KubernetesSource),
    Rest(RestSource),
    Gcp(GcpSource),
}

struct SourceRef<'a>(&'a DiscoverySource);

impl Serialize for SourceRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DiscoverySourceDef::serialize(self.0, serializer)
    }
}

struct SourceOwned(DiscoverySource);

impl<'de> Deserialize<'de> for SourceOwned {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        DiscoverySourceDef::deserialize(deserializer).map(Self)
    }
}

impl Serialize for DiscoverySource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_yaml::with::singleton_map::serialize(&SourceRef(self), serializer)
    }
}

impl<'de> Deserialize<'de> for DiscoverySource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_yaml::with::singleton_map::deserialize(deserializer)
            .map(|source: SourceOwned| source.0)
    }
}

impl DiscoverySource {
    pub fn name(&self) -> &str {
        match self {
            Self::Local(s) => &s.name,
            Self::Oci(s) => &s.name,
            Self::Kubernetes(s) => &s.name,
            Self::Rest(s) => &s.name,
            Self::Gcp(s) => &s.name,
        }
    }

    pub fn discovery_type(&self) -> DiscoveryType {
        match self {
            Self::Local(_) => DiscoveryType::Local,
            Self::Oci(_) => DiscoveryType::Oci,
            Self::Kubernetes(_) => DiscoveryType::Kubernetes,
            Self::Rest(_) => DiscoveryType::Rest,
            Self::Gcp(_) => DiscoveryType::GcpLegacy,
        }
    }

    /// True when both sources are of type `kind` and point at the same place.
    pub fn same_source(&self, other: &Self, kind: DiscoveryType) -> bool {
        self.discovery_type() == kind && self == other
    }
}

/// Whether any configured source already uses `name`.
pub fn contains_name(sources: &[DiscoverySource], name: &str) -> bool {
    sources.iter().any(|s| s.name() == name)
}

/// The stand-alone source every installation starts with.
pub fn default_standalone_discovery(settings: &Settings) -> DiscoverySource {
    if settings.discovery_type.parse::<DiscoveryType>() == Ok(DiscoveryType::Local) {
        DiscoverySource::Local(LocalSource {
            name: DEFAULT_STANDALONE_DISCOVERY_NAME.to_string(),
            path: settings.discovery_local_path.clone(),
        })
    } else {
        DiscoverySource::Oci(OciSource {
            name: DEFAULT_STANDALONE_DISCOVERY_NAME.to_string(),
            image: settings.default_standalone_discovery_image(),
        })
    }
}

/// Ensure the default stand-alone source is first in `sources` and matches
/// the current settings. Returns whether `sources` changed.
pub fn populate_default_standalone_discovery(
    sources: &mut Vec<DiscoverySource>,
    settings: &Settings,
) -> bool {
    let default = default_standalone_discovery(settings);
    let existing = sources
        .iter()
        .position(|s| s.name() == DEFAULT_STANDALONE_DISCOVERY_NAME);

    if let Some(index) = existing {
        if sources[index].same_source(&default, default.discovery_type()) {
            return false;
        }
        sources.remove(index);
    }
    sources.insert(0, default);
    true
}
