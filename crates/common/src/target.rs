//! Plugin target enum shared between the catalog and discovery crates.

use serde::{Deserialize, Serialize};

/// Namespace a plugin build belongs to.
///
/// Older releases tagged plugins with no target at all; those records parse as
/// [`Target::Unknown`] and serialize back to the empty string so they stay
/// addressable by their bare name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Target {
    /// Untargeted legacy record.
    #[default]
    Unknown,
    /// Plugin that works without any server context.
    Global,
    /// Plugin that operates against a Kubernetes cluster.
    Kubernetes,
    /// Plugin that operates against a mission-control endpoint.
    MissionControl,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "",
            Self::Global => "global",
            Self::Kubernetes => "kubernetes",
            Self::MissionControl => "mission-control",
        }
    }

    /// Every target, in declaration order.
    pub const ALL: [Target; 4] = [
        Self::Unknown,
        Self::Global,
        Self::Kubernetes,
        Self::MissionControl,
    ];

    /// Targets that used to be recorded as [`Target::Unknown`].
    pub fn is_legacy_ambiguous(&self) -> bool {
        matches!(self, Self::Global | Self::Kubernetes)
    }
}

impl From<&str> for Target {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "global" => Self::Global,
            "kubernetes" | "k8s" => Self::Kubernetes,
            "mission-control" | "tmc" => Self::MissionControl,
            _ => Self::Unknown,
        }
    }
}

impl From<String> for Target {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Target> for String {
    fn from(value: Target) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
