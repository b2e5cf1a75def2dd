use serde::{Deserialize, Serialize};

use crate::target::Target;

/// Installation record for one plugin binary at one version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginInfo {
    pub name: String,
    pub description: String,
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub build_sha: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub digest: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub group: String,
    #[serde(rename = "docURL", skip_serializing_if = "String::is_empty")]
    pub doc_url: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Absolute path of the installed binary. Unique across the catalog.
    pub installation_path: String,
    /// Name of the discovery source the plugin was installed from.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub discovery: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub discovered_recommended_version: String,
    pub target: Target,
}

impl PluginInfo {
    /// Catalog key for this record, see [`plugin_name_target`].
    pub fn key(&self) -> String {
        plugin_name_target(&self.name, self.target)
    }
}

/// Builds the key that refers to a plugin for a specific target.
///
/// An unknown target collapses to the bare name.
pub fn plugin_name_target(name: &str, target: Target) -> String {
    match target {
        Target::Unknown => name.to_string(),
        target => format!("{name}_{target}"),
    }
}
