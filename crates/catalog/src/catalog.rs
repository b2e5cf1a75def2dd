//! In-memory shape of the plugin catalog and the legacy target migration rule.

use std::collections::BTreeMap;

use {
    plugctl_common::{PluginInfo, Target, plugin_name_target},
    serde::{Deserialize, Deserializer, Serialize},
    tracing::debug,
};

/// Plugin key -> active installation path.
pub type PluginAssociation = BTreeMap<String, String>;

/// Every installed plugin binary and which one is active per scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Catalog {
    /// Installation path -> plugin record.
    #[serde(deserialize_with = "null_as_default")]
    pub index_by_path: BTreeMap<String, PluginInfo>,
    /// Plugin key -> every installation path recorded for it.
    #[serde(deserialize_with = "null_as_default")]
    pub index_by_name: BTreeMap<String, Vec<String>>,
    #[serde(deserialize_with = "null_as_default")]
    pub stand_alone_plugins: PluginAssociation,
    /// Context name -> active plugins for that context.
    #[serde(deserialize_with = "null_as_default")]
    pub server_plugins: BTreeMap<String, PluginAssociation>,
}

/// Older cache files may carry explicit nulls where maps are expected.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Namespace a set of active plugins belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    StandAlone,
    Server(String),
}

impl Scope {
    /// An empty context name selects the stand-alone scope.
    pub fn from_context(context: &str) -> Self {
        if context.is_empty() {
            Self::StandAlone
        } else {
            Self::Server(context.to_string())
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StandAlone => write!(f, "stand-alone"),
            Self::Server(name) => write!(f, "context {name}"),
        }
    }
}

impl Catalog {
    pub fn associations(&self, scope: &Scope) -> Option<&PluginAssociation> {
        match scope {
            Scope::StandAlone => Some(&self.stand_alone_plugins),
            Scope::Server(name) => self.server_plugins.get(name),
        }
    }

    /// Active plugins for `scope`, created empty if the context is new.
    pub fn associations_mut(&mut self, scope: &Scope) -> &mut PluginAssociation {
        match scope {
            Scope::StandAlone => &mut self.stand_alone_plugins,
            Scope::Server(name) => self.server_plugins.entry(name.clone()).or_default(),
        }
    }

    /// Whether any association or name index still points at `path`.
    pub fn is_referenced(&self, path: &str) -> bool {
        self.stand_alone_plugins.values().any(|p| p == path)
            || self
                .server_plugins
                .values()
                .any(|assoc| assoc.values().any(|p| p == path))
            || self
                .index_by_name
                .values()
                .any(|paths| paths.iter().any(|p| p == path))
    }
}

/// Enforce that a plugin name is active under at most one of the unknown,
/// global and kubernetes targets within `scope`.
///
/// The unknown target used to stand for global plugins and, in even older
/// releases, for either global or kubernetes plugins. Installing a global or
/// kubernetes build evicts the unknown entry; installing an unknown build
/// evicts both of the others.
pub fn reconcile_legacy_target(catalog: &mut Catalog, scope: &Scope, name: &str, target: Target) {
    match target {
        target if target.is_legacy_ambiguous() => {
            evict(catalog, scope, &plugin_name_target(name, Target::Unknown));
        },
        Target::Unknown => {
            for legacy in Target::ALL.into_iter().filter(Target::is_legacy_ambiguous) {
                evict(catalog, scope, &plugin_name_target(name, legacy));
            }
        },
        _ => {},
    }
}

fn evict(catalog: &mut Catalog, scope: &Scope, key: &str) {
    let Some(path) = catalog.associations_mut(scope).remove(key) else {
        return;
    };
    catalog.index_by_name.remove(key);
    // Another context may still activate the same binary.
    if !catalog.is_referenced(&path) {
        catalog.index_by_path.remove(&path);
    }
    debug!(%scope, key, path, "evicted plugin entry superseded by a different target");
}
