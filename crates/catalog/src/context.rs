//! Context-scoped view over the shared catalog.

use {plugctl_common::PluginInfo, tracing::debug};

use crate::{
    catalog::{Catalog, PluginAssociation, Scope, reconcile_legacy_target},
    error::{Error, Result},
    store::CatalogStore,
};

/// The plugins active for either the stand-alone scope or one server context.
///
/// Indices are shared across scopes, so every mutation persists the entire
/// catalog. Mutations reload the cache under the store lock first, so changes
/// written by another process since [`ContextCatalog::open`] are kept.
#[derive(Debug)]
pub struct ContextCatalog {
    store: CatalogStore,
    catalog: Catalog,
    scope: Scope,
}

impl ContextCatalog {
    /// Load the catalog and bind to `context` (empty for stand-alone).
    pub fn open(store: CatalogStore, context: &str) -> Result<Self> {
        let scope = Scope::from_context(context);
        let mut catalog = store
            .load()
            .map_err(|e| Error::StoreUnavailable(Box::new(e)))?;
        catalog.associations_mut(&scope);
        Ok(Self {
            store,
            catalog,
            scope,
        })
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Snapshot of the shared catalog as of the last load or mutation.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Record `plugin` as installed and active in this scope.
    pub fn upsert(&mut self, plugin: &PluginInfo) -> Result<()> {
        let scope = self.scope.clone();
        self.mutate(|catalog| {
            let key = plugin.key();
            let path = plugin.installation_path.clone();

            catalog
                .associations_mut(&scope)
                .insert(key.clone(), path.clone());
            catalog.index_by_path.insert(path.clone(), plugin.clone());
            let paths = catalog.index_by_name.entry(key).or_default();
            if !paths.contains(&path) {
                paths.push(path);
            }

            reconcile_legacy_target(catalog, &scope, &plugin.name, plugin.target);
        })?;
        debug!(
            scope = %self.scope,
            plugin = %plugin.name,
            version = %plugin.version,
            "upserted plugin"
        );
        Ok(())
    }

    /// Active plugin for `key`, if any.
    pub fn get(&self, key: &str) -> Option<PluginInfo> {
        let path = self.associations().get(key)?;
        self.catalog.index_by_path.get(path).cloned()
    }

    /// Every plugin active in this scope. Order is unspecified.
    pub fn list(&self) -> Vec<PluginInfo> {
        self.associations()
            .values()
            .filter_map(|path| self.catalog.index_by_path.get(path))
            .cloned()
            .collect()
    }

    /// Deactivate `key` in this scope. The installation itself stays
    /// recorded. Deleting an absent key still persists and succeeds.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        let scope = self.scope.clone();
        self.mutate(|catalog| {
            if catalog.associations_mut(&scope).remove(key).is_some() {
                debug!(%scope, key, "removed plugin from scope");
            }
        })
    }

    fn associations(&self) -> &PluginAssociation {
        static EMPTY: PluginAssociation = PluginAssociation::new();
        self.catalog.associations(&self.scope).unwrap_or(&EMPTY)
    }

    fn mutate(&mut self, apply: impl FnOnce(&mut Catalog)) -> Result<()> {
        let store = &self.store;
        let scope = &self.scope;
        let catalog = store.with_lock(|| {
            let mut fresh = store.load()?;
            fresh.associations_mut(scope);
            apply(&mut fresh);
            store.save(&fresh)?;
            Ok(fresh)
        })?;
        self.catalog = catalog;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, plugctl_common::Target, rstest::rstest, std::fs};

    struct Fixture {
        _dir: tempfile::TempDir,
        store: CatalogStore,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let store = CatalogStore::new(dir.path());
            Self { _dir: dir, store }
        }

        fn open(&self, context: &str) -> ContextCatalog {
            ContextCatalog::open(self.store.clone(), context).unwrap()
        }
    }

    fn plugin(name: &str, target: Target, version: &str) -> PluginInfo {
        PluginInfo {
            name: name.into(),
            description: format!("{name} plugin"),
            version: version.into(),
            installation_path: format!("/plugins/{name}/{version}_{target}"),
            target,
            ..Default::default()
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let fx = Fixture::new();
        let mut cc = fx.open("");
        let p = plugin("login", Target::Global, "v1.0.0");
        cc.upsert(&p).unwrap();

        assert_eq!(cc.get("login_global"), Some(p.clone()));
        assert_eq!(cc.get("login"), None);

        // Persisted: a fresh view sees it.
        assert_eq!(fx.open("").get("login_global"), Some(p));
    }

    #[test]
    fn test_upsert_same_path_does_not_duplicate() {
        let fx = Fixture::new();
        let mut cc = fx.open("");
        let p = plugin("login", Target::Global, "v1.0.0");
        cc.upsert(&p).unwrap();
        cc.upsert(&p).unwrap();
        cc.upsert(&plugin("login", Target::Global, "v1.1.0")).unwrap();
        cc.upsert(&p).unwrap();

        assert_eq!(cc.catalog().index_by_name["login_global"].len(), 2);
        assert_eq!(cc.get("login_global").unwrap().version, "v1.0.0");
    }

    #[rstest]
    #[case(Target::Global)]
    #[case(Target::Kubernetes)]
    fn test_targeted_install_evicts_unknown(#[case] target: Target) {
        let fx = Fixture::new();
        let mut cc = fx.open("");
        let legacy = plugin("foo", Target::Unknown, "v0.1.0");
        cc.upsert(&legacy).unwrap();

        cc.upsert(&plugin("foo", target, "v1.0.0")).unwrap();

        let catalog = cc.catalog();
        assert!(!catalog.index_by_path.contains_key(&legacy.installation_path));
        assert!(!catalog.index_by_name.contains_key("foo"));
        assert!(cc.get("foo").is_none());
        assert_eq!(cc.list().len(), 1);
    }

    #[test]
    fn test_unknown_install_evicts_targeted() {
        let fx = Fixture::new();
        let mut cc = fx.open("ctx");
        cc.upsert(&plugin("foo", Target::Global, "v1.0.0")).unwrap();
        cc.upsert(&plugin("foo", Target::Kubernetes, "v1.0.0")).unwrap();

        let legacy = plugin("foo", Target::Unknown, "v0.1.0");
        cc.upsert(&legacy).unwrap();

        assert_eq!(cc.list(), vec![legacy]);
        assert!(!cc.catalog().index_by_name.contains_key("foo_global"));
        assert!(!cc.catalog().index_by_name.contains_key("foo_kubernetes"));
        assert_eq!(cc.catalog().index_by_path.len(), 1);
    }

    #[test]
    fn test_contexts_are_isolated() {
        let fx = Fixture::new();
        let mut standalone = fx.open("");
        standalone
            .upsert(&plugin("login", Target::Global, "v1.0.0"))
            .unwrap();
        let mut server = fx.open("prod");
        server
            .upsert(&plugin("cluster", Target::Kubernetes, "v1.0.0"))
            .unwrap();

        assert_eq!(fx.open("").list().len(), 1);
        assert_eq!(fx.open("prod").list().len(), 1);
        assert!(fx.open("prod").get("login_global").is_none());
        assert!(fx.open("unused").list().is_empty());
    }

    #[test]
    fn test_delete_keeps_installation_indices() {
        let fx = Fixture::new();
        let mut cc = fx.open("");
        let p = plugin("login", Target::Global, "v1.0.0");
        cc.upsert(&p).unwrap();

        cc.delete("login_global").unwrap();

        assert!(cc.get("login_global").is_none());
        let reopened = fx.open("");
        assert!(reopened.list().is_empty());
        assert!(reopened
            .catalog()
            .index_by_path
            .contains_key(&p.installation_path));
        assert_eq!(reopened.catalog().index_by_name["login_global"].len(), 1);
    }

    #[test]
    fn test_delete_absent_key_is_noop_and_persists() {
        let fx = Fixture::new();
        let mut cc = fx.open("");
        assert!(!fx.store.path().exists());
        cc.delete("missing").unwrap();
        assert!(fx.store.path().exists());
    }

    #[test]
    fn test_open_corrupt_store_is_unavailable() {
        let fx = Fixture::new();
        fs::write(fx.store.path(), "indexByPath: [not, a, map").unwrap();
        let err = ContextCatalog::open(fx.store.clone(), "").expect_err("corrupt cache");
        assert!(matches!(err, Error::StoreUnavailable(_)));
    }

    #[test]
    fn test_mutation_keeps_concurrent_writes() {
        let fx = Fixture::new();
        let mut first = fx.open("");
        let mut second = fx.open("");

        first
            .upsert(&plugin("login", Target::Global, "v1.0.0"))
            .unwrap();
        second
            .upsert(&plugin("package", Target::Kubernetes, "v1.0.0"))
            .unwrap();

        let keys: Vec<_> = fx.open("").list().into_iter().map(|p| p.key()).collect();
        assert_eq!(keys.len(), 2, "{keys:?}");
    }

    #[test]
    fn test_upsert_multiple_versions_same_key() {
        let fx = Fixture::new();
        let mut cc = fx.open("");
        for version in ["v1.0.0", "v1.1.0", "v2.0.0"] {
            cc.upsert(&plugin("apps", Target::Kubernetes, version))
                .unwrap();
        }
        let catalog = cc.catalog();
        assert_eq!(catalog.index_by_name["apps_kubernetes"].len(), 3);
        assert_eq!(catalog.index_by_path.len(), 3);
        assert_eq!(cc.get("apps_kubernetes").unwrap().version, "v2.0.0");
    }
}
