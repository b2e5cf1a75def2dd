//! Local catalog of installed plugins.
//!
//! The catalog is a single YAML cache file recording every installed plugin
//! binary, indexed by installation path and by `name_target` key, plus which
//! binary is active for the stand-alone scope and for each server context.
//! All access goes through a [`ContextCatalog`].

pub mod catalog;
pub mod context;
pub mod error;
pub mod store;

pub use {
    catalog::{Catalog, PluginAssociation, Scope, reconcile_legacy_target},
    context::ContextCatalog,
    error::{Error, Result},
    store::{CATALOG_CACHE_FILE_NAME, CatalogStore},
};
