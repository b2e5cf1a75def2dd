//! Plugin identity types shared by the catalog and discovery crates.

pub mod plugin;
pub mod target;

pub use {
    plugin::{PluginInfo, plugin_name_target},
    target::Target,
};
