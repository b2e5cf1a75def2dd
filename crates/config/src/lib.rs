//! Configuration for plugin discovery and the local catalog.
//!
//! Values are resolved once at startup with the precedence
//! explicit config file > `PLUGCTL_*` environment > built-in defaults,
//! and the resulting [`Settings`] is threaded through explicitly.

pub mod settings;
pub mod source;
pub mod trust;

pub use {
    settings::{
        DEFAULT_CENTRAL_DISCOVERY_IMAGE, DEFAULT_STANDALONE_DISCOVERY_NAME, Settings, SettingsFile,
        env_keys,
    },
    source::{
        DiscoverySource, DiscoveryType, GcpSource, KubernetesSource, LocalSource, OciSource,
        RestSource, contains_name, default_standalone_discovery,
        populate_default_standalone_discovery,
    },
    trust::{
        is_trusted_artifact_uri, is_trusted_image, trusted_artifact_locations, trusted_registries,
    },
};
