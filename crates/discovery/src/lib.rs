//! Plugin discovery: backends listing installable plugins and the
//! normalization that turns their payloads into [`Discovered`] records.

pub mod discovery;
pub mod error;
pub mod factory;
pub mod gcp;
pub mod kubernetes;
pub mod local;
pub mod normalize;
pub mod oci;
pub mod rest;
pub mod types;
pub mod version;

pub use {
    discovery::{Discovery, SourceListing, discover_all, list_with_cancel},
    error::{Error, Result},
    factory::{Collaborators, from_source, from_sources},
    gcp::{BucketReader, GcpLegacyDiscovery},
    kubernetes::{ClusterClient, ClusterConnector, KubernetesDiscovery},
    local::LocalDiscovery,
    oci::{ImageFetcher, ImageFile, OciDiscovery},
    rest::RestDiscovery,
    types::{Artifact, ArtifactList, Discovered, Distribution},
    version::{VersionError, compare_versions, latest_version, parse_version, sort_versions},
};
