//! Builds discovery backends from configured sources.

use std::sync::Arc;

use plugctl_config::DiscoverySource;

use crate::{
    discovery::Discovery,
    error::{Error, Result},
    gcp::{BucketReader, GcpLegacyDiscovery},
    kubernetes::{ClusterConnector, KubernetesDiscovery},
    local::LocalDiscovery,
    oci::{ImageFetcher, OciDiscovery},
    rest::RestDiscovery,
};

/// External clients backends may need. Sources whose client is absent cannot
/// be built.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub cluster: Option<Arc<dyn ClusterConnector>>,
    pub images: Option<Arc<dyn ImageFetcher>>,
    pub buckets: Option<Arc<dyn BucketReader>>,
}

fn missing(source: &DiscoverySource) -> Error {
    Error::MissingCollaborator {
        kind: source.discovery_type().to_string(),
        name: source.name().to_string(),
    }
}

/// Create the backend serving `source`.
pub fn from_source(
    source: &DiscoverySource,
    collaborators: &Collaborators,
) -> Result<Box<dyn Discovery>> {
    let discovery: Box<dyn Discovery> = match source {
        DiscoverySource::Local(s) => Box::new(LocalDiscovery::new(&s.name, &s.path)),
        DiscoverySource::Rest(s) => {
            Box::new(RestDiscovery::new(&s.name, &s.endpoint, &s.base_path)?)
        },
        DiscoverySource::Oci(s) => {
            let fetcher = collaborators.images.clone().ok_or_else(|| missing(source))?;
            Box::new(OciDiscovery::new(&s.name, &s.image, fetcher))
        },
        DiscoverySource::Kubernetes(s) => {
            let connector = collaborators.cluster.as_ref().ok_or_else(|| missing(source))?;
            let client = connector.connect(&s.path, &s.context)?;
            Box::new(KubernetesDiscovery::new(&s.name, client))
        },
        DiscoverySource::Gcp(s) => {
            let reader = collaborators.buckets.clone().ok_or_else(|| missing(source))?;
            Box::new(GcpLegacyDiscovery::new(
                &s.name,
                &s.bucket,
                &s.manifest_path,
                reader,
            ))
        },
    };
    Ok(discovery)
}

/// Create backends for every source, in order.
pub fn from_sources(
    sources: &[DiscoverySource],
    collaborators: &Collaborators,
) -> Result<Vec<Box<dyn Discovery>>> {
    sources
        .iter()
        .map(|s| from_source(s, collaborators))
        .collect()
}
