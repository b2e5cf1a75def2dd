//! The capability every discovery backend provides.

use {
    async_trait::async_trait, futures::future::join_all, plugctl_config::DiscoveryType,
    tokio_util::sync::CancellationToken, tracing::warn,
};

use crate::{
    error::{Error, Result},
    types::Discovered,
};

/// A source of installable plugins.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Name of the configured discovery source.
    fn name(&self) -> &str;

    fn discovery_type(&self) -> DiscoveryType;

    /// List every plugin this source offers.
    async fn list(&self) -> Result<Vec<Discovered>>;
}

/// Run `discovery.list()` unless `cancel` fires first.
///
/// A cancelled call yields [`Error::Cancelled`], never a partial listing.
pub async fn list_with_cancel(
    discovery: &dyn Discovery,
    cancel: &CancellationToken,
) -> Result<Vec<Discovered>> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        result = discovery.list() => result,
    }
}

/// Outcome of listing one source in [`discover_all`].
#[derive(Debug)]
pub struct SourceListing {
    pub source: String,
    pub result: Result<Vec<Discovered>>,
}

/// List every source concurrently. One failing source does not affect the
/// others; each outcome is reported separately, in input order.
pub async fn discover_all(
    sources: &[Box<dyn Discovery>],
    cancel: &CancellationToken,
) -> Vec<SourceListing> {
    let listings = sources.iter().map(|d| async move {
        let result = list_with_cancel(d.as_ref(), cancel).await;
        if let Err(e) = &result {
            warn!(
                source = d.name(),
                kind = %d.discovery_type(),
                error = %e,
                "plugin discovery failed"
            );
        }
        SourceListing {
            source: d.name().to_string(),
            result,
        }
    });
    join_all(listings).await
}
