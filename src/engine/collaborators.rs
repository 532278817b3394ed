use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::task::JoinHandle;

use crate::FeatureInfo;
use crate::PeerId;
use crate::Result;

/// Peer feature-discovery collaborator.
///
/// Issues live feature queries over the transport and tracks per-peer
/// resolution results so later feature queries for a peer observe them
/// without re-querying.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DiscoClient: Send + Sync + 'static {
    /// Query `peer` for the feature description behind `node`.
    ///
    /// `require_fresh` bypasses any transport-level response cache.
    /// Transport and timeout failures are propagated, not retried here.
    async fn query_info(
        &self,
        peer: &PeerId,
        node: &str,
        require_fresh: bool,
    ) -> Result<FeatureInfo>;

    /// Associate an in-flight resolution with `peer`
    fn set_info_future(
        &self,
        peer: &PeerId,
        task: JoinHandle<Result<FeatureInfo>>,
    );
}

/// Advertisement-endpoint collaborator.
///
/// Mounts node locators that answer peer queries with the local feature
/// description. `mount`/`unmount` are synchronous and idempotent per
/// distinct locator.
#[cfg_attr(test, automock)]
pub trait AdvertisementRegistry: Send + Sync + 'static {
    /// Snapshot of the currently advertised local feature description
    fn local_info(&self) -> FeatureInfo;

    fn mount(
        &self,
        node: &str,
        info: FeatureInfo,
    );

    fn unmount(
        &self,
        node: &str,
    );
}
