#[cfg(test)]
use mockall::automock;

use crate::CacheKeyPrefix;

/// The local query cache the dashboard renders from.
///
/// The cache is not owned here. The only mutation this crate performs on it
/// is "invalidate, then refetch whatever is active" for a key prefix; both
/// calls are fire-and-forget and any failure is the cache's own concern.
#[cfg_attr(test, automock)]
pub trait QueryCache: Send + Sync + 'static {
    /// Mark every query under `prefix` stale
    fn invalidate(
        &self,
        prefix: &CacheKeyPrefix,
    );

    /// Refetch the queries under `prefix` that currently have observers
    fn refetch_active(
        &self,
        prefix: &CacheKeyPrefix,
    );
}
