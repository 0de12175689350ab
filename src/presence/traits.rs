use async_trait::async_trait;

use crate::resolver::ResolvedStatus;

/// A channel the resolved status is broadcast through.
///
/// Broadcasting is best effort: implementations log failures and never
/// propagate them, so one misbehaving channel cannot take the poller down.
#[async_trait]
pub trait PresenceProvider: Send + Sync {
    /// Returns the name of this presence provider (for logging)
    fn name(&self) -> &'static str;

    /// Publish a new status.
    async fn update(&self, status: &ResolvedStatus);

    /// Clear any currently displayed status.
    async fn clear(&self);
}
