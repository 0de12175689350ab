pub mod archive;
pub mod bungie;
pub mod config;
pub mod definitions;
pub mod manifest;
pub mod poller;
pub mod presence;
pub mod resolver;
pub mod snapshot;

#[cfg(test)]
mod testutil;

pub use config::AppConfig;
pub use manifest::ManifestCache;
pub use poller::PresencePoller;
pub use resolver::ResolvedStatus;
pub use snapshot::SnapshotProvider;
