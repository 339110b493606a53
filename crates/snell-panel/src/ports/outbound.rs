//! # Outbound Ports (Driven Ports)
//!
//! Dependencies required by [`crate::PanelService`].
//!
//! Production: `SqliteEntryStore`, `IpSbLocator`, `UuidNodeIds`
//! Testing: `InMemoryEntryStore`, `StaticLocator`, `SequentialNodeIds`

use async_trait::async_trait;

use crate::domain::entry::{Entry, EntryPatch, GeoInfo};
use crate::domain::error::{GeoError, StoreError};

/// Relational storage for node entries.
///
/// Calls are blocking; the service runs them on the blocking pool.
pub trait EntryStore: Send + Sync {
    /// Insert an entry. `entry.id` is ignored and the stored row, with its
    /// assigned id, is returned.
    fn insert(&self, entry: Entry) -> Result<Entry, StoreError>;

    /// All entries in ascending id order.
    fn list(&self) -> Result<Vec<Entry>, StoreError>;

    fn find_by_node_id(&self, node_id: &str) -> Result<Option<Entry>, StoreError>;

    /// Delete every entry whose stored address equals `ip`. Returns rows removed.
    fn delete_by_ip(&self, ip: &str) -> Result<usize, StoreError>;

    /// Returns rows removed (0 or 1).
    fn delete_by_node_id(&self, node_id: &str) -> Result<usize, StoreError>;

    /// Apply the columns present in `patch`. Returns rows affected.
    fn update_by_node_id(&self, node_id: &str, patch: &EntryPatch) -> Result<usize, StoreError>;
}

/// Resolves an address (IP literal or domain) and geolocates it.
#[async_trait]
pub trait GeoLocator: Send + Sync {
    async fn locate(&self, host: &str) -> Result<GeoInfo, GeoError>;
}

/// Source of node identifiers.
pub trait NodeIdGenerator: Send + Sync {
    fn generate(&self) -> String;
}
