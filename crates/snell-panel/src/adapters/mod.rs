//! Adapters for the panel's outbound ports.
//!
//! Production: SQLite storage, HTTP geo-ip lookup, UUID node ids.
//! Testing: in-memory store, static locator, sequential ids.

pub mod geoip;
pub mod memory;
pub mod sqlite;

pub use geoip::{resolve_host, IpSbLocator};
pub use memory::{InMemoryEntryStore, SequentialNodeIds, StaticLocator};
pub use sqlite::SqliteEntryStore;

use crate::ports::outbound::NodeIdGenerator;

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidNodeIds;

impl NodeIdGenerator for UuidNodeIds {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
