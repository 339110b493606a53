//! Panel error types.
//!
//! Each layer has its own enum: the store and the geo locator report what
//! went wrong on their side, and [`PanelError`] is what the service hands to
//! the HTTP layer.

use thiserror::Error;

/// Storage-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Underlying database error
    #[error("database error: {0}")]
    Database(String),

    /// Unique constraint hit (duplicate node id)
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Update issued without any column to set
    #[error("no columns to update")]
    EmptyUpdate,

    /// A stored row could not be mapped back to an entry
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

/// Geo lookup failures (DNS or the geo-IP API).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeoError {
    #[error("failed to resolve {host}: {reason}")]
    Resolve { host: String, reason: String },

    #[error("no address found for {0}")]
    NoAddress(String),

    #[error("geo-ip request failed: {0}")]
    Request(String),

    #[error("geo-ip service returned status {0}")]
    Status(u16),

    #[error("invalid geo-ip response: {0}")]
    Decode(String),
}

/// Errors surfaced by [`crate::PanelService`].
#[derive(Debug, Error)]
pub enum PanelError {
    /// Request failed validation
    #[error("{0}")]
    InvalidInput(String),

    /// Modify request carried nothing to change
    #[error("No fields to update")]
    NoFieldsToUpdate,

    /// Addressed entry does not exist
    #[error("{0}")]
    NotFound(String),

    /// Subscription requested while the table is empty
    #[error("No entries found for subscription")]
    EmptySubscription,

    /// Address could not be resolved or geolocated
    #[error("Failed to get IP info: {0}")]
    GeoLookup(#[from] GeoError),

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PanelError {
    pub fn entry_not_found() -> Self {
        PanelError::NotFound("Entry not found".into())
    }

    pub fn node_not_found() -> Self {
        PanelError::NotFound("Node ID not found".into())
    }
}

/// Result type for service operations
pub type PanelResult<T> = Result<T, PanelError>;

/// Failures while wiring the production adapters at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to open database {location}: {source}")]
    Store {
        location: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to build geo-ip client: {0}")]
    GeoClient(#[source] GeoError),
}
