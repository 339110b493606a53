//! Port traits (driven side) for the panel service.

pub mod outbound;

pub use outbound::{EntryStore, GeoLocator, NodeIdGenerator};
