//! Pure domain logic: the node entry, request shapes, errors and the
//! subscription formatter. Nothing in here performs I/O.

pub mod entry;
pub mod error;
pub mod response;
pub mod subscription;

pub use entry::{Entry, EntryPatch, GeoInfo, ModifyRequest, NewEntry, DEFAULT_VERSION};
pub use error::{GeoError, PanelError, PanelResult, StartupError, StoreError};
pub use response::{ApiResponse, ResponseStatus};
