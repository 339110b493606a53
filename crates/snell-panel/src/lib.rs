//! Snell Panel - node registry and subscription renderer.
//!
//! A small HTTP service that keeps a table of Snell proxy nodes (address,
//! port, pre-shared key and geolocation metadata) and renders them into a
//! Surge-style subscription document.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        HTTP (axum)                            │
//! │   Cors → Trace → Timeout → BodyLimit → TokenAuth → Handler    │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │
//!                       ┌────────┴────────┐
//!                       │  PanelService   │
//!                       └───┬─────────┬───┘
//!                           │         │
//!                 EntryStore│         │GeoLocator
//!                           ▼         ▼
//!                  SQLite (rusqlite)  DNS + ip.sb (reqwest)
//! ```
//!
//! # Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - entities, request types, errors, subscription formatting
//! - `ports/` - outbound traits the service depends on
//! - `adapters/` - SQLite store, geo-IP client, in-memory doubles
//! - `service.rs` - application service implementing the operations
//! - `http/` and `middleware/` - router, handlers, auth/trace/CORS layers
//!
//! # Usage
//!
//! ```ignore
//! use snell_panel::{build_router, Config, PanelService};
//!
//! let config = Config::from_args();
//! let service = PanelService::from_config(&config)?;
//! let router = build_router(Arc::new(service), config.http_settings());
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod http;
pub mod middleware;
pub mod ports;
pub mod service;

pub use config::{Config, ConfigError};
pub use domain::entry::{Entry, EntryPatch, GeoInfo, ModifyRequest, NewEntry};
pub use domain::error::{GeoError, PanelError, PanelResult, StartupError, StoreError};
pub use domain::response::{ApiResponse, ResponseStatus};
pub use http::{build_router, AppState, HttpSettings};
pub use ports::outbound::{EntryStore, GeoLocator, NodeIdGenerator};
pub use service::PanelService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
