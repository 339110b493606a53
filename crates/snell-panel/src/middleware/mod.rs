//! Middleware stack for the panel.
//!
//! Layer order: Request → Cors → Trace → Timeout → BodyLimit → TokenAuth (protected routes) → Handler

pub mod auth;
pub mod cors;
pub mod trace;

pub use auth::{constant_time_compare, TokenAuthLayer};
pub use cors::create_cors_layer;
pub use trace::RequestTraceLayer;
