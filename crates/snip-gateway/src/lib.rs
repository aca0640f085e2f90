//! HTTP transport for the snip URL store.
//!
//! The router translates JSON requests into [`snip_store::Shortener`] calls
//! and store errors into status codes.

pub mod app;
pub mod cli;
pub mod error;
pub mod handlers;
pub mod model;
pub mod server;
pub mod state;
pub mod telemetry;

pub use app::App;
pub use state::AppState;
