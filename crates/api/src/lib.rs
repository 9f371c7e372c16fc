//! FloraChat API Library
//!
//! This crate contains the hosted chat service: the WebSocket relay, the
//! transcript REST surface, and the server-side auto-reply responder.

pub mod config;
pub mod error;
pub mod relay;
pub mod responder;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
