//! HTTP API module.
//!
//! The HTTP server, its request/response types, and the log channel shared
//! by the pipeline and the SSE endpoint.

pub mod server;
pub mod types;
pub mod logs;

pub use server::{router, start_server};
pub use types::*;
pub use logs::*;
