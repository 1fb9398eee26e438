//! HTTP, WebSocket and SSE surface

pub mod handlers;
pub mod server;
pub mod sse;
pub mod ws;

pub use handlers::{dispatch_message, Dispatched};
pub use server::{build_router, run, AppContext};
