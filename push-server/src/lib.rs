//! wxpush - Inbound push endpoint for WeChat official accounts.
//!
//! The platform calls one configured URL:
//! - `GET` once to verify the server owns the shared token
//! - `POST` for every message and event, as a signed XML envelope
//!
//! ## Architecture
//!
//! ```text
//! HTTP → server::handlers → signature check → message::decode_envelope → server::dispatch → MessageHandler
//! ```

pub mod config;
pub mod message;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use message::{Envelope, Message};
pub use server::{router, MessageHandler, PushServer, RequestError, RequestMeta};
