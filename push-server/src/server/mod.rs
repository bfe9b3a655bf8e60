//! Push endpoint module.
//!
//! This module provides the HTTP surface the platform talks to:
//! - Signature verification of every request
//! - A pool of reusable per-request scratch buffers
//! - Routing of decoded messages to a [`MessageHandler`]
//!
//! ## Request flow
//!
//! ```text
//! request → credentials → acquire scratch → verify → read + decode → dispatch → release
//! ```

pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod pool;
pub mod query;
pub mod signature;

pub use dispatch::{dispatch, dispatch_envelope, no_reply, MessageHandler, RequestMeta};
pub use error::RequestError;
pub use handlers::{delivery, handshake, health, router, HealthResponse, PushServer};
pub use pool::{ScratchGuard, ScratchPool, ScratchUnit};
pub use query::{parse_credentials, Credentials};
pub use signature::{compute_signature, verify_signature};
