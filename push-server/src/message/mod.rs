//! Inbound message model.
//!
//! This module provides:
//! - The flattened [`Envelope`] decode target
//! - A streaming XML decoder that fills it in place
//! - The narrow typed shapes and the [`Message`] sum type built from it
//!
//! ## Flow
//!
//! ```text
//! body bytes → decode_envelope() → Envelope → Message::from_envelope() → Message
//! ```

pub mod decoder;
pub mod envelope;
pub mod types;

pub use decoder::{decode_envelope, DecodeError};
pub use envelope::Envelope;
pub use types::{
    CommonHead, Image, Link, Location, LocationEvent, MassSendJobFinishEvent, MenuClickEvent,
    MenuViewEvent, MerchantOrderEvent, Message, ScanEvent, SubscribeByScanEvent, SubscribeEvent,
    Text, UnsubscribeEvent, Video, Voice,
};

/// Values of the `MsgType` element.
pub mod msg_type {
    pub const TEXT: &str = "text";
    pub const IMAGE: &str = "image";
    pub const VOICE: &str = "voice";
    pub const VIDEO: &str = "video";
    pub const LINK: &str = "link";
    pub const LOCATION: &str = "location";
    pub const EVENT: &str = "event";
}

/// Values of the `Event` element when `MsgType` is `event`.
pub mod event_type {
    pub const CLICK: &str = "CLICK";
    pub const VIEW: &str = "VIEW";
    pub const LOCATION: &str = "LOCATION";
    pub const MERCHANT_ORDER: &str = "merchant_order";
    pub const SUBSCRIBE: &str = "subscribe";
    pub const UNSUBSCRIBE: &str = "unsubscribe";
    pub const SCAN: &str = "SCAN";
    pub const MASS_SEND_JOB_FINISH: &str = "MASSSENDJOBFINISH";
}
