//! Narrow typed shapes for each message and event the endpoint routes.
//!
//! Every shape is built by copying the relevant fields out of an
//! [`Envelope`]; the envelope itself stays in the scratch pool.

use serde::Serialize;

use super::envelope::Envelope;
use super::{event_type, msg_type};

/// Fields present on every envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommonHead {
    /// Developer account the message was sent to
    pub to_user_name: String,
    /// OpenID of the sending user
    pub from_user_name: String,
    /// Unix timestamp set by the platform
    pub create_time: i64,
    pub msg_type: String,
}

impl CommonHead {
    fn from_envelope(env: &Envelope) -> Self {
        Self {
            to_user_name: env.to_user_name.clone(),
            from_user_name: env.from_user_name.clone(),
            create_time: env.create_time,
            msg_type: env.msg_type.clone(),
        }
    }
}

// =============================================================================
// Ordinary messages
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Text {
    #[serde(flatten)]
    pub head: CommonHead,
    pub msg_id: i64,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    #[serde(flatten)]
    pub head: CommonHead,
    pub msg_id: i64,
    pub media_id: String,
    pub pic_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Voice {
    #[serde(flatten)]
    pub head: CommonHead,
    pub msg_id: i64,
    pub media_id: String,
    /// Audio codec, e.g. `amr` or `speex`
    pub format: String,
    /// Speech recognition result, empty unless enabled on the account
    pub recognition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Video {
    #[serde(flatten)]
    pub head: CommonHead,
    pub msg_id: i64,
    pub media_id: String,
    pub thumb_media_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    #[serde(flatten)]
    pub head: CommonHead,
    pub msg_id: i64,
    pub title: String,
    pub description: String,
    pub url: String,
}

/// A location shared by the user in chat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    #[serde(flatten)]
    pub head: CommonHead,
    pub msg_id: i64,
    /// Latitude
    pub location_x: f64,
    /// Longitude
    pub location_y: f64,
    /// Map zoom level
    pub scale: i32,
    pub label: String,
}

// =============================================================================
// Events
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuClickEvent {
    #[serde(flatten)]
    pub head: CommonHead,
    pub event: String,
    /// Key configured on the menu button
    pub event_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuViewEvent {
    #[serde(flatten)]
    pub head: CommonHead,
    pub event: String,
    /// URL the menu button opened
    pub event_key: String,
}

/// Periodic location report for users who allowed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationEvent {
    #[serde(flatten)]
    pub head: CommonHead,
    pub event: String,
    pub latitude: f64,
    pub longitude: f64,
    pub precision: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantOrderEvent {
    #[serde(flatten)]
    pub head: CommonHead,
    pub event: String,
    pub order_id: String,
    pub order_status: i32,
    pub product_id: String,
    pub sku_info: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscribeEvent {
    #[serde(flatten)]
    pub head: CommonHead,
    pub event: String,
}

/// Subscription made by scanning a parametric QR code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscribeByScanEvent {
    #[serde(flatten)]
    pub head: CommonHead,
    pub event: String,
    /// `qrscene_` followed by the scene value
    pub event_key: String,
    pub ticket: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnsubscribeEvent {
    #[serde(flatten)]
    pub head: CommonHead,
    pub event: String,
}

/// Already-subscribed user scanned a parametric QR code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanEvent {
    #[serde(flatten)]
    pub head: CommonHead,
    pub event: String,
    pub event_key: String,
    pub ticket: String,
}

/// Result report for a mass-send job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MassSendJobFinishEvent {
    #[serde(flatten)]
    pub head: CommonHead,
    pub event: String,
    /// Job id, sent on the wire as `MsgID`
    pub msg_id: i64,
    /// e.g. `send success`, `send fail`, `err(10001)`
    pub status: String,
    pub total_count: i32,
    pub filter_count: i32,
    pub sent_count: i32,
    pub error_count: i32,
}

// =============================================================================
// Routing
// =============================================================================

/// Every delivery the endpoint can route, one variant per handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Text(Text),
    Image(Image),
    Voice(Voice),
    Video(Video),
    Link(Link),
    Location(Location),
    MenuClick(MenuClickEvent),
    MenuView(MenuViewEvent),
    LocationEvent(LocationEvent),
    MerchantOrder(MerchantOrderEvent),
    Subscribe(SubscribeEvent),
    SubscribeByScan(SubscribeByScanEvent),
    Unsubscribe(UnsubscribeEvent),
    Scan(ScanEvent),
    MassSendJobFinish(MassSendJobFinishEvent),
    /// Unrecognized `MsgType`/`Event`; carries an owned copy of the raw body.
    Unknown(Vec<u8>),
}

impl Message {
    /// Project a decoded envelope into the matching narrow shape.
    ///
    /// `raw` is the body the envelope was decoded from. It is only read on
    /// the unknown path, where it is copied so the result never borrows
    /// pooled memory.
    pub fn from_envelope(env: &Envelope, raw: &[u8]) -> Self {
        let head = || CommonHead::from_envelope(env);

        match env.msg_type.as_str() {
            msg_type::EVENT => Self::from_event(env, raw),
            msg_type::TEXT => Message::Text(Text {
                head: head(),
                msg_id: env.msg_id,
                content: env.content.clone(),
            }),
            msg_type::IMAGE => Message::Image(Image {
                head: head(),
                msg_id: env.msg_id,
                media_id: env.media_id.clone(),
                pic_url: env.pic_url.clone(),
            }),
            msg_type::VOICE => Message::Voice(Voice {
                head: head(),
                msg_id: env.msg_id,
                media_id: env.media_id.clone(),
                format: env.format.clone(),
                recognition: env.recognition.clone(),
            }),
            msg_type::VIDEO => Message::Video(Video {
                head: head(),
                msg_id: env.msg_id,
                media_id: env.media_id.clone(),
                thumb_media_id: env.thumb_media_id.clone(),
            }),
            msg_type::LINK => Message::Link(Link {
                head: head(),
                msg_id: env.msg_id,
                title: env.title.clone(),
                description: env.description.clone(),
                url: env.url.clone(),
            }),
            msg_type::LOCATION => Message::Location(Location {
                head: head(),
                msg_id: env.msg_id,
                location_x: env.location_x,
                location_y: env.location_y,
                scale: env.scale,
                label: env.label.clone(),
            }),
            _ => Message::Unknown(raw.to_vec()),
        }
    }

    fn from_event(env: &Envelope, raw: &[u8]) -> Self {
        let head = CommonHead::from_envelope(env);
        let event = env.event.clone();

        match env.event.as_str() {
            event_type::CLICK => Message::MenuClick(MenuClickEvent {
                head,
                event,
                event_key: env.event_key.clone(),
            }),
            event_type::VIEW => Message::MenuView(MenuViewEvent {
                head,
                event,
                event_key: env.event_key.clone(),
            }),
            event_type::LOCATION => Message::LocationEvent(LocationEvent {
                head,
                event,
                latitude: env.latitude,
                longitude: env.longitude,
                precision: env.precision,
            }),
            event_type::MERCHANT_ORDER => Message::MerchantOrder(MerchantOrderEvent {
                head,
                event,
                order_id: env.order_id.clone(),
                order_status: env.order_status,
                product_id: env.product_id.clone(),
                sku_info: env.sku_info.clone(),
            }),
            event_type::SUBSCRIBE if env.ticket.is_empty() => {
                Message::Subscribe(SubscribeEvent { head, event })
            }
            event_type::SUBSCRIBE => Message::SubscribeByScan(SubscribeByScanEvent {
                head,
                event,
                event_key: env.event_key.clone(),
                ticket: env.ticket.clone(),
            }),
            event_type::UNSUBSCRIBE => Message::Unsubscribe(UnsubscribeEvent { head, event }),
            event_type::SCAN => Message::Scan(ScanEvent {
                head,
                event,
                event_key: env.event_key.clone(),
                ticket: env.ticket.clone(),
            }),
            event_type::MASS_SEND_JOB_FINISH => {
                Message::MassSendJobFinish(MassSendJobFinishEvent {
                    head,
                    event,
                    msg_id: env.job_msg_id,
                    status: env.status.clone(),
                    total_count: env.total_count,
                    filter_count: env.filter_count,
                    sent_count: env.sent_count,
                    error_count: env.error_count,
                })
            }
            _ => Message::Unknown(raw.to_vec()),
        }
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Text(_) => "text",
            Message::Image(_) => "image",
            Message::Voice(_) => "voice",
            Message::Video(_) => "video",
            Message::Link(_) => "link",
            Message::Location(_) => "location",
            Message::MenuClick(_) => "menu_click",
            Message::MenuView(_) => "menu_view",
            Message::LocationEvent(_) => "location_event",
            Message::MerchantOrder(_) => "merchant_order",
            Message::Subscribe(_) => "subscribe",
            Message::SubscribeByScan(_) => "subscribe_by_scan",
            Message::Unsubscribe(_) => "unsubscribe",
            Message::Scan(_) => "scan",
            Message::MassSendJobFinish(_) => "mass_send_job_finish",
            Message::Unknown(_) => "unknown",
        }
    }
}
