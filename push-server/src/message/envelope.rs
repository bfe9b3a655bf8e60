//! Flattened superset record for every inbound message and event shape.
//!
//! The platform sends one XML document per delivery. Which fields are
//! present depends on `MsgType` and `Event`; this record has room for all of
//! them so a single decode target can be reused across requests.

/// Union of every field that appears in any message or event envelope.
///
/// Numeric fields are zero and string fields empty when the element was not
/// present in the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    // Common head
    pub to_user_name: String,
    pub from_user_name: String,
    pub create_time: i64,
    pub msg_type: String,

    /// `MsgId` on ordinary messages
    pub msg_id: i64,
    /// `MsgID` on the mass-send completion event
    pub job_msg_id: i64,

    pub content: String,

    pub event: String,
    pub event_key: String,
    pub ticket: String,

    pub latitude: f64,
    pub longitude: f64,
    pub precision: f64,

    pub order_id: String,
    pub order_status: i32,
    pub product_id: String,
    pub sku_info: String,

    pub status: String,
    pub total_count: i32,
    pub filter_count: i32,
    pub sent_count: i32,
    pub error_count: i32,

    pub title: String,
    pub description: String,
    pub url: String,

    pub media_id: String,
    pub format: String,
    pub recognition: String,
    pub thumb_media_id: String,
    pub pic_url: String,

    pub location_x: f64,
    pub location_y: f64,
    pub scale: i32,
    pub label: String,
}

impl Envelope {
    /// Clear every field back to empty/zero, keeping string capacity.
    pub fn reset(&mut self) {
        for s in [
            &mut self.to_user_name,
            &mut self.from_user_name,
            &mut self.msg_type,
            &mut self.content,
            &mut self.event,
            &mut self.event_key,
            &mut self.ticket,
            &mut self.order_id,
            &mut self.product_id,
            &mut self.sku_info,
            &mut self.status,
            &mut self.title,
            &mut self.description,
            &mut self.url,
            &mut self.media_id,
            &mut self.format,
            &mut self.recognition,
            &mut self.thumb_media_id,
            &mut self.pic_url,
            &mut self.label,
        ] {
            s.clear();
        }

        self.create_time = 0;
        self.msg_id = 0;
        self.job_msg_id = 0;
        self.latitude = 0.0;
        self.longitude = 0.0;
        self.precision = 0.0;
        self.order_status = 0;
        self.total_count = 0;
        self.filter_count = 0;
        self.sent_count = 0;
        self.error_count = 0;
        self.location_x = 0.0;
        self.location_y = 0.0;
        self.scale = 0;
    }
}

/// An element of the envelope the decoder knows how to store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    ToUserName,
    FromUserName,
    CreateTime,
    MsgType,
    MsgId,
    JobMsgId,
    Content,
    Event,
    EventKey,
    Ticket,
    Latitude,
    Longitude,
    Precision,
    OrderId,
    OrderStatus,
    ProductId,
    SkuInfo,
    Status,
    TotalCount,
    FilterCount,
    SentCount,
    ErrorCount,
    Title,
    Description,
    Url,
    MediaId,
    Format,
    Recognition,
    ThumbMediaId,
    PicUrl,
    LocationX,
    LocationY,
    Scale,
    Label,
}

impl Field {
    /// Map a wire element name to a field. Names are case-sensitive, so
    /// `MsgId` and `MsgID` are distinct.
    pub(crate) fn from_tag(tag: &[u8]) -> Option<Self> {
        let field = match tag {
            b"ToUserName" => Field::ToUserName,
            b"FromUserName" => Field::FromUserName,
            b"CreateTime" => Field::CreateTime,
            b"MsgType" => Field::MsgType,
            b"MsgId" => Field::MsgId,
            b"MsgID" => Field::JobMsgId,
            b"Content" => Field::Content,
            b"Event" => Field::Event,
            b"EventKey" => Field::EventKey,
            b"Ticket" => Field::Ticket,
            b"Latitude" => Field::Latitude,
            b"Longitude" => Field::Longitude,
            b"Precision" => Field::Precision,
            b"OrderId" => Field::OrderId,
            b"OrderStatus" => Field::OrderStatus,
            b"ProductId" => Field::ProductId,
            b"SkuInfo" => Field::SkuInfo,
            b"Status" => Field::Status,
            b"TotalCount" => Field::TotalCount,
            b"FilterCount" => Field::FilterCount,
            b"SentCount" => Field::SentCount,
            b"ErrorCount" => Field::ErrorCount,
            b"Title" => Field::Title,
            b"Description" => Field::Description,
            b"Url" => Field::Url,
            b"MediaId" => Field::MediaId,
            b"Format" => Field::Format,
            b"Recognition" => Field::Recognition,
            b"ThumbMediaId" => Field::ThumbMediaId,
            b"PicUrl" => Field::PicUrl,
            b"Location_X" => Field::LocationX,
            b"Location_Y" => Field::LocationY,
            b"Scale" => Field::Scale,
            b"Label" => Field::Label,
            _ => return None,
        };
        Some(field)
    }

    /// Wire element name, used in decode error messages.
    pub(crate) fn tag(self) -> &'static str {
        match self {
            Field::ToUserName => "ToUserName",
            Field::FromUserName => "FromUserName",
            Field::CreateTime => "CreateTime",
            Field::MsgType => "MsgType",
            Field::MsgId => "MsgId",
            Field::JobMsgId => "MsgID",
            Field::Content => "Content",
            Field::Event => "Event",
            Field::EventKey => "EventKey",
            Field::Ticket => "Ticket",
            Field::Latitude => "Latitude",
            Field::Longitude => "Longitude",
            Field::Precision => "Precision",
            Field::OrderId => "OrderId",
            Field::OrderStatus => "OrderStatus",
            Field::ProductId => "ProductId",
            Field::SkuInfo => "SkuInfo",
            Field::Status => "Status",
            Field::TotalCount => "TotalCount",
            Field::FilterCount => "FilterCount",
            Field::SentCount => "SentCount",
            Field::ErrorCount => "ErrorCount",
            Field::Title => "Title",
            Field::Description => "Description",
            Field::Url => "Url",
            Field::MediaId => "MediaId",
            Field::Format => "Format",
            Field::Recognition => "Recognition",
            Field::ThumbMediaId => "ThumbMediaId",
            Field::PicUrl => "PicUrl",
            Field::LocationX => "Location_X",
            Field::LocationY => "Location_Y",
            Field::Scale => "Scale",
            Field::Label => "Label",
        }
    }
}

/// Where a decoded value lands inside an [`Envelope`].
pub(crate) enum Slot<'a> {
    Text(&'a mut String),
    Int64(&'a mut i64),
    Int32(&'a mut i32),
    Float(&'a mut f64),
}

impl Envelope {
    pub(crate) fn slot(&mut self, field: Field) -> Slot<'_> {
        match field {
            Field::ToUserName => Slot::Text(&mut self.to_user_name),
            Field::FromUserName => Slot::Text(&mut self.from_user_name),
            Field::CreateTime => Slot::Int64(&mut self.create_time),
            Field::MsgType => Slot::Text(&mut self.msg_type),
            Field::MsgId => Slot::Int64(&mut self.msg_id),
            Field::JobMsgId => Slot::Int64(&mut self.job_msg_id),
            Field::Content => Slot::Text(&mut self.content),
            Field::Event => Slot::Text(&mut self.event),
            Field::EventKey => Slot::Text(&mut self.event_key),
            Field::Ticket => Slot::Text(&mut self.ticket),
            Field::Latitude => Slot::Float(&mut self.latitude),
            Field::Longitude => Slot::Float(&mut self.longitude),
            Field::Precision => Slot::Float(&mut self.precision),
            Field::OrderId => Slot::Text(&mut self.order_id),
            Field::OrderStatus => Slot::Int32(&mut self.order_status),
            Field::ProductId => Slot::Text(&mut self.product_id),
            Field::SkuInfo => Slot::Text(&mut self.sku_info),
            Field::Status => Slot::Text(&mut self.status),
            Field::TotalCount => Slot::Int32(&mut self.total_count),
            Field::FilterCount => Slot::Int32(&mut self.filter_count),
            Field::SentCount => Slot::Int32(&mut self.sent_count),
            Field::ErrorCount => Slot::Int32(&mut self.error_count),
            Field::Title => Slot::Text(&mut self.title),
            Field::Description => Slot::Text(&mut self.description),
            Field::Url => Slot::Text(&mut self.url),
            Field::MediaId => Slot::Text(&mut self.media_id),
            Field::Format => Slot::Text(&mut self.format),
            Field::Recognition => Slot::Text(&mut self.recognition),
            Field::ThumbMediaId => Slot::Text(&mut self.thumb_media_id),
            Field::PicUrl => Slot::Text(&mut self.pic_url),
            Field::LocationX => Slot::Float(&mut self.location_x),
            Field::LocationY => Slot::Float(&mut self.location_y),
            Field::Scale => Slot::Int32(&mut self.scale),
            Field::Label => Slot::Text(&mut self.label),
        }
    }
}
