//! Routing of decoded deliveries to application callbacks.

use async_trait::async_trait;
use axum::{
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::message::{
    Envelope, Image, Link, Location, LocationEvent, MassSendJobFinishEvent, MenuClickEvent,
    MenuViewEvent, MerchantOrderEvent, Message, ScanEvent, SubscribeByScanEvent, SubscribeEvent,
    Text, UnsubscribeEvent, Video, Voice,
};
use crate::server::error::RequestError;

/// Parts of the HTTP request passed to every callback.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

/// Empty `200 OK`: tells the platform no reply will be sent.
pub fn no_reply() -> Response {
    StatusCode::OK.into_response()
}

/// Application callbacks, one per message or event kind.
///
/// Exactly one method is called per request. Every method has a default, so
/// an implementation only overrides the kinds it cares about; the message
/// defaults answer with [`no_reply`].
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn text(&self, _req: &RequestMeta, _msg: Text) -> Response {
        no_reply()
    }

    async fn image(&self, _req: &RequestMeta, _msg: Image) -> Response {
        no_reply()
    }

    async fn voice(&self, _req: &RequestMeta, _msg: Voice) -> Response {
        no_reply()
    }

    async fn video(&self, _req: &RequestMeta, _msg: Video) -> Response {
        no_reply()
    }

    async fn link(&self, _req: &RequestMeta, _msg: Link) -> Response {
        no_reply()
    }

    async fn location(&self, _req: &RequestMeta, _msg: Location) -> Response {
        no_reply()
    }

    async fn menu_click(&self, _req: &RequestMeta, _event: MenuClickEvent) -> Response {
        no_reply()
    }

    async fn menu_view(&self, _req: &RequestMeta, _event: MenuViewEvent) -> Response {
        no_reply()
    }

    async fn location_event(&self, _req: &RequestMeta, _event: LocationEvent) -> Response {
        no_reply()
    }

    async fn merchant_order(&self, _req: &RequestMeta, _event: MerchantOrderEvent) -> Response {
        no_reply()
    }

    async fn subscribe(&self, _req: &RequestMeta, _event: SubscribeEvent) -> Response {
        no_reply()
    }

    async fn subscribe_by_scan(
        &self,
        _req: &RequestMeta,
        _event: SubscribeByScanEvent,
    ) -> Response {
        no_reply()
    }

    async fn unsubscribe(&self, _req: &RequestMeta, _event: UnsubscribeEvent) -> Response {
        no_reply()
    }

    async fn scan(&self, _req: &RequestMeta, _event: ScanEvent) -> Response {
        no_reply()
    }

    async fn mass_send_job_finish(
        &self,
        _req: &RequestMeta,
        _event: MassSendJobFinishEvent,
    ) -> Response {
        no_reply()
    }

    /// Valid envelope with an unrecognized `MsgType`/`Event`.
    ///
    /// `body` is a copy of the raw request body owned by the callee.
    async fn unknown_request(&self, _req: &RequestMeta, body: Vec<u8>) -> Response {
        debug!(body_length = body.len(), "push_unknown_request");
        no_reply()
    }

    /// Request rejected before routing.
    async fn invalid_request(&self, req: &RequestMeta, err: RequestError) -> Response {
        warn!(
            method = %req.method,
            path = req.uri.path(),
            error_kind = err.kind(),
            error = %err,
            "push_invalid_request"
        );
        (err.status_code(), err.to_string()).into_response()
    }
}

/// Invoke the one callback matching `message`.
pub async fn dispatch<H>(handlers: &H, req: &RequestMeta, message: Message) -> Response
where
    H: MessageHandler + ?Sized,
{
    match message {
        Message::Text(msg) => handlers.text(req, msg).await,
        Message::Image(msg) => handlers.image(req, msg).await,
        Message::Voice(msg) => handlers.voice(req, msg).await,
        Message::Video(msg) => handlers.video(req, msg).await,
        Message::Link(msg) => handlers.link(req, msg).await,
        Message::Location(msg) => handlers.location(req, msg).await,
        Message::MenuClick(event) => handlers.menu_click(req, event).await,
        Message::MenuView(event) => handlers.menu_view(req, event).await,
        Message::LocationEvent(event) => handlers.location_event(req, event).await,
        Message::MerchantOrder(event) => handlers.merchant_order(req, event).await,
        Message::Subscribe(event) => handlers.subscribe(req, event).await,
        Message::SubscribeByScan(event) => handlers.subscribe_by_scan(req, event).await,
        Message::Unsubscribe(event) => handlers.unsubscribe(req, event).await,
        Message::Scan(event) => handlers.scan(req, event).await,
        Message::MassSendJobFinish(event) => handlers.mass_send_job_finish(req, event).await,
        Message::Unknown(body) => handlers.unknown_request(req, body).await,
    }
}

/// Project `env` and dispatch it.
///
/// `raw` is the body `env` was decoded from; the unknown path receives an
/// owned copy of it.
pub async fn dispatch_envelope<H>(
    handlers: &H,
    req: &RequestMeta,
    env: &Envelope,
    raw: &[u8],
) -> Response
where
    H: MessageHandler + ?Sized,
{
    dispatch(handlers, req, Message::from_envelope(env, raw)).await
}
