//! HTTP entry points for the push URL.
//!
//! The platform uses one URL for two things:
//! 1. `GET` handshake: verify the signature and echo `echostr` back
//! 2. `POST` delivery: verify, read and decode the XML body, then route it
//!
//! Every other method is answered with `405 Method Not Allowed` by the router.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::message::{decode_envelope, Message};
use crate::server::dispatch::{dispatch, MessageHandler, RequestMeta};
use crate::server::error::RequestError;
use crate::server::pool::{ScratchPool, ScratchUnit};
use crate::server::query::{parse_credentials, Credentials};
use crate::server::signature::verify_signature;

/// Shared state of the push endpoint.
pub struct PushServer<H> {
    inner: Arc<PushServerInner<H>>,
}

struct PushServerInner<H> {
    token: String,
    max_body_bytes: usize,
    pool: Arc<ScratchPool>,
    handlers: H,
}

impl<H> Clone for PushServer<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: MessageHandler> PushServer<H> {
    /// Create a server from the loaded configuration.
    pub fn new(config: &Config, handlers: H) -> Self {
        Self {
            inner: Arc::new(PushServerInner {
                token: config.token.clone(),
                max_body_bytes: config.max_body_bytes,
                pool: ScratchPool::new(config.scratch_body_capacity, config.scratch_pool_max_idle),
                handlers,
            }),
        }
    }

    /// The application callbacks.
    pub fn handlers(&self) -> &H {
        &self.inner.handlers
    }

    /// The scratch pool shared by all requests.
    pub fn pool(&self) -> &Arc<ScratchPool> {
        &self.inner.pool
    }

    /// Handle a handshake request, returning the challenge to echo.
    fn verify_handshake(&self, meta: &RequestMeta) -> Result<String, RequestError> {
        let creds = parse_credentials(meta.uri.query(), true)?;

        let mut unit = self.inner.pool.acquire();
        self.check_signature(&creds, &mut unit.signature_buf)?;

        Ok(creds.echostr.unwrap_or_default())
    }

    /// Verify, read and decode a delivery into `unit`.
    async fn receive(
        &self,
        creds: &Credentials,
        body: Body,
        unit: &mut ScratchUnit,
    ) -> Result<(), RequestError> {
        self.check_signature(creds, &mut unit.signature_buf)?;

        read_body(body, &mut unit.body_buf, self.inner.max_body_bytes).await?;
        decode_envelope(&unit.body_buf, &mut unit.envelope)?;

        Ok(())
    }

    fn check_signature(
        &self,
        creds: &Credentials,
        scratch: &mut Vec<u8>,
    ) -> Result<(), RequestError> {
        let valid = verify_signature(
            &creds.signature,
            &creds.timestamp,
            &creds.nonce,
            &self.inner.token,
            scratch,
        );

        if valid {
            Ok(())
        } else {
            Err(RequestError::SignatureMismatch)
        }
    }
}

/// Stream `body` into `buf`, failing once more than `limit` bytes arrive.
async fn read_body(body: Body, buf: &mut Vec<u8>, limit: usize) -> Result<(), RequestError> {
    let mut stream = body.into_data_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| RequestError::BodyRead(e.to_string()))?;
        if buf.len() + chunk.len() > limit {
            return Err(RequestError::BodyTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(())
}

// =============================================================================
// Handshake
// =============================================================================

/// `GET` handshake endpoint.
///
/// Answers with the `echostr` challenge verbatim when the signature matches.
pub async fn handshake<H: MessageHandler>(
    State(server): State<PushServer<H>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let meta = RequestMeta {
        method,
        uri,
        headers,
    };

    match server.verify_handshake(&meta) {
        Ok(echostr) => {
            info!(echostr_length = echostr.len(), "push_handshake_verified");
            echostr.into_response()
        }
        Err(err) => server.inner.handlers.invalid_request(&meta, err).await,
    }
}

// =============================================================================
// Delivery
// =============================================================================

/// `POST` delivery endpoint.
///
/// The scratch unit stays acquired until the routed callback returns and is
/// released when this function exits, whichever path it takes.
pub async fn delivery<H: MessageHandler>(
    State(server): State<PushServer<H>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let meta = RequestMeta {
        method,
        uri,
        headers,
    };
    let handlers = &server.inner.handlers;

    let creds = match parse_credentials(meta.uri.query(), false) {
        Ok(creds) => creds,
        Err(err) => return handlers.invalid_request(&meta, err).await,
    };

    let mut unit = server.inner.pool.acquire();

    if let Err(err) = server.receive(&creds, body, &mut unit).await {
        return handlers.invalid_request(&meta, err).await;
    }

    let message = Message::from_envelope(&unit.envelope, &unit.body_buf);

    info!(
        kind = message.kind(),
        msg_type = %unit.envelope.msg_type,
        event = %unit.envelope.event,
        body_length = unit.body_buf.len(),
        "push_message_received"
    );

    let response = dispatch(handlers, &meta, message).await;

    debug!(status = response.status().as_u16(), "push_message_handled");

    response
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Build the router: `/health` plus the push URL at `path`.
pub fn router<H: MessageHandler>(server: PushServer<H>, path: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(path, get(handshake::<H>).post(delivery::<H>))
        .with_state(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Bytes},
        http::{header, Request, StatusCode},
    };
    use parking_lot::Mutex;
    use tower::ServiceExt;

    use crate::message::{SubscribeByScanEvent, SubscribeEvent, Text};
    use crate::server::signature::compute_signature;

    const TOKEN: &str = "test-token";
    const PATH: &str = "/wechat";

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Text(Text),
        Subscribe(SubscribeEvent),
        SubscribeByScan(SubscribeByScanEvent),
        Unknown(Vec<u8>),
        Invalid(&'static str),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
    }

    impl Recorder {
        fn take(&self) -> Vec<Call> {
            std::mem::take(&mut *self.calls.lock())
        }
    }

    #[async_trait]
    impl MessageHandler for Recorder {
        async fn text(&self, _req: &RequestMeta, msg: Text) -> Response {
            let reply = format!("echo:{}", msg.content);
            self.calls.lock().push(Call::Text(msg));
            reply.into_response()
        }

        async fn subscribe(&self, _req: &RequestMeta, event: SubscribeEvent) -> Response {
            self.calls.lock().push(Call::Subscribe(event));
            "success".into_response()
        }

        async fn subscribe_by_scan(
            &self,
            _req: &RequestMeta,
            event: SubscribeByScanEvent,
        ) -> Response {
            self.calls.lock().push(Call::SubscribeByScan(event));
            "success".into_response()
        }

        async fn unknown_request(&self, _req: &RequestMeta, body: Vec<u8>) -> Response {
            self.calls.lock().push(Call::Unknown(body));
            "success".into_response()
        }

        async fn invalid_request(&self, _req: &RequestMeta, err: RequestError) -> Response {
            self.calls.lock().push(Call::Invalid(err.kind()));
            (err.status_code(), "invalid").into_response()
        }
    }

    fn test_config() -> Config {
        Config {
            token: TOKEN.to_string(),
            path: PATH.to_string(),
            max_body_bytes: 1024,
            ..Config::default()
        }
    }

    fn build_app<H: MessageHandler>(handlers: H) -> (PushServer<H>, Router) {
        let server = PushServer::new(&test_config(), handlers);
        let router = router(server.clone(), PATH);
        (server, router)
    }

    fn signed_query(timestamp: &str, nonce: &str) -> String {
        let signature = compute_signature(timestamp, nonce, TOKEN, &mut Vec::new());
        let signature = std::str::from_utf8(&signature).unwrap().to_string();
        format!("signature={signature}&timestamp={timestamp}&nonce={nonce}")
    }

    fn post(query: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(format!("{PATH}?{query}"))
            .header(header::CONTENT_TYPE, "text/xml")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(query: &str) -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri(format!("{PATH}?{query}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_handshake_echoes_challenge() {
        let (server, app) = build_app(Recorder::default());
        let query = format!("{}&echostr=hello", signed_query("1409304348", "xxxxxx"));

        let response = app.oneshot(get_request(&query)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "hello");
        assert!(server.handlers().take().is_empty());
        assert_eq!(server.pool().idle_count(), 1);
    }

    #[tokio::test]
    async fn test_handshake_bad_signature() {
        let (server, app) = build_app(Recorder::default());
        let query = "signature=0000&timestamp=1&nonce=n&echostr=hello";

        let response = app.oneshot(get_request(query)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_string(response).await, "invalid");
        assert_eq!(
            server.handlers().take(),
            vec![Call::Invalid("signature_mismatch")]
        );
        assert_eq!(server.pool().idle_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_parameters_skip_verification() {
        let signed = signed_query("1", "n");
        let cases = [
            get_request(&signed),
            get_request("timestamp=1&nonce=n&echostr=e"),
            post("signature=s&nonce=n", "<xml/>"),
            post("signature=s&timestamp=1", "<xml/>"),
        ];

        for request in cases {
            let (server, app) = build_app(Recorder::default());
            let response = app.oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                server.handlers().take(),
                vec![Call::Invalid("missing_parameter")]
            );
            // The pool was never touched
            assert_eq!(server.pool().idle_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_malformed_query() {
        let (server, app) = build_app(Recorder::default());
        let response = app
            .oneshot(post("signature=%zz&timestamp=1&nonce=n", "<xml/>"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(server.handlers().take(), vec![Call::Invalid("query_parse")]);
    }

    #[tokio::test]
    async fn test_text_delivery() {
        let (server, app) = build_app(Recorder::default());
        let body = "<xml><ToUserName>gh</ToUserName><FromUserName>u</FromUserName>\
            <CreateTime>1348831860</CreateTime><MsgType>text</MsgType>\
            <Content>hi</Content><MsgId>123</MsgId></xml>";

        let response = app
            .oneshot(post(&signed_query("1348831860", "abc"), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "echo:hi");

        let calls = server.handlers().take();
        match calls.as_slice() {
            [Call::Text(text)] => {
                assert_eq!(text.content, "hi");
                assert_eq!(text.msg_id, 123);
                assert_eq!(text.head.to_user_name, "gh");
                assert_eq!(text.head.create_time, 1348831860);
            }
            other => panic!("Expected one Text call, got {other:?}"),
        }
        assert_eq!(server.pool().idle_count(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_routing() {
        let (server, app) = build_app(Recorder::default());
        let query = signed_query("1", "n");

        let plain = "<xml><MsgType>event</MsgType><Event>subscribe</Event></xml>";
        let response = app.clone().oneshot(post(&query, plain)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let by_scan = "<xml><MsgType>event</MsgType><Event>subscribe</Event>\
            <EventKey>qrscene_123</EventKey><Ticket>abc</Ticket></xml>";
        let response = app.oneshot(post(&query, by_scan)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let calls = server.handlers().take();
        assert_eq!(calls.len(), 2);
        assert!(matches!(&calls[0], Call::Subscribe(e) if e.event == "subscribe"));
        match &calls[1] {
            Call::SubscribeByScan(e) => {
                assert_eq!(e.event_key, "qrscene_123");
                assert_eq!(e.ticket, "abc");
            }
            other => panic!("Expected SubscribeByScan call, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_body_copy_survives_unit_reuse() {
        let (server, app) = build_app(Recorder::default());
        let query = signed_query("1", "n");
        let unknown = "<xml><MsgType>foo</MsgType><Payload>first</Payload></xml>";

        app.clone().oneshot(post(&query, unknown)).await.unwrap();
        assert_eq!(server.pool().idle_count(), 1);

        // Same unit, different body
        let text = "<xml><MsgType>text</MsgType><Content>overwrite overwrite overwrite</Content></xml>";
        app.oneshot(post(&query, text)).await.unwrap();
        assert_eq!(server.pool().idle_count(), 1);

        let calls = server.handlers().take();
        assert_eq!(calls[0], Call::Unknown(unknown.as_bytes().to_vec()));
        assert!(matches!(&calls[1], Call::Text(_)));
    }

    #[tokio::test]
    async fn test_delivery_bad_signature_does_not_decode() {
        let (server, app) = build_app(Recorder::default());
        let query = "signature=deadbeef&timestamp=1&nonce=n";

        let response = app.oneshot(post(query, "not xml at all")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            server.handlers().take(),
            vec![Call::Invalid("signature_mismatch")]
        );
        assert_eq!(server.pool().idle_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let (server, app) = build_app(Recorder::default());

        let response = app
            .oneshot(post(&signed_query("1", "n"), "<xml><MsgType>text</Content>"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(server.handlers().take(), vec![Call::Invalid("decode")]);
        assert_eq!(server.pool().idle_count(), 1);
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let (server, app) = build_app(Recorder::default());
        let body = format!("<xml><Content>{}</Content></xml>", "x".repeat(2048));

        let response = app
            .oneshot(post(&signed_query("1", "n"), &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(server.handlers().take(), vec![Call::Invalid("body_too_large")]);
        assert_eq!(server.pool().idle_count(), 1);
    }

    #[tokio::test]
    async fn test_aborted_body_read() {
        let (server, app) = build_app(Recorder::default());
        let chunks = vec![
            Ok(Bytes::from_static(b"<xml><MsgType>te")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
        ];
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("{PATH}?{}", signed_query("1", "n")))
            .body(Body::from_stream(futures::stream::iter(chunks)))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(server.handlers().take(), vec![Call::Invalid("body_read")]);
        assert_eq!(server.pool().idle_count(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let (server, app) = build_app(Recorder::default());
        let request = Request::builder()
            .method(Method::PUT)
            .uri(format!("{PATH}?{}", signed_query("1", "n")))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(server.handlers().take().is_empty());
    }

    #[tokio::test]
    async fn test_default_handlers_reply_empty() {
        struct Defaults;
        impl MessageHandler for Defaults {}

        let (_, app) = build_app(Defaults);
        let body = "<xml><MsgType>image</MsgType><PicUrl>http://x</PicUrl></xml>";

        let response = app.oneshot(post(&signed_query("1", "n"), body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "");
    }

    #[tokio::test]
    async fn test_health() {
        let (_, app) = build_app(Recorder::default());
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"status":"ok"}"#);
    }
}
