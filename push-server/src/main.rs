//! wxpush server - Push endpoint for WeChat official accounts.
//!
//! This binary serves the configured push URL with a handler set that logs
//! every decoded message and event, and answers `success` so the platform
//! does not retry. Applications embed the library with their own
//! [`MessageHandler`] instead.

use std::net::SocketAddr;

use anyhow::{ensure, Context, Result};
use async_trait::async_trait;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wxpush::message::{
    Image, Link, Location, LocationEvent, MassSendJobFinishEvent, MenuClickEvent, MenuViewEvent,
    MerchantOrderEvent, ScanEvent, SubscribeByScanEvent, SubscribeEvent, Text, UnsubscribeEvent,
    Video, Voice,
};
use wxpush::{router, Config, MessageHandler, PushServer, RequestMeta};

/// Logs each delivery as JSON and acknowledges it.
struct LoggingHandler;

impl LoggingHandler {
    fn log<T: Serialize>(&self, kind: &'static str, value: &T) -> Response {
        match serde_json::to_string(value) {
            Ok(json) => info!(kind = kind, payload = %json, "push_message_logged"),
            Err(e) => warn!(kind = kind, error = %e, "push_message_serialize_failed"),
        }
        "success".into_response()
    }
}

#[async_trait]
impl MessageHandler for LoggingHandler {
    async fn text(&self, _req: &RequestMeta, msg: Text) -> Response {
        self.log("text", &msg)
    }

    async fn image(&self, _req: &RequestMeta, msg: Image) -> Response {
        self.log("image", &msg)
    }

    async fn voice(&self, _req: &RequestMeta, msg: Voice) -> Response {
        self.log("voice", &msg)
    }

    async fn video(&self, _req: &RequestMeta, msg: Video) -> Response {
        self.log("video", &msg)
    }

    async fn link(&self, _req: &RequestMeta, msg: Link) -> Response {
        self.log("link", &msg)
    }

    async fn location(&self, _req: &RequestMeta, msg: Location) -> Response {
        self.log("location", &msg)
    }

    async fn menu_click(&self, _req: &RequestMeta, event: MenuClickEvent) -> Response {
        self.log("menu_click", &event)
    }

    async fn menu_view(&self, _req: &RequestMeta, event: MenuViewEvent) -> Response {
        self.log("menu_view", &event)
    }

    async fn location_event(&self, _req: &RequestMeta, event: LocationEvent) -> Response {
        self.log("location_event", &event)
    }

    async fn merchant_order(&self, _req: &RequestMeta, event: MerchantOrderEvent) -> Response {
        self.log("merchant_order", &event)
    }

    async fn subscribe(&self, _req: &RequestMeta, event: SubscribeEvent) -> Response {
        self.log("subscribe", &event)
    }

    async fn subscribe_by_scan(&self, _req: &RequestMeta, event: SubscribeByScanEvent) -> Response {
        self.log("subscribe_by_scan", &event)
    }

    async fn unsubscribe(&self, _req: &RequestMeta, event: UnsubscribeEvent) -> Response {
        self.log("unsubscribe", &event)
    }

    async fn scan(&self, _req: &RequestMeta, event: ScanEvent) -> Response {
        self.log("scan", &event)
    }

    async fn mass_send_job_finish(
        &self,
        _req: &RequestMeta,
        event: MassSendJobFinishEvent,
    ) -> Response {
        self.log("mass_send_job_finish", &event)
    }

    async fn unknown_request(&self, _req: &RequestMeta, body: Vec<u8>) -> Response {
        info!(
            body_length = body.len(),
            body = %String::from_utf8_lossy(&body),
            "push_unknown_logged"
        );
        "success".into_response()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("push_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        path = %config.path,
        token_configured = config.has_token(),
        max_body_bytes = config.max_body_bytes,
        scratch_body_capacity = config.scratch_body_capacity,
        scratch_pool_max_idle = config.scratch_pool_max_idle,
        "config_loaded"
    );

    ensure!(config.has_token(), "WECHAT_TOKEN must be set");

    let server = PushServer::new(&config, LoggingHandler);

    // Build the router
    let app = router(server, &config.path).layer(TraceLayer::new_for_http());

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "push_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("push_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
///
/// A listener that cannot be installed is logged and never fires; the other
/// one still can.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "ctrl_c_handler_install_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "sigterm_handler_install_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("push_server_shutting_down");
}
