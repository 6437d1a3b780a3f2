//! Gateway service - main entry point.
//!
//! One listener serves every WebSocket path (classified at connect time) and,
//! when enabled, the `/health` and `/metrics` status endpoints.

use crate::adapters::GatewayEvents;
use crate::auth::{Authenticator, ConnectionRequest};
use crate::dispatch::{Dispatcher, RoutingTable, TelemetryRelay};
use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::domain::PeerAddress;
use crate::metrics::GatewayMetrics;
use crate::ports::{ClusterRegistry, KeyValueCache};
use crate::ws::{LifecycleManager, WebSocketHandler};
use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, OriginalUri, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use mcu_bus::{EventChannel, InMemoryEventBus, OperationalEvent};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Gateway service state
pub struct GatewayService {
    config: GatewayConfig,
    bus: Arc<InMemoryEventBus>,
    events: GatewayEvents,
    manager: Arc<LifecycleManager>,
    metrics: Arc<GatewayMetrics>,
}

impl GatewayService {
    /// Create a new gateway over the given stores and bus
    pub fn new(
        config: GatewayConfig,
        cache: Arc<dyn KeyValueCache>,
        registry: Arc<dyn ClusterRegistry>,
        bus: Arc<InMemoryEventBus>,
    ) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let metrics = Arc::new(GatewayMetrics::new());
        let events = GatewayEvents::new(bus.clone());

        let relay = Arc::new(TelemetryRelay::new(
            Arc::clone(&cache),
            config.telemetry.snapshot_key.clone(),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            RoutingTable::telemetry(relay, Arc::clone(&metrics)),
            events.clone(),
            Arc::clone(&metrics),
            config.session.max_message_size,
        ));
        let authenticator = Arc::new(Authenticator::new(
            config.routes.clone(),
            &config.auth,
            cache,
            registry,
        ));
        let manager = Arc::new(LifecycleManager::new(
            authenticator,
            dispatcher,
            events.clone(),
            Arc::clone(&metrics),
            config.session.ready_delay,
        ));

        Ok(Self {
            config,
            bus,
            events,
            manager,
            metrics,
        })
    }

    /// Bind the configured listener address.
    ///
    /// A bind failure is also published on the bus `error` channel.
    pub async fn bind(&self) -> Result<TcpListener, GatewayError> {
        let addr = self.config.bind_addr();
        match TcpListener::bind(addr).await {
            Ok(listener) => Ok(listener),
            Err(e) => {
                error!(addr = %addr, error = %e, "Failed to bind listener");
                self.events.server_error(&e.to_string()).await;
                Err(GatewayError::Bind(format!("{addr}: {e}")))
            }
        }
    }

    /// Serve connections on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!(
            addr = %addr,
            admin_path = %self.config.routes.admin_path,
            cluster_path = %self.config.routes.cluster_path,
            "Gateway listening"
        );

        let router = self.router();
        let result = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        if let Err(e) = result {
            error!(error = %e, "Gateway server error");
            self.events.server_error(&e.to_string()).await;
            return Err(GatewayError::Serve(e.to_string()));
        }

        info!("Gateway stopped");
        Ok(())
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn start<F>(self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Invoke `handler` for every operational event on `channel`.
    pub fn on<F>(&self, channel: EventChannel, handler: F) -> JoinHandle<()>
    where
        F: Fn(OperationalEvent) + Send + Sync + 'static,
    {
        self.bus.on(channel, handler)
    }

    /// Get the event bus
    pub fn bus(&self) -> Arc<InMemoryEventBus> {
        Arc::clone(&self.bus)
    }

    /// Get metrics
    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build the router. Every path not claimed by a status endpoint is
    /// offered the WebSocket upgrade.
    pub fn router(&self) -> Router {
        let state = AppState {
            manager: Arc::clone(&self.manager),
            metrics: Arc::clone(&self.metrics),
        };

        let mut router = Router::new();
        if self.config.server.expose_status {
            router = router
                .route("/health", get(health_check))
                .route("/metrics", get(metrics_snapshot));
        }
        router.fallback(ws_upgrade).with_state(state)
    }
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    manager: Arc<LifecycleManager>,
    metrics: Arc<GatewayMetrics>,
}

/// Upgrade any path; the authenticator decides what the path means.
async fn ws_upgrade(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let mut request = ConnectionRequest::new(path, PeerAddress::from(addr));
    if let Some(cookie) = cookie_header(&headers) {
        request = request.with_cookie(cookie);
    }

    ws.on_upgrade(move |socket| async move {
        WebSocketHandler::new(state.manager, state.metrics, request)
            .handle(socket)
            .await;
    })
}

/// All `Cookie` header lines joined with `"; "`. Lines that are not
/// visible ASCII are skipped.
fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let lines: Vec<&str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("; "))
    }
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "mcu-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics_snapshot(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.to_json())
}
