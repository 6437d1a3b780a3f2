//! Test harness: a gateway on an ephemeral port and a WebSocket client.

use futures::{SinkExt, StreamExt};
use mcu_bus::InMemoryEventBus;
use mcu_gateway::{
    AdminCredential, ClusterRecord, GatewayConfig, GatewayError, GatewayMetrics, GatewayService,
    InMemoryCache, InMemoryClusterRegistry,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Upper bound for any single wait in a test.
pub const WAIT: Duration = Duration::from_secs(5);

/// Ready delay used by the harness unless a test overrides it.
pub const READY_DELAY: Duration = Duration::from_millis(50);

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "s3cret";

/// A running gateway with direct access to its stores and bus.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub bus: Arc<InMemoryEventBus>,
    pub cache: Arc<InMemoryCache>,
    pub registry: Arc<InMemoryClusterRegistry>,
    pub metrics: Arc<GatewayMetrics>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), GatewayError>>,
}

impl TestGateway {
    /// Start a gateway with one admin credential and `127.0.0.1` registered
    /// as a cluster node.
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with<F>(configure: F) -> Self
    where
        F: FnOnce(&mut GatewayConfig),
    {
        let mut config = GatewayConfig::default();
        config.server.host = "127.0.0.1".parse().unwrap();
        config.server.port = 0;
        config.session.ready_delay = READY_DELAY;
        configure(&mut config);

        let cache = Arc::new(InMemoryCache::new());
        cache
            .insert_credential(&AdminCredential::new(ADMIN_USER, ADMIN_PASSWORD))
            .unwrap();
        let registry = Arc::new(InMemoryClusterRegistry::new());
        registry.register(ClusterRecord::new("127.0.0.1").with_attribute("name", "local".into()));
        let bus = Arc::new(InMemoryEventBus::new());

        let service =
            GatewayService::new(config, cache.clone(), registry.clone(), bus.clone()).unwrap();
        let metrics = service.metrics();
        let listener = service.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(service.serve(listener, async move {
            let _ = shutdown_rx.await;
        }));

        Self {
            addr,
            bus,
            cache,
            registry,
            metrics,
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    /// Open a WebSocket connection, optionally sending a `Cookie` header.
    pub async fn connect(&self, path: &str, cookie: Option<&str>) -> Client {
        self.connect_with_cookies(path, cookie.as_slice()).await
    }

    /// Open a WebSocket connection sending one `Cookie` header per entry.
    pub async fn connect_with_cookies(&self, path: &str, cookies: &[&str]) -> Client {
        let mut request = self.url(path).into_client_request().unwrap();
        for cookie in cookies {
            request
                .headers_mut()
                .append("Cookie", HeaderValue::from_str(cookie).unwrap());
        }
        let (stream, _) = timeout(WAIT, connect_async(request))
            .await
            .expect("connect timed out")
            .unwrap();
        Client { stream }
    }

    /// Authenticated admin connection that has received `authonload`.
    pub async fn admin(&self) -> Client {
        let cookie = format!("username={ADMIN_USER}; password={ADMIN_PASSWORD}");
        let mut client = self.connect("/socket", Some(&cookie)).await;
        client.expect_authonload().await;
        client
    }

    /// Authenticated cluster connection that has received `authonload`.
    pub async fn node(&self) -> Client {
        let mut client = self.connect("/cluster", None).await;
        client.expect_authonload().await;
        client
    }

    /// Wait until the snapshot key holds `expected`.
    pub async fn wait_for_snapshot(&self, key: &str, expected: &Value) {
        timeout(WAIT, async {
            loop {
                let current = self
                    .cache
                    .peek(key)
                    .and_then(|raw| serde_json::from_str::<Value>(&raw).ok());
                if current.as_ref() == Some(expected) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("snapshot was never written");
    }

    /// Plain HTTP GET on the gateway listener. Returns the raw response.
    pub async fn http_get(&self, path: &str) -> String {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        let request =
            format!("GET {path} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n", self.addr);
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        timeout(WAIT, stream.read_to_string(&mut response))
            .await
            .expect("http response timed out")
            .unwrap();
        response
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = timeout(WAIT, self.task).await;
    }
}

/// WebSocket client speaking the envelope protocol.
pub struct Client {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Client {
    pub async fn send_json(&mut self, value: Value) {
        self.send_raw(&value.to_string()).await;
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.stream.send(Message::text(text)).await.unwrap();
    }

    pub async fn send_binary(&mut self, data: Vec<u8>) {
        self.stream.send(Message::binary(data)).await.unwrap();
    }

    /// Next envelope from the gateway as parsed JSON.
    pub async fn next_envelope(&mut self) -> Value {
        loop {
            let message = timeout(WAIT, self.stream.next())
                .await
                .expect("no envelope within timeout")
                .expect("connection closed")
                .unwrap();
            match message {
                Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
                Message::Ping(_) | Message::Pong(_) => continue,
                other => panic!("unexpected message: {other:?}"),
            }
        }
    }

    pub async fn expect_authonload(&mut self) {
        let envelope = self.next_envelope().await;
        assert_eq!(envelope, serde_json::json!({"event": "authonload"}));
    }

    /// Assert the gateway ends the connection.
    pub async fn expect_closed(&mut self) {
        loop {
            match timeout(WAIT, self.stream.next()).await {
                Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return,
                Ok(Some(Ok(Message::Ping(_)))) | Ok(Some(Ok(Message::Pong(_)))) => continue,
                Ok(Some(Ok(other))) => panic!("expected close, got {other:?}"),
                Err(_) => panic!("connection was not closed"),
            }
        }
    }

    /// Assert nothing arrives for `window`.
    pub async fn expect_silence(&mut self, window: Duration) {
        if let Ok(Some(message)) = timeout(window, self.stream.next()).await {
            panic!("expected silence, got {message:?}");
        }
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }

    /// Drop the TCP connection without a closing handshake.
    pub fn abort(self) {
        drop(self.stream);
    }
}
