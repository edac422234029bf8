//! Test helpers: build the relay router against a mock processing backend.
//!
//! Run from workspace root: `cargo test -p yanktube-api --test relay_test`.

use axum_test::TestServer;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use yanktube_api::setup::routes;
use yanktube_api::state::AppState;
use yanktube_core::{BaseConfig, Config, UpstreamConfig};

/// Test application: relay server plus the mock backend it talks to.
pub struct TestApp {
    pub server: TestServer,
    pub upstream: mockito::ServerGuard,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

/// Relay wired to a fresh mockito backend.
pub async fn setup_test_app() -> TestApp {
    let upstream = mockito::Server::new_async().await;
    let server = server_for(create_test_config(&upstream.url()));
    TestApp { server, upstream }
}

pub fn server_for(config: Config) -> TestServer {
    let state = Arc::new(AppState::new(config.clone()).expect("Failed to create app state"));
    let app = routes::setup_routes(&config, state).expect("Failed to setup routes");
    TestServer::new(app).expect("Failed to create test server")
}

pub fn create_test_config(upstream_url: &str) -> Config {
    Config {
        base: BaseConfig {
            server_port: 8000,
            cors_origins: vec!["http://localhost:5173".to_string()],
            environment: "test".to_string(),
            http_concurrency_limit: 64,
        },
        upstream: UpstreamConfig::new(Url::parse(upstream_url).expect("Invalid upstream URL")),
    }
}

/// Address that accepts connections and never writes a byte back.
pub async fn silent_upstream() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });
    format!("http://{}", addr)
}

/// Address with nothing listening on it.
pub async fn unreachable_upstream() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("No local address");
    drop(listener);
    format!("http://{}", addr)
}

/// Config whose tier timeouts are short enough for tests.
pub fn short_timeouts(mut config: Config, timeout: Duration) -> Config {
    config.upstream.metadata_timeout = timeout;
    config.upstream.single_item_timeout = timeout;
    config.upstream.collection_timeout = timeout;
    config
}

/// Backend that answers a single-video download slowly: headers at once, then `chunks`
/// blocks of `chunk_size` bytes, one every `pause`.
pub async fn trickling_upstream(chunks: usize, chunk_size: usize, pause: Duration) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\nContent-Length: {}\r\n\r\n",
            chunks * chunk_size
        );
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        for _ in 0..chunks {
            tokio::time::sleep(pause).await;
            if socket.write_all(&vec![5u8; chunk_size]).await.is_err() {
                return;
            }
        }
    });
    format!("http://{}", addr)
}
