//! Shared fixtures: fake transports and test files.
#![allow(dead_code)] // not every test binary uses every helper

use std::path::PathBuf;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use uplift::UploadConfig;

pub type ReceivedBodies = Arc<Mutex<Vec<Vec<u8>>>>;

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once per test binary so `RUST_LOG`
/// surfaces the crate's log records during debugging.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Spawn a fake transport that buffers each request body and answers with
/// `status`. Returns the endpoint URL and the captured bodies.
pub async fn spawn_transport(status: StatusCode) -> (String, ReceivedBodies) {
    let received: ReceivedBodies = Arc::new(Mutex::new(Vec::new()));
    let bodies = received.clone();

    let app = Router::new()
        .route(
            "/upload",
            post(move |body: Bytes| {
                let bodies = bodies.clone();
                async move {
                    bodies.lock().unwrap().push(body.to_vec());
                    status
                }
            }),
        )
        .layer(axum::extract::DefaultBodyLimit::disable());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake transport");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake transport");
    });

    (format!("http://{addr}/upload"), received)
}

/// Accept one connection, read roughly `limit` bytes of the request, then
/// drop the socket mid-body.
pub async fn spawn_dropping_transport(limit: usize) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind dropping transport");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = vec![0u8; 16 * 1024];
            let mut seen = 0usize;
            while seen < limit {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => seen += n,
                }
            }
            // Dropping the socket with unread data in flight resets the
            // connection while the client is still writing the body.
        }
    });

    format!("http://{addr}/upload")
}

/// Accept one connection and drain it slowly without ever responding, so an
/// upload stays in flight long enough to be cancelled.
pub async fn spawn_stalling_transport(pause: Duration) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stalling transport");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = vec![0u8; 16 * 1024];
            loop {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => tokio::time::sleep(pause).await,
                }
            }
        }
    });

    format!("http://{addr}/upload")
}

pub fn write_fixture(dir: &TempDir, name: &str, size: usize) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, vec![0x5A; size]).expect("write fixture");
    path
}

pub fn test_config(endpoint: String) -> UploadConfig {
    UploadConfig {
        endpoint,
        timeout_secs: 30,
        ..Default::default()
    }
}

/// Pull everything currently sitting in a broadcast receiver.
pub fn drain(listener: &mut tokio::sync::broadcast::Receiver<String>) -> Vec<String> {
    let mut messages = Vec::new();
    loop {
        match listener.try_recv() {
            Ok(message) => messages.push(message),
            Err(tokio::sync::broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    messages
}

/// Percent values from `Uploading in progress...<n>` messages, in order.
pub fn progress_percents(messages: &[String]) -> Vec<u32> {
    messages
        .iter()
        .filter_map(|m| m.strip_prefix("Uploading in progress..."))
        .map(|p| p.parse().expect("integer percent"))
        .collect()
}
