//! TCP listener and top-level server wiring.
//!
//! Binds the listening socket, accepts connections, and spawns one session
//! task per connection. The catalog and engine are shared by `Arc` only;
//! nothing mutates them after startup, so sessions need no synchronization.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::audio::AudioEngine;
use crate::catalog::Catalog;
use crate::session::Session;

/// Bind and serve until interrupted. On ctrl-c the listener stops accepting
/// and this returns; in-flight sessions are not joined (best effort).
pub async fn run(
    addr: &str,
    audio_dir: &Path,
    catalog: Catalog,
    engine: Arc<dyn AudioEngine>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("server listening on {}", listener.local_addr()?);

    tokio::select! {
        result = serve_on(listener, audio_dir.to_path_buf(), Arc::new(catalog), engine) => result,
        _ = signal::ctrl_c() => {
            info!("interrupt received, no longer accepting connections");
            Ok(())
        }
    }
}

/// Accept loop over an already-bound listener. A failed accept is logged
/// and the loop keeps going; a session error never reaches this task.
async fn serve_on(
    listener: TcpListener,
    audio_dir: PathBuf,
    catalog: Arc<Catalog>,
    engine: Arc<dyn AudioEngine>,
) -> anyhow::Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!("new connection from {}", peer);
                let session = Session::new(
                    stream,
                    Arc::clone(&catalog),
                    Arc::clone(&engine),
                    audio_dir.clone(),
                );
                tokio::spawn(async move {
                    match session.run().await {
                        Ok(()) => info!("session closed for {}", peer),
                        Err(err) => error!("session error for {}: {}", peer, err),
                    }
                });
            }
            Err(err) => error!("failed to accept connection: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::SocketAddr;

    use async_trait::async_trait;
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    use crate::catalog::CatalogEntry;
    use crate::client::Client;
    use crate::protocol::command::GET_USAGE;
    use crate::protocol::frame::{read_response, Status};

    struct StubEngine;

    #[async_trait]
    impl AudioEngine for StubEngine {
        async fn probe(&self, _path: &Path) -> anyhow::Result<f64> {
            Ok(10.0)
        }

        async fn extract(
            &self,
            path: &Path,
            start_ms: u64,
            end_ms: u64,
        ) -> anyhow::Result<Vec<u8>> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("?");
            Ok(format!("{}:{}:{}", name, start_ms, end_ms).into_bytes())
        }
    }

    async fn start_server() -> (TempDir, SocketAddr) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.wav"), b"x").unwrap();

        let catalog = Arc::new(Catalog::from_entries(vec![CatalogEntry {
            filename: "a.wav".to_string(),
            duration_sec: 10.0,
            format: "wav".to_string(),
        }]));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let audio_dir = dir.path().to_path_buf();
        tokio::spawn(async move {
            let _ = serve_on(listener, audio_dir, catalog, Arc::new(StubEngine)).await;
        });

        (dir, addr)
    }

    async fn connect(addr: SocketAddr) -> Client {
        Client::connect(&addr.ip().to_string(), addr.port())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn list_returns_catalog_entries() {
        let (_dir, addr) = start_server().await;
        let mut client = connect(addr).await;

        let entries = client.list().await.unwrap();
        assert_eq!(
            entries,
            vec![CatalogEntry {
                filename: "a.wav".to_string(),
                duration_sec: 10.0,
                format: "wav".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn get_returns_excerpt_bytes() {
        let (_dir, addr) = start_server().await;
        let mut client = connect(addr).await;

        let bytes = client.fetch("a.wav", "2", "5").await.unwrap();
        assert_eq!(bytes, b"a.wav:2000:5000");
    }

    #[tokio::test]
    async fn get_with_reversed_range_fails() {
        let (_dir, addr) = start_server().await;
        let mut client = connect(addr).await;

        let err = client.fetch("a.wav", "5", "2").await.unwrap_err();
        assert!(err.to_string().contains("start time must be less"));
    }

    #[tokio::test]
    async fn get_unknown_file_fails() {
        let (_dir, addr) = start_server().await;
        let mut client = connect(addr).await;

        let err = client.fetch("missing.wav", "0", "1").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn get_beyond_duration_fails() {
        let (_dir, addr) = start_server().await;
        let mut client = connect(addr).await;

        let err = client.fetch("a.wav", "0", "999").await.unwrap_err();
        assert!(err.to_string().contains("exceeds file duration"));
    }

    #[tokio::test]
    async fn unknown_command_keeps_the_connection_open() {
        let (_dir, addr) = start_server().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(b"FOO\n").await.unwrap();
        let response = read_response(&mut stream).await.unwrap();
        assert_eq!(response.status, Status::Err);
        assert!(response.error_text().contains("unknown command: FOO"));

        // Same connection must still answer real commands.
        stream.write_all(b"LIST\n").await.unwrap();
        let response = read_response(&mut stream).await.unwrap();
        assert_eq!(response.status, Status::Ok);
    }

    #[tokio::test]
    async fn malformed_commands_report_their_reason() {
        let (_dir, addr) = start_server().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(b"GET a.wav 2\n").await.unwrap();
        let response = read_response(&mut stream).await.unwrap();
        assert_eq!(response.status, Status::Err);
        assert_eq!(response.error_text(), GET_USAGE);

        stream.write_all(b"LIST extra\n").await.unwrap();
        let response = read_response(&mut stream).await.unwrap();
        assert_eq!(response.status, Status::Err);
        assert!(response.error_text().contains("no parameters"));

        stream.write_all(b"\n").await.unwrap();
        let response = read_response(&mut stream).await.unwrap();
        assert_eq!(response.status, Status::Err);
        assert_eq!(response.error_text(), "empty command");
    }

    #[tokio::test]
    async fn verbs_are_case_insensitive() {
        let (_dir, addr) = start_server().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(b"get a.wav 2 5\n").await.unwrap();
        let response = read_response(&mut stream).await.unwrap();
        assert_eq!(response.status, Status::Ok);
        assert_eq!(response.payload, b"a.wav:2000:5000");
    }

    #[tokio::test]
    async fn identical_gets_are_idempotent_across_connections() {
        let (_dir, addr) = start_server().await;

        let mut first = connect(addr).await;
        let mut second = connect(addr).await;

        let a = first.fetch("a.wav", "1.5", "4.25").await.unwrap();
        let b = second.fetch("a.wav", "1.5", "4.25").await.unwrap();
        let c = first.fetch("a.wav", "1.5", "4.25").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[tokio::test]
    async fn sessions_do_not_interfere() {
        let (_dir, addr) = start_server().await;

        // An error on one connection must not disturb another mid-stream.
        let mut healthy = connect(addr).await;
        let mut failing = connect(addr).await;

        let err = failing.fetch("missing.wav", "0", "1").await.unwrap_err();
        assert!(err.to_string().contains("not found"));

        let bytes = healthy.fetch("a.wav", "0", "10").await.unwrap();
        assert_eq!(bytes, b"a.wav:0:10000");
    }
}
