// Server loop module
// Accepts connections until shutdown is requested, then drains in-flight ones

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::SignalHandler;
use crate::config::AppState;
use crate::logger;

/// Longest time shutdown waits for in-flight connections
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Run the accept loop on the current `LocalSet`.
///
/// Connection tasks are spawned with `spawn_local`, so this must be driven
/// from inside `LocalSet::run_until`.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    signals: Arc<SignalHandler>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = signals.shutdown.notified() => {
                break;
            }
        }
    }

    drop(listener);
    logger::log_shutdown(active_connections.load(Ordering::SeqCst));
    drain_connections(&active_connections, DRAIN_TIMEOUT).await;
    Ok(())
}

/// Wait until no connection is active or `timeout` elapses.
///
/// Returns the number of connections still open when it gave up.
pub async fn drain_connections(active_connections: &AtomicUsize, timeout: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let remaining = active_connections.load(Ordering::SeqCst);
        if remaining == 0 {
            logger::log_info("All connections closed");
            return 0;
        }
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Drain timeout after {}s, abandoning {remaining} connection(s)",
                timeout.as_secs()
            ));
            return remaining;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::create_reusable_listener;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::task::LocalSet;

    fn test_state(max_connections: Option<u64>) -> Arc<AppState> {
        let mut cfg = Config::load_from("definitely_missing_wmap_config").expect("defaults");
        cfg.dispatch.prefix = "/wmap/app".to_string();
        cfg.logging.access_log = false;
        cfg.performance.max_connections = max_connections;
        Arc::new(AppState::new(cfg))
    }

    async fn roundtrip(addr: SocketAddr, target: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.expect("connect");
        let request =
            format!("GET {target} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.expect("write");

        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.expect("read");
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn test_serves_requests_until_shutdown() {
        let listener =
            create_reusable_listener("127.0.0.1:0".parse().expect("addr")).expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let signals = Arc::new(SignalHandler::new());
        let counter = Arc::new(AtomicUsize::new(0));

        LocalSet::new()
            .run_until(async {
                let server = tokio::task::spawn_local(start_server_loop(
                    listener,
                    test_state(None),
                    Arc::clone(&counter),
                    Arc::clone(&signals),
                ));

                let ok = roundtrip(addr, "/wmap/app/index.php/hello/index?x=1").await;
                assert!(ok.starts_with("HTTP/1.1 200 OK"), "{ok}");
                assert!(ok.to_ascii_lowercase().contains("server: wmap-hello"));
                assert!(ok.ends_with("Hello Wmap!"));

                let missing = roundtrip(addr, "/unknown/path").await;
                assert!(missing.starts_with("HTTP/1.1 404 Not Found"), "{missing}");
                assert!(missing.ends_with("Error 404"));

                signals.request_shutdown();
                tokio::time::timeout(Duration::from_secs(10), server)
                    .await
                    .expect("loop stops")
                    .expect("join")
                    .expect("clean shutdown");
            })
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_connection_limit_rejects() {
        let listener =
            create_reusable_listener("127.0.0.1:0".parse().expect("addr")).expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let signals = Arc::new(SignalHandler::new());
        // pretend one connection is already open
        let counter = Arc::new(AtomicUsize::new(1));

        LocalSet::new()
            .run_until(async {
                let server = tokio::task::spawn_local(start_server_loop(
                    listener,
                    test_state(Some(1)),
                    Arc::clone(&counter),
                    Arc::clone(&signals),
                ));

                let mut stream = TcpStream::connect(addr).await.expect("connect");
                let _ = stream
                    .write_all(b"GET /wmap/app/index.php/hello/index HTTP/1.1\r\n\r\n")
                    .await;
                let mut buf = Vec::new();
                // closed without a response, possibly with a reset
                let read = stream.read_to_end(&mut buf).await;
                assert!(read.is_err() || buf.is_empty());

                counter.store(0, Ordering::SeqCst);
                signals.request_shutdown();
                server.await.expect("join").expect("clean shutdown");
            })
            .await;
    }

    #[tokio::test]
    async fn test_drain_gives_up_after_timeout() {
        let counter = AtomicUsize::new(2);
        let left = drain_connections(&counter, Duration::from_millis(120)).await;
        assert_eq!(left, 2);

        counter.store(0, Ordering::SeqCst);
        assert_eq!(drain_connections(&counter, Duration::from_millis(120)).await, 0);
    }
}
