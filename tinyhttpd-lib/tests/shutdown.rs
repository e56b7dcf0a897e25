use std::sync::Arc;
use std::time::Duration;

use tinyhttpd_lib::{ServerError, ServerState};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};

mod helpers;
use helpers::{get, start_server, test_config, wait_until, TestResult};

#[tokio::test]
async fn test_stop_with_nothing_in_flight_is_immediate() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let handle = start_server(test_config(dir.path())).await?;

    let raw = get(handle.local_addr(), "/home").await?;
    assert!(raw.ends_with(b"Hello, World!"));

    let started = Instant::now();
    handle.stop().await?;
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(handle.in_flight(), 0);
    assert_eq!(*handle.state().borrow(), ServerState::Stopped);
    Ok(())
}

#[tokio::test]
async fn test_listener_is_closed_after_stop() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let handle = start_server(test_config(dir.path())).await?;
    let addr = handle.local_addr();

    handle.stop().await?;

    let connect = timeout(Duration::from_secs(2), TcpStream::connect(addr)).await?;
    assert!(connect.is_err(), "no new connection may be accepted after stop");
    Ok(())
}

#[tokio::test]
async fn test_stop_is_idempotent() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let handle = start_server(test_config(dir.path())).await?;

    handle.stop().await?;
    handle.stop().await?;
    assert_eq!(*handle.state().borrow(), ServerState::Stopped);
    Ok(())
}

#[tokio::test]
async fn test_in_flight_request_completes_during_drain() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let handle = Arc::new(start_server(test_config(dir.path())).await?);

    // Admitted but silent: the handler is parked on its read.
    let mut client = TcpStream::connect(handle.local_addr()).await?;
    let counted = wait_until(|| handle.in_flight() == 1).await;
    assert!(counted, "connection was never admitted");

    let stopper = {
        let handle = Arc::clone(&handle);
        tokio::spawn(async move { handle.stop().await })
    };

    let mut state = handle.state();
    timeout(Duration::from_secs(2), state.wait_for(|s| *s >= ServerState::Draining)).await??;

    client.write_all(b"GET /home HTTP/1.1\r\n\r\n").await?;
    let mut out = Vec::new();
    timeout(Duration::from_secs(2), client.read_to_end(&mut out)).await??;
    assert!(out.ends_with(b"Hello, World!"));

    stopper.await??;
    assert_eq!(handle.in_flight(), 0);
    assert_eq!(*handle.state().borrow(), ServerState::Stopped);
    Ok(())
}

#[tokio::test]
async fn test_drain_deadline_reports_stuck_connections() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let mut cfg = test_config(dir.path());
    cfg.timeout.shutdown_secs = 1;
    let handle = start_server(cfg).await?;
    assert_eq!(handle.drain_timeout(), Duration::from_secs(1));

    let mut client = TcpStream::connect(handle.local_addr()).await?;
    let counted = wait_until(|| handle.in_flight() == 1).await;
    assert!(counted, "connection was never admitted");

    let started = Instant::now();
    let result = handle.stop().await;
    let waited = started.elapsed();

    assert!(matches!(result, Err(ServerError::ShutdownTimeout { active: 1 })), "got {result:?}");
    assert!(waited >= Duration::from_millis(900), "returned after {waited:?}");
    assert!(waited < Duration::from_secs(3), "returned after {waited:?}");
    assert_eq!(*handle.state().borrow(), ServerState::Draining);

    // The handler was not aborted and still answers.
    client.write_all(b"GET /home HTTP/1.1\r\n\r\n").await?;
    let mut out = Vec::new();
    timeout(Duration::from_secs(2), client.read_to_end(&mut out)).await??;
    assert!(out.ends_with(b"Hello, World!"));

    let drained = wait_until(|| handle.in_flight() == 0).await;
    assert!(drained);
    Ok(())
}

#[tokio::test]
async fn test_bind_conflict_is_fatal() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let first = start_server(test_config(dir.path())).await?;

    let mut cfg = test_config(dir.path());
    cfg.port = first.local_addr().port();
    let second = tinyhttpd_lib::Server::bind(cfg.into()).await;
    assert!(matches!(second, Err(ServerError::Bind { .. })));

    first.stop().await?;
    Ok(())
}
