//! Shared test helpers for server tests
#![allow(dead_code)]

use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tinyhttpd_lib::{Config, Server, ServerHandle};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};

pub type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Loopback config on an ephemeral port with a generous rate limit
pub fn test_config(root: &Path) -> Config {
    let mut cfg = Config {
        root: root.to_path_buf(),
        host: Ipv4Addr::LOCALHOST.into(),
        port: 0,
        ..Config::default()
    };
    cfg.security.rate_limit.max_requests_per_second = 1_000;
    cfg
}

pub async fn start_server(config: Config) -> TestResult<ServerHandle> {
    let server = Server::bind(config.into()).await?;
    Ok(server.start())
}

/// Write one request and read until the server closes the connection
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> TestResult<Vec<u8>> {
    let mut client = TcpStream::connect(addr).await?;
    client.write_all(request).await?;
    let mut out = Vec::new();
    timeout(Duration::from_secs(5), client.read_to_end(&mut out)).await??;
    Ok(out)
}

pub async fn get(addr: SocketAddr, path: &str) -> TestResult<Vec<u8>> {
    send_raw(addr, format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n").as_bytes()).await
}

/// Split a raw response into its head (status line + headers) and body
pub fn split_response(raw: &[u8]) -> Option<(String, Vec<u8>)> {
    let pos = raw.windows(4).position(|w| w == b"\r\n\r\n")?;
    let head = String::from_utf8(raw[..pos].to_vec()).ok()?;
    Some((head, raw[pos + 4..].to_vec()))
}

pub fn header<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
    })
}

/// Poll `check` until it holds or two seconds pass
pub async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// Generate valid test certificates using rcgen
/// Returns paths to PEM files containing a self-signed certificate for `localhost`
/// and the certificate itself for the client trust store
pub fn create_valid_test_cert(
    dir: &Path,
) -> TestResult<(PathBuf, PathBuf, rustls_pki_types::CertificateDer<'static>)> {
    let cert_path = dir.join("test.crt");
    let key_path = dir.join("test.key");

    let rcgen::CertifiedKey { cert, signing_key } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()])?;

    fs::write(&cert_path, cert.pem())?;
    fs::write(&key_path, signing_key.serialize_pem())?;

    Ok((cert_path, key_path, cert.der().clone()))
}
