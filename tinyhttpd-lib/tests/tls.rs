use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tinyhttpd_lib::config::TlsConfig;
use tinyhttpd_lib::{build_rustls, Server, ServerError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

mod helpers;
use helpers::{create_valid_test_cert, get, test_config, TestResult};

fn tls_config(cert: &std::path::Path, key: &std::path::Path) -> TlsConfig {
    TlsConfig { cert_path: cert.display().to_string(), key_path: key.display().to_string() }
}

#[test]
fn test_build_rustls_success() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let (cert, key, _) = create_valid_test_cert(dir.path())?;

    assert!(build_rustls(&tls_config(&cert, &key)).is_ok());
    Ok(())
}

#[test]
fn test_build_rustls_missing_cert() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let (_, key, _) = create_valid_test_cert(dir.path())?;

    let result = build_rustls(&tls_config(&dir.path().join("absent.crt"), &key));
    assert!(matches!(result, Err(ServerError::Tls(ref msg)) if msg.contains("certificate")));
    Ok(())
}

#[test]
fn test_build_rustls_missing_key() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let (cert, _, _) = create_valid_test_cert(dir.path())?;

    let result = build_rustls(&tls_config(&cert, &dir.path().join("absent.key")));
    assert!(matches!(result, Err(ServerError::Tls(ref msg)) if msg.contains("key")));
    Ok(())
}

#[test]
fn test_build_rustls_empty_cert_file() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let (_, key, _) = create_valid_test_cert(dir.path())?;
    let empty = dir.path().join("empty.crt");
    fs::write(&empty, "")?;

    let result = build_rustls(&tls_config(&empty, &key));
    assert!(matches!(result, Err(ServerError::Tls(_))));
    Ok(())
}

#[test]
fn test_build_rustls_no_private_key() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let (cert, _, _) = create_valid_test_cert(dir.path())?;
    let keyless = dir.path().join("keyless.pem");
    // A certificate where the key should be
    fs::copy(&cert, &keyless)?;

    let result = build_rustls(&tls_config(&cert, &keyless));
    assert!(matches!(result, Err(ServerError::NoPrivateKey)));
    Ok(())
}

#[tokio::test]
async fn test_bind_fails_before_listening_on_bad_tls() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let mut cfg = test_config(dir.path());
    cfg.tls = Some(tls_config(&dir.path().join("nope.crt"), &dir.path().join("nope.key")));

    assert!(matches!(Server::bind(cfg.into()).await, Err(ServerError::Tls(_))));
    Ok(())
}

#[tokio::test]
async fn test_https_get_serves_file() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let (cert, key, cert_der) = create_valid_test_cert(dir.path())?;
    fs::write(dir.path().join("index.html"), "<h1>secure</h1>")?;

    let mut cfg = test_config(dir.path());
    cfg.tls = Some(tls_config(&cert, &key));
    let server = Server::bind(cfg.into()).await?;
    assert!(server.is_tls());
    let handle = server.start();

    let mut roots = RootCertStore::empty();
    roots.add(cert_der)?;
    let client_config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(client_config));
    let server_name = ServerName::try_from("localhost")?;

    for (path, body) in [("/index.html", &b"<h1>secure</h1>"[..]), ("/home", b"Hello, World!")] {
        let tcp = TcpStream::connect(handle.local_addr()).await?;
        let mut tls = connector.connect(server_name.clone(), tcp).await?;
        tls.write_all(format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n").as_bytes())
            .await?;

        let mut out = Vec::new();
        // The server closes right after the response; a missing close_notify is tolerated.
        let _ = timeout(Duration::from_secs(5), tls.read_to_end(&mut out)).await?;
        assert!(out.starts_with(b"HTTP/1.1 200 OK"), "{path}: {:?}", String::from_utf8_lossy(&out));
        assert!(out.ends_with(body), "{path}");
    }

    handle.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_plain_client_on_tls_port_gets_nothing() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let (cert, key, _) = create_valid_test_cert(dir.path())?;

    let mut cfg = test_config(dir.path());
    cfg.tls = Some(tls_config(&cert, &key));
    cfg.timeout.read_ms = Some(500);
    let handle = Server::bind(cfg.into()).await?.start();

    let result = get(handle.local_addr(), "/home").await;
    if let Ok(raw) = result {
        assert!(!raw.starts_with(b"HTTP/1.1 200"), "plaintext must not be served on a TLS port");
    }

    handle.stop().await?;
    Ok(())
}
