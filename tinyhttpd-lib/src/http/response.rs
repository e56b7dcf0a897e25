use bytes::Bytes;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::encoding::gzip;

pub const GREETING: &str = "Hello, World!";
pub const TEXT_PLAIN: &str = "text/plain";

/// The two statuses the server emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
        }
    }
}

/// A fully buffered response, written to the connection in one go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub content_type: Option<&'static str>,
    pub content_encoding: Option<&'static str>,
    pub body: Bytes,
}

impl Response {
    pub fn ok(content_type: &'static str, body: impl Into<Bytes>) -> Self {
        Self {
            status: Status::Ok,
            content_type: Some(content_type),
            content_encoding: None,
            body: body.into(),
        }
    }

    pub fn greeting() -> Self {
        Self::ok(TEXT_PLAIN, GREETING)
    }

    pub fn bad_request() -> Self {
        Self { status: Status::BadRequest, content_type: None, content_encoding: None, body: Bytes::new() }
    }

    /// Replace the body with its gzip encoding.
    pub fn gzipped(self) -> io::Result<Self> {
        let body = gzip(&self.body)?;
        Ok(Self { content_encoding: Some("gzip"), body: Bytes::from(body), ..self })
    }

    pub fn is_compressed(&self) -> bool {
        self.content_encoding.is_some()
    }

    /// Status line and headers, including the terminating blank line
    pub fn head(&self) -> String {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status.code(), self.status.reason());
        if let Some(content_type) = self.content_type {
            head.push_str(&format!("Content-Type: {content_type}\r\n"));
        }
        if let Some(encoding) = self.content_encoding {
            head.push_str(&format!("Content-Encoding: {encoding}\r\n"));
        }
        head.push_str(&format!("Content-Length: {}\r\n\r\n", self.body.len()));
        head
    }

    /// Write head and body, returning the number of bytes put on the wire.
    pub async fn write_to<W>(&self, writer: &mut W) -> io::Result<usize>
    where
        W: AsyncWrite + Unpin,
    {
        let head = self.head();
        writer.write_all(head.as_bytes()).await?;
        writer.write_all(&self.body).await?;
        writer.flush().await?;
        Ok(head.len().saturating_add(self.body.len()))
    }
}
