use thiserror::Error;

/// Bytes captured from a connection in its single read
pub const MAX_REQUEST_BYTES: usize = 4096;

/// The only method the server answers
pub const METHOD_GET: &str = "GET";

/// Errors produced while parsing a request line
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestLineError {
    #[error("request line is empty")]
    Empty,
    #[error("request line has no path")]
    MissingPath,
    #[error("path must start with '/': {0}")]
    InvalidPath(String),
    #[error("request line has no HTTP version")]
    MissingVersion,
    #[error("invalid HTTP version token: {0}")]
    InvalidVersion(String),
    #[error("unexpected data after HTTP version")]
    TrailingData,
}

/// Errors produced while interpreting the captured request bytes
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("no request line received")]
    Empty,
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
    #[error("malformed request line: {0}")]
    Malformed(#[from] RequestLineError),
}

impl RequestError {
    /// Silent errors close the connection without writing a response.
    pub fn is_silent(&self) -> bool {
        !matches!(self, RequestError::Malformed(_))
    }
}

/// `<method> <path> <version>`, borrowed from the captured buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: &'a str,
    /// Request target with any query string or fragment removed
    pub path: &'a str,
    pub version: &'a str,
}

impl<'a> RequestLine<'a> {
    pub fn parse(line: &'a str) -> Result<Self, RequestLineError> {
        let mut parts = line.split_ascii_whitespace();

        let method = parts.next().ok_or(RequestLineError::Empty)?;
        let target = parts.next().ok_or(RequestLineError::MissingPath)?;
        let version = parts.next().ok_or(RequestLineError::MissingVersion)?;
        if parts.next().is_some() {
            return Err(RequestLineError::TrailingData);
        }

        if !target.starts_with('/') {
            return Err(RequestLineError::InvalidPath(target.to_string()));
        }
        if !version.starts_with("HTTP/") {
            return Err(RequestLineError::InvalidVersion(version.to_string()));
        }

        let path = target.split(['?', '#']).next().unwrap_or(target);
        Ok(Self { method, path, version })
    }
}

/// A GET request as far as this server reads it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request<'a> {
    pub line: RequestLine<'a>,
    /// Raw `Accept-Encoding` header value, if the client sent one inside the captured bytes
    pub accept_encoding: Option<&'a str>,
}

impl<'a> Request<'a> {
    /// Interpret the bytes captured by the single read.
    ///
    /// Non-GET methods (and an empty capture) are reported before the line is validated,
    /// so they never produce a response.
    pub fn parse(text: &'a str) -> Result<Self, RequestError> {
        let mut lines = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
        let request_line = lines.next().unwrap_or_default();

        let method = request_line.split_ascii_whitespace().next().ok_or(RequestError::Empty)?;
        if method != METHOD_GET {
            return Err(RequestError::UnsupportedMethod(method.to_string()));
        }

        let line = RequestLine::parse(request_line)?;
        let accept_encoding = lines
            .take_while(|l| !l.is_empty())
            .find_map(|l| header_value(l, "accept-encoding"));

        Ok(Self { line, accept_encoding })
    }
}

fn header_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let (key, value) = line.split_once(':')?;
    key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
}
