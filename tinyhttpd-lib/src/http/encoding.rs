//! Response body compression.
//!
//! Only gzip is offered. It is negotiated from the request's `Accept-Encoding`
//! header and applied to static file bodies.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Write};

/// Compress data using gzip
pub fn gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Whether an `Accept-Encoding` value admits gzip.
///
/// `gzip`, `x-gzip` and `*` count unless their q-value is zero.
pub fn accepts_gzip(accept_encoding: Option<&str>) -> bool {
    let Some(value) = accept_encoding else {
        return false;
    };

    value.split(',').any(|entry| {
        let mut params = entry.split(';').map(str::trim);
        let coding = params.next().unwrap_or_default();
        let matches = ["gzip", "x-gzip", "*"].iter().any(|c| coding.eq_ignore_ascii_case(c));
        matches && !params.any(is_zero_quality)
    })
}

fn is_zero_quality(param: &str) -> bool {
    let Some((key, value)) = param.split_once('=') else {
        return false;
    };
    key.trim().eq_ignore_ascii_case("q") && value.trim().parse::<f32>().is_ok_and(|q| q <= 0.0)
}
