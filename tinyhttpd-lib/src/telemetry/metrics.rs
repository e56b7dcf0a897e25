use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Meter, UpDownCounter};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;

use crate::error::{Result, ServerError};

pub mod labels {
    pub const ERROR_TYPE: &str = "error_type";
    pub const REASON: &str = "reason";
    pub const STATUS_CODE: &str = "status_code";
    pub const METHOD: &str = "method";
    pub const VERSION: &str = "version";
}

pub mod values {
    pub const REJECT_RATE_LIMITED: &str = "rate_limited";
    pub const REJECT_SHUTDOWN: &str = "shutdown";
    pub const ERROR_ACCEPT: &str = "accept";
    pub const ERROR_READ: &str = "read";
    pub const ERROR_WRITE: &str = "write";
    pub const ERROR_TLS_HANDSHAKE: &str = "tls_handshake";
}

#[derive(Clone)]
pub struct Metrics {
    pub connections_total: Counter<u64>,
    pub connections_active: UpDownCounter<i64>,
    pub connections_rejected_total: Counter<u64>,

    pub rate_limit_allowed_total: Counter<u64>,
    pub rate_limit_rejected_total: Counter<u64>,

    pub requests_total: Counter<u64>,
    pub unsupported_requests_total: Counter<u64>,
    pub bytes_sent_total: Counter<u64>,
    pub responses_compressed_total: Counter<u64>,

    pub errors_total: Counter<u64>,

    pub build_info: Gauge<u64>,
}

impl Metrics {
    pub fn new(meter: Meter) -> Self {
        Self {
            connections_total: meter
                .u64_counter("tinyhttpd_connections_total")
                .with_description("Total number of connections admitted")
                .build(),
            connections_active: meter
                .i64_up_down_counter("tinyhttpd_connections_active")
                .with_description("Number of connections currently being handled")
                .build(),
            connections_rejected_total: meter
                .u64_counter("tinyhttpd_connections_rejected_total")
                .with_description("Total number of accepted sockets closed without service")
                .build(),

            rate_limit_allowed_total: meter
                .u64_counter("tinyhttpd_rate_limit_allowed_total")
                .with_description("Admission checks that passed the per-client rate limit")
                .build(),
            rate_limit_rejected_total: meter
                .u64_counter("tinyhttpd_rate_limit_rejected_total")
                .with_description("Admission checks rejected by the per-client rate limit")
                .build(),

            requests_total: meter
                .u64_counter("tinyhttpd_requests_total")
                .with_description("Total number of responses written")
                .build(),
            unsupported_requests_total: meter
                .u64_counter("tinyhttpd_unsupported_requests_total")
                .with_description("Connections closed without a response (non-GET or empty)")
                .build(),
            bytes_sent_total: meter
                .u64_counter("tinyhttpd_bytes_sent_total")
                .with_description("Total bytes written to clients")
                .build(),
            responses_compressed_total: meter
                .u64_counter("tinyhttpd_responses_compressed_total")
                .with_description("Responses sent with a gzip body")
                .build(),

            errors_total: meter
                .u64_counter("tinyhttpd_errors_total")
                .with_description("Per-connection and accept errors")
                .build(),

            build_info: meter
                .u64_gauge("tinyhttpd_build_info")
                .with_description("Build information")
                .build(),
        }
    }

    fn set_build_info(&self) {
        self.build_info
            .record(1, &[KeyValue::new(labels::VERSION, env!("CARGO_PKG_VERSION"))]);
    }

    pub fn record_rate_limit(&self, allowed: bool) {
        if allowed {
            self.rate_limit_allowed_total.add(1, &[]);
        } else {
            self.rate_limit_rejected_total.add(1, &[]);
        }
    }

    pub fn record_rejection(&self, reason: &'static str) {
        self.connections_rejected_total
            .add(1, &[KeyValue::new(labels::REASON, reason)]);
    }

    pub fn record_response(&self, method: &str, status_code: u16, bytes: usize, compressed: bool) {
        self.requests_total.add(
            1,
            &[
                KeyValue::new(labels::METHOD, method.to_string()),
                KeyValue::new(labels::STATUS_CODE, status_code.to_string()),
            ],
        );
        self.bytes_sent_total.add(bytes as u64, &[]);
        if compressed {
            self.responses_compressed_total.add(1, &[]);
        }
    }

    pub fn record_unsupported(&self) {
        self.unsupported_requests_total.add(1, &[]);
    }

    pub fn record_error(&self, error_type: &'static str) {
        self.errors_total
            .add(1, &[KeyValue::new(labels::ERROR_TYPE, error_type)]);
    }
}

/// Install a Prometheus-backed meter provider and build the server's instruments
pub fn init_metrics() -> Result<(Arc<Metrics>, Registry)> {
    let registry = Registry::default();

    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()
        .map_err(|e| ServerError::Telemetry(format!("Failed to build prometheus exporter: {e}")))?;

    let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

    global::set_meter_provider(meter_provider);

    let meter = global::meter("tinyhttpd");
    let metrics = Arc::new(Metrics::new(meter));

    metrics.set_build_info();

    Ok((metrics, registry))
}
