//! OpenTelemetry metrics observer
//!
//! Exports over OTLP when an endpoint is configured:
//! - `email_queued_total`: emails accepted and queued
//! - `email_processing_seconds`: delivery attempt durations, by `success`
//! - `email_failures_total`: failed attempts, by `reason` class

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Context;
use clap::Parser;
use lazy_static::lazy_static;
use opentelemetry::{
    metrics::{Histogram, Meter},
    KeyValue,
};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::domain::emails::EmailMetrics;

lazy_static! {
    static ref SMTP_REPLY_CODE: Regex =
        Regex::new(r"\b([45])\d\d\b").expect("reply code regex is valid");
}

/// Metrics export configuration
#[derive(Debug, Clone, Parser)]
pub struct MetricsConfig {
    /// OTLP/HTTP endpoint metrics are pushed to; nothing is exported when unset
    #[arg(long = "otlp-endpoint", env = "OTEL_EXPORTER_OTLP_METRICS_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

/// Install the global meter provider described by `config`.
///
/// Returns the provider so it can be shut down, flushing pending exports, when the process stops.
#[mutants::skip]
pub fn init_metrics(config: &MetricsConfig) -> anyhow::Result<Option<SdkMeterProvider>> {
    let Some(endpoint) = &config.otlp_endpoint else {
        info!("OTLP endpoint not configured, metrics are not exported");

        return Ok(None);
    };

    info!(%endpoint, "exporting metrics over OTLP");

    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_http()
        .with_endpoint(endpoint.clone())
        .build()
        .context("failed to build OTLP metrics exporter")?;

    let provider = SdkMeterProvider::builder()
        .with_reader(PeriodicReader::builder(exporter).build())
        .build();

    opentelemetry::global::set_meter_provider(provider.clone());

    Ok(Some(provider))
}

/// The class a delivery failure reason falls into
///
/// Reasons carry addresses and ids, so they are never used as metric keys themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FailureKind {
    /// The server rejected the email for good (5xx)
    Permanent,

    /// The server asked to try again later (4xx)
    Transient,

    /// The server did not answer in time
    Timeout,

    /// The server could not be reached or the TLS handshake failed
    Connection,

    /// The email could not be turned into a deliverable message
    InvalidMessage,

    /// Anything else
    Other,
}

impl FailureKind {
    const ALL: [FailureKind; 6] = [
        Self::Permanent,
        Self::Transient,
        Self::Timeout,
        Self::Connection,
        Self::InvalidMessage,
        Self::Other,
    ];

    /// Classify a failure reason
    pub fn classify(reason: &str) -> Self {
        let reason = reason.to_lowercase();

        if reason.contains("permanent") {
            return Self::Permanent;
        }

        if reason.contains("transient") {
            return Self::Transient;
        }

        if let Some(code) = SMTP_REPLY_CODE.captures(&reason) {
            return if &code[1] == "5" {
                Self::Permanent
            } else {
                Self::Transient
            };
        }

        if reason.contains("timed out") || reason.contains("timeout") {
            Self::Timeout
        } else if ["connection", "network", "tls", "dns"]
            .iter()
            .any(|word| reason.contains(word))
        {
            Self::Connection
        } else if reason.starts_with("invalid email") {
            Self::InvalidMessage
        } else {
            Self::Other
        }
    }

    /// The metric attribute value
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Permanent => "permanent",
            Self::Transient => "transient",
            Self::Timeout => "timeout",
            Self::Connection => "connection",
            Self::InvalidMessage => "invalid_message",
            Self::Other => "other",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    sent: AtomicU64,
    failed: AtomicU64,
    processing_micros: AtomicU64,
    failures: [AtomicU64; FailureKind::ALL.len()],
}

/// Observer recording to OpenTelemetry instruments
///
/// The counters behind the observable instruments also back [`EmailMetricsRecorder::snapshot`],
/// so the exported values and the snapshot agree. Clones share the same counters.
#[derive(Debug, Clone)]
pub struct EmailMetricsRecorder {
    counters: Arc<Counters>,
    processing_seconds: Histogram<f64>,
}

/// Counters at a point in time
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EmailMetricsSnapshot {
    /// Emails accepted and queued
    #[schema(example = 42)]
    pub queued: u64,

    /// Successful delivery attempts
    #[schema(example = 40)]
    pub sent: u64,

    /// Failed delivery attempts
    #[schema(example = 3)]
    pub failed: u64,

    /// Time spent in delivery attempts, in milliseconds
    #[schema(example = 1250)]
    pub processing_time_ms: u64,

    /// Failed attempts per reason class
    #[schema(example = json!({"permanent": 2, "timeout": 1}))]
    pub failures: BTreeMap<String, u64>,
}

impl EmailMetricsRecorder {
    /// Create a recorder on the global meter provider
    pub fn new() -> Self {
        Self::with_meter(&meter())
    }

    /// Create a recorder whose instruments come from `meter`
    pub fn with_meter(meter: &Meter) -> Self {
        let counters = Arc::new(Counters::default());

        let queued = counters.clone();
        meter
            .u64_observable_counter("email_queued_total")
            .with_description("Emails accepted and queued")
            .with_callback(move |observer| {
                observer.observe(queued.queued.load(Ordering::Relaxed), &[]);
            })
            .build();

        let failures = counters.clone();
        meter
            .u64_observable_counter("email_failures_total")
            .with_description("Failed delivery attempts by reason class")
            .with_callback(move |observer| {
                for kind in FailureKind::ALL {
                    observer.observe(
                        failures.failures[kind.index()].load(Ordering::Relaxed),
                        &[KeyValue::new("reason", kind.as_str())],
                    );
                }
            })
            .build();

        let processing_seconds = meter
            .f64_histogram("email_processing_seconds")
            .with_unit("s")
            .with_description("Duration of delivery attempts")
            .build();

        Self {
            counters,
            processing_seconds,
        }
    }

    /// Read the current counters
    pub fn snapshot(&self) -> EmailMetricsSnapshot {
        EmailMetricsSnapshot {
            queued: self.counters.queued.load(Ordering::Relaxed),
            sent: self.counters.sent.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            processing_time_ms: self.counters.processing_micros.load(Ordering::Relaxed) / 1_000,
            failures: FailureKind::ALL
                .iter()
                .filter_map(|kind| {
                    let count = self.counters.failures[kind.index()].load(Ordering::Relaxed);

                    (count > 0).then(|| (kind.as_str().to_string(), count))
                })
                .collect(),
        }
    }
}

impl Default for EmailMetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmailMetrics for EmailMetricsRecorder {
    fn on_queued(&self) {
        self.counters.queued.fetch_add(1, Ordering::Relaxed);

        debug!(metric = "email_queued_total", "email queued");
    }

    fn on_processed(&self, duration: Duration, success: bool) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        self.counters
            .processing_micros
            .fetch_add(micros, Ordering::Relaxed);

        if success {
            self.counters.sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
        }

        self.processing_seconds
            .record(duration.as_secs_f64(), &[KeyValue::new("success", success)]);

        debug!(
            metric = "email_processing_seconds",
            duration_ms = duration.as_millis() as u64,
            success,
            "email processed"
        );
    }

    fn on_failure(&self, reason: &str) {
        let kind = FailureKind::classify(reason);

        self.counters.failures[kind.index()].fetch_add(1, Ordering::Relaxed);

        debug!(
            metric = "email_failures_total",
            reason = kind.as_str(),
            detail = reason,
            "email delivery failure"
        );
    }
}

fn meter() -> Meter {
    opentelemetry::global::meter("email_dispatch")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts_observations() {
        let metrics = EmailMetricsRecorder::new();
        let shared = metrics.clone();

        metrics.on_queued();
        metrics.on_queued();
        metrics.on_processed(Duration::from_millis(120), true);
        shared.on_processed(Duration::from_millis(30), false);
        shared.on_failure("permanent error (550): mailbox unavailable");
        shared.on_failure("permanent error (552): mailbox full");
        shared.on_failure("Connection error: timed out");

        assert_eq!(
            metrics.snapshot(),
            EmailMetricsSnapshot {
                queued: 2,
                sent: 1,
                failed: 1,
                processing_time_ms: 150,
                failures: BTreeMap::from([
                    ("permanent".to_string(), 2),
                    ("timeout".to_string(), 1),
                ]),
            }
        );
    }

    #[test]
    fn test_new_recorder_is_zeroed() {
        assert_eq!(
            EmailMetricsRecorder::new().snapshot(),
            EmailMetricsSnapshot::default()
        );
    }

    #[test]
    fn test_distinct_reasons_share_a_bounded_set_of_keys() {
        let metrics = EmailMetricsRecorder::new();

        for i in 0..10_000 {
            metrics.on_failure(&format!(
                "An error occurred while sending the email: 550 5.1.1 <user{i}@example.com>"
            ));
        }

        let snapshot = metrics.snapshot();

        assert_eq!(snapshot.failures.len(), 1);
        assert_eq!(snapshot.failures.get("permanent"), Some(&10_000));
    }

    #[test]
    fn test_failure_reasons_are_classified() {
        let cases = [
            ("permanent error (550): no such user", FailureKind::Permanent),
            ("transient error (421): try later", FailureKind::Transient),
            ("451 4.7.1 greylisted", FailureKind::Transient),
            ("554 5.7.1 relay denied", FailureKind::Permanent),
            ("Connection error: timed out", FailureKind::Timeout),
            ("Connection error: connection refused", FailureKind::Connection),
            ("Invalid email address: bob@", FailureKind::InvalidMessage),
            ("Invalid email: missing body", FailureKind::InvalidMessage),
            ("something unexpected", FailureKind::Other),
        ];

        for (reason, expected) in cases {
            assert_eq!(FailureKind::classify(reason), expected, "{reason}");
        }
    }

    #[test]
    fn test_addresses_with_digits_are_not_reply_codes() {
        assert_eq!(
            FailureKind::classify("rejected <user550@example.com>"),
            FailureKind::Other
        );
    }
}
