use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Events go to stderr; stdout carries rendered output only.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "folio_cache_hit_total",
            Unit::Count,
            "Total number of note lookups served from the store."
        );
        describe_counter!(
            "folio_cache_miss_total",
            Unit::Count,
            "Total number of note lookups that went to the gateway."
        );
        describe_counter!(
            "folio_cache_evict_total",
            Unit::Count,
            "Total number of notes evicted due to the entry limit."
        );
        describe_counter!(
            "folio_cache_stale_write_total",
            Unit::Count,
            "Total number of fetch results discarded because a newer request superseded them."
        );
        describe_counter!(
            "folio_gateway_request_total",
            Unit::Count,
            "Total number of requests sent to the content API."
        );
        describe_histogram!(
            "folio_gateway_request_ms",
            Unit::Milliseconds,
            "Content API request latency in milliseconds."
        );
    });
}
