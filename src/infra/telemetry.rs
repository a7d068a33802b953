use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::{mirror, payments, ranking};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
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

const COUNTERS: &[(&str, &str)] = &[
    (
        ranking::METRIC_HIT,
        "Popular-listings requests served from the ranking cache.",
    ),
    (
        ranking::METRIC_MISS,
        "Popular-listings requests that found no cached ranking.",
    ),
    (
        ranking::METRIC_UNAVAILABLE,
        "Ranking cache reads or writes that failed or timed out.",
    ),
    (
        ranking::METRIC_RECOMPUTE,
        "Ranking computations issued against the database.",
    ),
    (
        ranking::METRIC_COALESCED,
        "Ranking misses that waited on another caller's fill.",
    ),
    (
        mirror::METRIC_FAILURE,
        "Search index writes that failed after the listing change committed.",
    ),
    (
        payments::METRIC_REJECTED,
        "Payment webhook deliveries rejected before any state change.",
    ),
];

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        for (name, description) in COUNTERS {
            describe_counter!(*name, Unit::Count, *description);
        }
    });
}
