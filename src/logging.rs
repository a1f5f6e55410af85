//! # Logging module
//!
//! This module provides logging facilities and helpers

use tracing::Level;
use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt};

use crate::svc::cfg::Configuration;

// -----------------------------------------------------------------------------
// Error enumeration

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to set global default subscriber, {0}")]
    GlobalDefaultSubscriber(tracing::subscriber::SetGlobalDefaultError),
    #[cfg(feature = "trace")]
    #[error("failed to create jaeger pipeline, {0}")]
    Jaeger(opentelemetry::trace::TraceError),
}

// -----------------------------------------------------------------------------
// helpers

pub const fn level(verbosity: usize) -> Level {
    match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

#[cfg(feature = "trace")]
/// returns the tracer exporting spans to the jaeger collector
fn tracer(endpoint: &str) -> Result<opentelemetry::sdk::trace::Tracer, Error> {
    opentelemetry_jaeger::new_collector_pipeline()
        .with_service_name(env!("CARGO_PKG_NAME"))
        .with_endpoint(endpoint)
        .with_reqwest()
        .install_batch(opentelemetry::runtime::Tokio)
        .map_err(Error::Jaeger)
}

pub fn initialize(config: &Configuration, verbosity: usize) -> Result<(), Error> {
    let registry = tracing_subscriber::registry()
        .with(LevelFilter::from_level(level(verbosity)))
        .with(
            fmt::layer()
                .with_thread_names(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_target(true),
        );

    #[cfg(feature = "trace")]
    let registry = registry.with(match &config.jaeger {
        Some(jaeger) => Some(tracing_opentelemetry::layer().with_tracer(tracer(&jaeger.endpoint)?)),
        None => None,
    });

    #[cfg(not(feature = "trace"))]
    let _ = config;

    tracing::subscriber::set_global_default(registry).map_err(Error::GlobalDefaultSubscriber)
}

/// flush spans which are not yet exported
pub fn shutdown() {
    #[cfg(feature = "trace")]
    opentelemetry::global::shutdown_tracer_provider();
}
