//! Logging and metrics setup.

use std::net::SocketAddr;

use metrics::{Unit, describe_counter, describe_histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{Config, LogFormat};

/// Installs the global tracing subscriber.
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

/// Installs the Prometheus recorder with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!("orders_created_total", "Orders placed by the orchestrator");
    describe_counter!(
        "order_transitions_total",
        "Completed order status transitions, by transition"
    );
    describe_counter!("orders_cancelled_total", "Orders cancelled and refunded");
    describe_counter!(
        "workflow_executions_started_total",
        "Durable order executions started"
    );
    describe_counter!("workflow_signals_total", "Signals received, by signal name");
    describe_counter!(
        "workflow_executions_completed_total",
        "Durable order executions settled and completed"
    );
    describe_counter!(
        "workflow_executions_failed_total",
        "Durable order executions that failed terminally"
    );
    describe_histogram!(
        "workflow_duration_seconds",
        Unit::Seconds,
        "Time from execution start to completion or failure"
    );
}
