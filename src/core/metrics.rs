use std::net::SocketAddr;
use std::sync::OnceLock;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::core::config::Settings;

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Starts the Prometheus scrape endpoint when enabled. Safe to call more
/// than once; only the first call installs the recorder.
pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    if INSTALLED.get().is_some() {
        return Ok(());
    }

    let addr: SocketAddr = settings
        .telemetry()
        .prometheus_addr
        .parse()
        .with_context(|| format!("invalid PROMETHEUS_ADDR: {}", settings.telemetry().prometheus_addr))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    let _ = INSTALLED.set(());
    Ok(())
}
