//! HTTP server setup and the scrape handler.

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use virtmon_collector::{collect_host, up, LibvirtCollector, Measurement, ScrapeContext};
use virtmon_hypervisor::{Connector, MockConnector};
use virtmon_telemetry::TelemetryCollector;

use crate::config::{Config, HypervisorBackend};
use crate::render::render;

/// Shared state of the HTTP handlers.
pub struct AppState {
    pub collector: Arc<LibvirtCollector>,
    pub telemetry: Option<Arc<TelemetryCollector>>,
    pub scrape_timeout: Duration,
}

/// Build the hypervisor connector selected by the configuration.
///
/// Fails when the libvirt backend is selected in a build without the
/// `libvirt` feature.
pub fn build_connector(config: &Config) -> Result<Arc<dyn Connector>> {
    match config.libvirt.backend {
        HypervisorBackend::Mock => {
            info!("Using mock hypervisor backend");
            Ok(Arc::new(MockConnector::demo()))
        }
        HypervisorBackend::Libvirt => {
            #[cfg(feature = "libvirt")]
            {
                info!(uri = %config.libvirt.uri, "Using libvirt backend");
                Ok(Arc::new(virtmon_hypervisor::LibvirtConnector::new()))
            }
            #[cfg(not(feature = "libvirt"))]
            {
                anyhow::bail!(
                    "libvirt backend requested but this build lacks the `libvirt` feature; \
                     rebuild with `--features libvirt` or set `libvirt.backend: mock`"
                )
            }
        }
    }
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let collector = LibvirtCollector::new(build_connector(config)?, config.libvirt.uri.clone());
        let telemetry = config
            .host
            .enabled
            .then(|| {
                Arc::new(
                    TelemetryCollector::new(&config.host.proc_root)
                        .with_sys_root(&config.host.sys_root),
                )
            });
        Ok(Self {
            collector: Arc::new(collector),
            telemetry,
            scrape_timeout: config.libvirt.scrape_timeout(),
        })
    }

    /// Run one scrape: the hypervisor cycle, the health gauge and host
    /// metrics.
    pub async fn scrape(&self) -> Vec<Measurement> {
        let mut measurements = self.scrape_hypervisor().await;

        if let Some(telemetry) = &self.telemetry {
            let telemetry = Arc::clone(telemetry);
            match tokio::task::spawn_blocking(move || {
                let mut out = Vec::new();
                collect_host(&telemetry, &mut out);
                out
            })
            .await
            {
                Ok(mut host) => measurements.append(&mut host),
                Err(e) => error!(error = %e, "Host metrics task failed"),
            }
        }

        measurements
    }

    async fn scrape_hypervisor(&self) -> Vec<Measurement> {
        let ctx = ScrapeContext::with_timeout(self.scrape_timeout);
        let cancel = ctx.cancel_handle();
        let collector = Arc::clone(&self.collector);

        // libvirt calls block, so the whole cycle runs off the async runtime
        let task = tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            let result = collector.collect(&ctx, &mut out);
            (result, out)
        });

        let (ok, mut out) = match tokio::time::timeout(self.scrape_timeout, task).await {
            Ok(Ok((Ok(summary), out))) => {
                debug!(
                    domains = summary.domains,
                    failed_domains = summary.failed_domains,
                    measurements = summary.measurements,
                    "Hypervisor scrape complete"
                );
                (true, out)
            }
            Ok(Ok((Err(e), _))) => {
                warn!(error = %e, "Hypervisor scrape failed");
                (false, Vec::new())
            }
            Ok(Err(e)) => {
                error!(error = %e, "Hypervisor scrape task failed");
                (false, Vec::new())
            }
            Err(_) => {
                cancel.store(true, std::sync::atomic::Ordering::SeqCst);
                warn!(
                    timeout_secs = self.scrape_timeout.as_secs(),
                    "Hypervisor scrape timed out"
                );
                (false, Vec::new())
            }
        };

        out.push(up(ok));
        out
    }
}

/// Build the router serving the metrics and health endpoints.
pub fn build_router(state: Arc<AppState>, metrics_path: &str) -> Router {
    Router::new()
        .route(metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    let measurements = state.scrape().await;
    match render(&measurements) {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)).into_response()
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Run the HTTP server until interrupted.
pub async fn run(config: Config) -> Result<()> {
    let addr = config.listen_addr()?;
    let state = Arc::new(AppState::from_config(&config)?);
    let app = build_router(state, &config.server.metrics_path);

    info!(
        address = %addr,
        metrics_path = %config.server.metrics_path,
        "Starting metrics server"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Metrics server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
