use std::net::IpAddr;
use std::ops::RangeInclusive;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::{gateway::ScanGateway, ports};

/// Shared handler state: just the front door to the scan engine.
#[derive(Clone)]
pub struct AppState {
    pub gateway: ScanGateway,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/scan/{ip}/{start_port}/{end_port}", get(get_scan))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `bind` and serve the API until Ctrl-C.
pub async fn serve(bind: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(%bind, "serving scan API");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

/// `GET /scan/{ip}/{start_port}/{end_port}`
///
/// Validates the path parameters, submits the scan, and answers with the
/// batch as a JSON array of `{port, state}` objects. Outcomes are in
/// completion order. Invalid input never reaches the engine.
async fn get_scan(
    State(app): State<AppState>,
    Path((ip, start_port, end_port)): Path<(String, String, String)>,
) -> Response {
    info!(%ip, %start_port, %end_port, "scan request received");

    let (ip, ports) = match validate_request(&ip, &start_port, &end_port) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!(error = %err, "rejecting invalid scan request");
            return (
                StatusCode::BAD_REQUEST,
                format!("Invalid IP or ports range: {err}"),
            )
                .into_response();
        }
    };

    match app.gateway.submit(ip, ports).await {
        Ok(outcomes) => (StatusCode::OK, Json(outcomes)).into_response(),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("scan failed: {err}"),
        )
            .into_response(),
    }
}

fn validate_request(
    ip: &str,
    start_port: &str,
    end_port: &str,
) -> Result<(IpAddr, RangeInclusive<u16>)> {
    let ip = ip
        .parse::<IpAddr>()
        .with_context(|| format!("invalid IP: {ip}"))?;
    let ports = ports::port_range(start_port, end_port)?;
    Ok((ip, ports))
}
