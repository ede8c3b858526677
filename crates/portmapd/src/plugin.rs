//! Docker port-mapper plugin protocol
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/Plugin.Activate` | Handshake, lists `PortMapper` |
//! | POST | `/PortMapper.MapPorts` | Publish bindings through the tunnel |
//! | POST | `/PortMapper.UnmapPorts` | Withdraw ingress and CNAME |
//!
//! Bodies are JSON with PascalCase field names. Failures are answered with
//! `{"Err": "<message>"}`: status 400 for an unreadable body, 500 for a
//! mapping error.

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use portmap_core::{CallContext, LabelSet, PortBinding, PortBindingRequest, PortMapper, Protocol};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Shared state for plugin handlers
#[derive(Clone)]
pub struct PluginState {
    mapper: PortMapper,
    cancel: watch::Receiver<bool>,
}

impl PluginState {
    /// Calls are cancelled once `true` is published on `cancel`
    pub fn new(mapper: PortMapper, cancel: watch::Receiver<bool>) -> Self {
        Self { mapper, cancel }
    }

    fn call_context(&self) -> CallContext {
        CallContext::with_cancel(self.cancel.clone())
    }
}

/// Build the plugin router
pub fn build_router(state: PluginState) -> Router {
    Router::new()
        .route("/Plugin.Activate", post(activate))
        .route("/PortMapper.MapPorts", post(map_ports))
        .route("/PortMapper.UnmapPorts", post(unmap_ports))
        .with_state(state)
}

// ── Wire types ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ActivateResponse {
    implements: Vec<&'static str>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireBindingRequest {
    #[serde(rename = "Proto")]
    proto: Protocol,
    #[serde(rename = "FrontendIP")]
    frontend_ip: IpAddr,
    #[serde(rename = "FrontendPort", default)]
    frontend_port: u16,
    #[serde(rename = "FrontendPortEnd", default)]
    frontend_port_end: u16,
    #[serde(rename = "BackendIP")]
    backend_ip: IpAddr,
    #[serde(rename = "BackendPort")]
    backend_port: u16,
}

impl From<WireBindingRequest> for PortBindingRequest {
    fn from(w: WireBindingRequest) -> Self {
        PortBindingRequest {
            protocol: w.proto,
            frontend_ip: w.frontend_ip,
            frontend_port: w.frontend_port,
            frontend_port_end: w.frontend_port_end,
            backend_ip: w.backend_ip,
            backend_port: w.backend_port,
        }
    }
}

#[derive(Debug, Serialize)]
struct WireBinding {
    #[serde(rename = "Proto")]
    proto: Protocol,
    #[serde(rename = "BackendIP")]
    backend_ip: IpAddr,
    #[serde(rename = "BackendPort")]
    backend_port: u16,
}

impl From<PortBinding> for WireBinding {
    fn from(b: PortBinding) -> Self {
        WireBinding {
            proto: b.protocol,
            backend_ip: b.backend_ip,
            backend_port: b.backend_port,
        }
    }
}

// Docker sends `null` for empty slices and maps.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MapPortsRequest {
    #[serde(default)]
    reqs: Option<Vec<WireBindingRequest>>,
    #[serde(default)]
    labels: Option<LabelSet>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MapPortsResponse {
    port_bindings: Vec<WireBinding>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UnmapPortsRequest {
    #[serde(default)]
    labels: Option<LabelSet>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    #[serde(rename = "Err")]
    err: String,
}

fn error_response(msg: String, status: StatusCode) -> Response {
    (status, Json(ErrorResponse { err: msg })).into_response()
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &Bytes) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| {
        error!("{}: malformed request body: {}", endpoint, e);
        error_response(format!("malformed request: {}", e), StatusCode::BAD_REQUEST)
    })
}

// ── Handlers ───────────────────────────────────────────────────

/// POST /Plugin.Activate
async fn activate() -> Json<ActivateResponse> {
    debug!("Plugin activated");
    Json(ActivateResponse {
        implements: vec!["PortMapper"],
    })
}

/// POST /PortMapper.MapPorts
async fn map_ports(State(state): State<PluginState>, body: Bytes) -> Response {
    let req: MapPortsRequest = match decode("MapPorts", &body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };

    let reqs: Vec<PortBindingRequest> = req
        .reqs
        .unwrap_or_default()
        .into_iter()
        .map(PortBindingRequest::from)
        .collect();
    let labels = req.labels.unwrap_or_default();

    match state
        .mapper
        .map_ports(&state.call_context(), reqs, &labels)
        .await
    {
        Ok(bindings) => Json(MapPortsResponse {
            port_bindings: bindings.into_iter().map(WireBinding::from).collect(),
        })
        .into_response(),
        Err(e) => {
            error!("MapPorts failed: {}", e);
            error_response(e.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// POST /PortMapper.UnmapPorts
async fn unmap_ports(State(state): State<PluginState>, body: Bytes) -> Response {
    let req: UnmapPortsRequest = match decode("UnmapPorts", &body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let labels = req.labels.unwrap_or_default();

    match state.mapper.unmap_ports(&state.call_context(), &labels).await {
        Ok(()) => {
            info!("UnmapPorts completed");
            Json(serde_json::json!({})).into_response()
        }
        Err(e) => {
            error!("UnmapPorts failed: {}", e);
            error_response(e.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
