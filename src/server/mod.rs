// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! HTTP surface over [`ResourceInterface`]
//!
//! Short routes (`/namespaces/{namespace}/{resources}`) resolve the
//! resource name through the registry, so `po`, `pod` and `pods` all
//! work. The `/api` and `/apis` routes take the GVR verbatim and reach
//! fallback-table resources as well.

mod error;
mod routes;

pub use error::{ApiError, ErrorBody};

use anyhow::Context;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::kubernetes::ResourceRegistry;
use crate::resources::ResourceInterface;

#[derive(Clone)]
pub struct AppState {
    pub resources: Arc<dyn ResourceInterface>,
    pub registry: Arc<ResourceRegistry>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(routes::healthz))
        .route("/{resources}", get(routes::list_cluster))
        .route("/{resources}/{name}", get(routes::get_cluster))
        .route("/namespaces/{namespace}/{resources}", get(routes::list_namespaced))
        .route("/namespaces/{namespace}/{resources}/{name}", get(routes::get_namespaced))
        .route("/api/v1/{resources}", get(routes::list_core))
        .route("/api/v1/{resources}/{name}", get(routes::get_core))
        .route("/api/v1/namespaces/{namespace}/{resources}", get(routes::list_core_namespaced))
        .route(
            "/api/v1/namespaces/{namespace}/{resources}/{name}",
            get(routes::get_core_namespaced),
        )
        .route("/apis/{group}/{version}/{resources}", get(routes::list_group))
        .route("/apis/{group}/{version}/{resources}/{name}", get(routes::get_group))
        .route(
            "/apis/{group}/{version}/namespaces/{namespace}/{resources}",
            get(routes::list_group_namespaced),
        )
        .route(
            "/apis/{group}/{version}/namespaces/{namespace}/{resources}/{name}",
            get(routes::get_group_namespaced),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// HTTP server for the listing API
pub struct HttpServer {
    port: u16,
    bind_address: String,
}

impl HttpServer {
    pub fn new(port: u16, bind_address: String) -> Self {
        Self { port, bind_address }
    }

    /// Serve until Ctrl-C
    pub async fn run(&self, state: AppState) -> anyhow::Result<()> {
        let server_addr = format!("{}:{}", self.bind_address, self.port);
        let listener = TcpListener::bind(&server_addr)
            .await
            .with_context(|| format!("Failed to bind {}", server_addr))?;

        info!(addr = %server_addr, "HTTP server listening");
        println!("k8slist listening on http://{}", server_addr);

        axum::serve(listener, router(state))
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutting down");
            })
            .await
            .context("HTTP server failed")
    }
}
