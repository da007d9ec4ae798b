/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Axum router and shared handler state.

pub mod error;
mod handlers;
pub mod wire;
mod ws;

use axum::http::{header, request, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use ferry::RelayEngine;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::allow_list::OriginAllowList;

pub use error::ApiError;

/// Request bodies larger than this are rejected before reaching a handler.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: RelayEngine,
    pub origins: OriginAllowList,
    connections: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(engine: RelayEngine, origins: OriginAllowList) -> Self {
        Self {
            engine,
            origins,
            connections: Arc::new(AtomicU64::new(0)),
        }
    }

    pub(crate) fn next_connection_id(&self) -> u64 {
        self.connections.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(state.origins.clone());

    Router::new()
        .route("/health", get(handlers::health))
        .route("/ws", get(ws::ws_handler))
        .route("/api/request", post(handlers::create_request))
        .route(
            "/api/request/{category}/{request_id}",
            get(handlers::get_request),
        )
        .route(
            "/api/request/{category}/{request_id}/claim",
            post(handlers::claim_request),
        )
        .route(
            "/api/request/{category}/{request_id}/complete",
            post(handlers::complete_request),
        )
        .route(
            "/api/request-result/{category}/{request_id}",
            get(handlers::get_request_result),
        )
        .route("/api/pending-requests", get(handlers::list_pending))
        .route("/api/response", post(handlers::receive_response))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .map_response(|res: axum::response::Response<_>| res.map(axum::body::Body::new))
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

fn cors_layer(origins: OriginAllowList) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request: &request::Parts| {
                origin
                    .to_str()
                    .map(|origin| origins.allows(origin))
                    .unwrap_or(false)
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}
