/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */
#![allow(unused)]

//! the HTTP front-end: request validation, job creation/status/result endpoints, and the
//! process entry point's supporting config/error/state types.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod state;

pub use config::EtmapConfig;
pub use errors::{EtmapServerError,Result};
pub use state::AppState;

use axum::Router;
use axum::routing::{get,post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// assembles the full route table, wrapped in request tracing and a permissive CORS layer
/// (this service has no browser-side session state to protect).
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/etmap", post(handlers::create_job))
        .route("/etmap/{id}/result", get(handlers::get_result))
        .route("/etmap/{tail}", get(handlers::get_artifact))
        .route("/healthz", get(handlers::healthz))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
