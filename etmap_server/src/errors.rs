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
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse,Response};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EtmapServerError>;

#[derive(Error,Debug)]
pub enum EtmapServerError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("orchestrator error")]
    Orchestrator(#[from] etmap_orchestrator::EtmapOrchestratorError),

    #[error("job store unavailable")]
    StoreUnavailable(#[from] etmap_store::EtmapStoreError),

    #[error("io error")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    details: String,
}

/// translates ValidationError/NotFound into the matching status code; everything else
/// becomes a redacted 500 - the real error is logged but never echoed to the client.
impl IntoResponse for EtmapServerError {
    fn into_response(self) -> Response {
        match self {
            EtmapServerError::ValidationError(details) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody { error: "validation_error".into(), details })).into_response()
            }
            EtmapServerError::NotFound(details) => {
                (StatusCode::NOT_FOUND, Json(ErrorBody { error: "not_found".into(), details })).into_response()
            }
            EtmapServerError::Orchestrator(etmap_orchestrator::EtmapOrchestratorError::NotFound(details)) => {
                (StatusCode::NOT_FOUND, Json(ErrorBody { error: "not_found".into(), details })).into_response()
            }
            other => {
                tracing::error!(error = %other, "unhandled server error");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody {
                    error: "internal_error".into(),
                    details: "an internal error occurred".into(),
                })).into_response()
            }
        }
    }
}
