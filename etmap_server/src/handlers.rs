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
use axum::extract::{Path,State};
use axum::http::{StatusCode,header};
use axum::response::{IntoResponse,Redirect,Response};
use chrono::NaiveDate;
use serde::{Deserialize,Serialize};

use etmap_store::JobStatus;

use crate::errors::{EtmapServerError,Result};
use crate::state::AppState;

#[derive(Debug,Deserialize)]
pub struct CreateJobRequest {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub geometry: serde_json::Value,
}

#[derive(Debug,Serialize)]
pub struct CreateJobResponse {
    pub request_id: String,
}

/// `POST /etmap` - creates a job, or reuses an identical one already on file. A prior job
/// that already reached `success` has its compute step re-triggered if auto-calc is on;
/// anything still in progress or already failed is left alone (§6.1).
pub async fn create_job(State(state): State<AppState>, Json(body): Json<CreateJobRequest>) -> Result<Response> {
    if body.date_to < body.date_from {
        return Err(EtmapServerError::ValidationError("date_to must not precede date_from".into()));
    }
    if !body.geometry.is_object() && !body.geometry.is_null() {
        return Err(EtmapServerError::ValidationError("geometry must be a GeoJSON object".into()));
    }

    let request_json = serde_json::json!({
        "date_from": body.date_from,
        "date_to": body.date_to,
        "geometry": body.geometry,
    });

    let (request_id, is_new) = state.jobs().create(body.date_from, body.date_to, body.geometry, request_json).await
        .map_err(EtmapServerError::from)?;

    if is_new {
        let orchestrator = state.orchestrator().clone();
        let id = request_id.clone();
        tokio::spawn(async move {
            if let Err(e) = orchestrator.run(&id).await {
                tracing::error!(job_id = %id, error = %e, "job run failed");
            }
        });
        return Ok((StatusCode::CREATED, Json(CreateJobResponse { request_id })).into_response());
    }

    let view = state.jobs().get_status(&request_id).await.map_err(EtmapServerError::from)?;
    if view.status == JobStatus::Success && state.config().auto_calc {
        let orchestrator = state.orchestrator().clone();
        let id = request_id.clone();
        tokio::spawn(async move {
            if let Err(e) = orchestrator.retrigger_calculation(&id).await {
                tracing::error!(job_id = %id, error = %e, "calculation re-trigger failed");
            }
        });
    }

    Ok((StatusCode::OK, Json(CreateJobResponse { request_id })).into_response())
}

fn parse_job_id(raw: &str) -> Result<String> {
    uuid::Uuid::parse_str(raw)
        .map(|u| u.to_string())
        .map_err(|_| EtmapServerError::ValidationError(format!("malformed identifier: {raw}")))
}

/// splits a `<uuid>.<ext>` path segment. The router can only capture a whole segment, so
/// the `.json`/`.png`/`.tif` suffixes dispatched by `get_artifact` are split out here
/// rather than in the route table itself.
fn split_suffix(tail: &str) -> Result<(String, &str)> {
    let (id_part, ext) = tail.rsplit_once('.')
        .ok_or_else(|| EtmapServerError::ValidationError(format!("missing extension: {tail}")))?;
    let id = parse_job_id(id_part)?;
    Ok((id, ext))
}

/// `GET /etmap/<uuid>.json`, `GET /etmap/<uuid>.png`, `GET /etmap/<uuid>.tif` - dispatches
/// on the requested suffix since all three share the `/etmap/<uuid>.<ext>` route shape.
pub async fn get_artifact(State(state): State<AppState>, Path(tail): Path<String>) -> Result<Response> {
    let (id, ext) = split_suffix(&tail)?;
    match ext {
        "json" => {
            let view = state.jobs().get_status(&id).await.map_err(EtmapServerError::from)?;
            Ok(Json(view).into_response())
        }
        "png" => serve_artifact(&state, &id, "image/png", |roots, id| roots.preview_png_path(id)).await,
        "tif" => serve_artifact(&state, &id, "image/tiff", |roots, id| roots.result_tif_path(id)).await,
        other => Err(EtmapServerError::ValidationError(format!("unsupported extension: {other}"))),
    }
}

#[derive(Debug,Serialize)]
struct ResultSummary {
    request_id: String,
    status: JobStatus,
    preview_url: String,
}

/// `GET /etmap/<uuid>/result` - the terminal-success summary, or a redirect to the status
/// endpoint for any job still in progress.
pub async fn get_result(State(state): State<AppState>, Path(raw_id): Path<String>) -> Result<Response> {
    let id = parse_job_id(&raw_id)?;
    let view = state.jobs().get_status(&id).await.map_err(EtmapServerError::from)?;

    if matches!(view.status, JobStatus::CalculationComplete | JobStatus::Success) {
        let summary = ResultSummary {
            request_id: id.clone(),
            status: view.status,
            preview_url: format!("/etmap/{id}.png"),
        };
        Ok(Json(summary).into_response())
    } else {
        Ok(Redirect::to(&format!("/etmap/{id}.json")).into_response())
    }
}

async fn serve_artifact(state: &AppState, id: &str, content_type: &'static str, path_for: impl Fn(&etmap_common::paths::DataRoots, &str) -> std::path::PathBuf) -> Result<Response> {
    let view = state.jobs().get_status(id).await.map_err(EtmapServerError::from)?;

    if !matches!(view.status, JobStatus::CalculationComplete | JobStatus::Success) {
        return Err(EtmapServerError::ValidationError("calculation not complete".into()));
    }

    let path = path_for(state.roots(), id);
    let bytes = tokio::fs::read(&path).await
        .map_err(|_| EtmapServerError::NotFound(format!("artifact not available for {id}")))?;

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

#[derive(Debug,Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

/// `GET /healthz` - ambient liveness probe, reads nothing from the Job Store.
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
