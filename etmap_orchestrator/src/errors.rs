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
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EtmapOrchestratorError>;

#[derive(Error,Debug)]
pub enum EtmapOrchestratorError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("job not found: {0}")]
    NotFound(String),

    #[error("job store unavailable")]
    StoreUnavailable(#[from] etmap_store::EtmapStoreError),

    #[error("coverage check failed")]
    Coverage(#[from] etmap_coverage::EtmapCoverageError),

    #[error("fetch failed")]
    Fetch(#[from] etmap_fetch::EtmapFetchError),

    #[error("compute sub-process exited with code {0}")]
    ComputeFailure(i32),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("background task failed")]
    Join(#[from] tokio::task::JoinError),
}
