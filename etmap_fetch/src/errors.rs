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

pub type Result<T> = std::result::Result<T, EtmapFetchError>;

#[derive(Error,Debug)]
pub enum EtmapFetchError {
    /// retryable network/HTTP failure - counts against the retry cap.
    #[error("transient fetch failure: {0}")]
    FetchTransient(String),

    /// non-retryable provider error (auth, malformed payload) - aborts the fetcher.
    #[error("fatal fetch failure: {0}")]
    FetchFatal(String),

    #[error("fetcher configuration error: {0}")]
    ConfigError(String),

    #[error("http request failed")]
    Http(#[from] reqwest::Error),

    #[error("i/o error")]
    Io(#[from] std::io::Error),

    #[error("coverage check failed")]
    Coverage(#[from] etmap_coverage::EtmapCoverageError),

    #[error("gdal error")]
    Gdal(#[from] etmap_gdal::errors::EtmapGdalError),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}
