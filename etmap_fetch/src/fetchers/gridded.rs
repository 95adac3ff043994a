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
use std::io::Read;
use std::path::{Path,PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Semaphore;

use etmap_common::paths::DataRoots;
use etmap_coverage::Aoi;

use crate::errors::{EtmapFetchError,Result};
use crate::fetcher::DatasetFetcher;
use crate::fetchers::download::{already_present,is_zip};
use crate::retry::retry_with_backoff;

/// fetches one gridded-climate raster per (day, variable), unpacking a ZIP payload when
/// the provider wraps the raster in one.
pub struct GriddedClimateFetcher {
    client: reqwest::Client,
    roots: DataRoots,
    base_url: String,
    variables: Vec<String>,
    max_connections: usize,
    max_retries: u32,
}

impl GriddedClimateFetcher {
    pub fn new(client: reqwest::Client, roots: DataRoots, base_url: impl Into<String>, variables: Vec<String>) -> Self {
        Self { client, roots, base_url: base_url.into(), variables, max_connections: 4, max_retries: 2 }
    }

    pub fn with_max_connections(mut self, n: usize) -> Self {
        self.max_connections = n;
        self
    }

    fn provider_url(&self, date: NaiveDate, variable: &str) -> String {
        format!("{}/{}/{}", self.base_url, variable, date.format("%Y%m%d"))
    }

    async fn fetch_one(client: reqwest::Client, url: String, dest: PathBuf) -> Result<()> {
        if already_present(&dest) {
            return Ok(());
        }

        let response = client.get(&url).send().await.map_err(|e| EtmapFetchError::FetchTransient(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
                return Err(EtmapFetchError::FetchFatal(format!("authentication failed ({status})")));
            }
            return Err(EtmapFetchError::FetchTransient(format!("request failed with status {status}")));
        }

        let bytes = response.bytes().await.map_err(|e| EtmapFetchError::FetchTransient(e.to_string()))?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = dest.with_extension("part");
        if is_zip(&bytes) {
            extract_single_raster(&bytes, &tmp_path)?;
        } else {
            std::fs::write(&tmp_path, &bytes)?;
        }

        if std::fs::metadata(&tmp_path)?.len() == 0 {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(EtmapFetchError::FetchTransient("downloaded file is empty".into()));
        }

        std::fs::rename(&tmp_path, &dest)?;
        Ok(())
    }
}

/// locates the single raster inside a ZIP payload and writes it to `dest`. Archives with
/// zero or more than one raster member are treated as a fatal format error.
fn extract_single_raster(bytes: &[u8], dest: &Path) -> Result<()> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor)?;

    let raster_index = (0..archive.len())
        .find(|&i| {
            archive.by_index(i).ok()
                .map(|f| f.name().to_ascii_lowercase().ends_with(".tif") || f.name().to_ascii_lowercase().ends_with(".bil"))
                .unwrap_or(false)
        })
        .ok_or_else(|| EtmapFetchError::FetchFatal("no raster found in archive".into()))?;

    let mut entry = archive.by_index(raster_index)?;
    let mut contents = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut contents)?;
    std::fs::write(dest, contents)?;
    Ok(())
}

#[async_trait]
impl DatasetFetcher for GriddedClimateFetcher {
    fn name(&self) -> &str { "prism" }

    async fn fetch(&self, date_from: NaiveDate, date_to: NaiveDate, _aoi: &Aoi) -> Result<bool> {
        let semaphore = Arc::new(Semaphore::new(self.max_connections));
        let mut tasks = Vec::new();

        let mut day = date_from;
        while day <= date_to {
            for variable in &self.variables {
                let dest = self.roots.prism_variable_path(day, variable);
                if already_present(&dest) {
                    continue;
                }

                let url = self.provider_url(day, variable);
                let client = self.client.clone();
                let semaphore = semaphore.clone();
                let max_retries = self.max_retries;
                let variable = variable.clone();

                tasks.push(tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                    let result = retry_with_backoff(max_retries, || Self::fetch_one(client.clone(), url.clone(), dest.clone())).await;
                    if let Err(e) = &result {
                        tracing::warn!(date = %day, variable, error = %e, "variable download failed, continuing with remaining units");
                    }
                }));
            }
            day = day.succ_opt().unwrap();
        }

        for t in tasks {
            let _ = t.await;
        }
        Ok(true)
    }
}
