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
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration,NaiveDate};
use geo::BoundingRect;
use serde::Deserialize;
use tokio::sync::Semaphore;

use etmap_common::paths::DataRoots;
use etmap_coverage::Aoi;

use crate::errors::{EtmapFetchError,Result};
use crate::fetcher::DatasetFetcher;
use crate::fetchers::download::{already_present,download_to_path};
use crate::retry::retry_with_backoff;

const DEFAULT_SEARCH_WINDOW_DAYS: i64 = 45;

#[derive(Debug,Clone,Deserialize)]
struct StacAsset {
    href: String,
}

#[derive(Debug,Clone,Deserialize)]
struct StacFeature {
    id: String,
    assets: HashMap<String, StacAsset>,
}

#[derive(Debug,Clone,Deserialize)]
struct StacFeatureCollection {
    #[serde(default)]
    features: Vec<StacFeature>,
}

#[derive(Debug,Clone)]
pub struct CatalogItem {
    pub scene_id: String,
    pub assets: HashMap<String, String>,
}

/// remote catalog lookup, factored out behind a trait so tests can supply a fixed result
/// set without a network dependency.
#[async_trait]
pub trait SceneCatalog: Send + Sync {
    async fn search(&self, day: NaiveDate, aoi: &Aoi) -> Result<Vec<CatalogItem>>;
}

/// queries a STAC-style search endpoint (`POST {catalog_url}/search`) for items of one
/// collection whose acquisition time falls on `day`.
pub struct StacCatalog {
    client: reqwest::Client,
    catalog_url: String,
    collection: String,
}

impl StacCatalog {
    pub fn new(client: reqwest::Client, catalog_url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self { client, catalog_url: catalog_url.into(), collection: collection.into() }
    }
}

#[async_trait]
impl SceneCatalog for StacCatalog {
    async fn search(&self, day: NaiveDate, aoi: &Aoi) -> Result<Vec<CatalogItem>> {
        let start = day.and_hms_opt(0, 0, 0).unwrap().and_utc().to_rfc3339();
        let end = day.and_hms_opt(23, 59, 59).unwrap().and_utc().to_rfc3339();

        let mut body = serde_json::json!({
            "collections": [self.collection],
            "datetime": format!("{start}/{end}"),
            "limit": 100,
        });

        if let Some(polygon) = aoi.polygon() {
            if let Some(rect) = polygon.bounding_rect() {
                body["bbox"] = serde_json::json!([rect.min().x, rect.min().y, rect.max().x, rect.max().y]);
            }
        }

        let response = self.client.post(format!("{}/search", self.catalog_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| EtmapFetchError::FetchTransient(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EtmapFetchError::FetchTransient(format!("catalog search failed with status {}", response.status())));
        }

        let parsed: StacFeatureCollection = response.json().await
            .map_err(|e| EtmapFetchError::FetchTransient(format!("malformed catalog response: {e}")))?;

        Ok(parsed.features.into_iter()
            .map(|f| CatalogItem {
                scene_id: f.id,
                assets: f.assets.into_iter().map(|(k,v)| (k, v.href)).collect(),
            })
            .collect())
    }
}

/// fetches scene imagery for the configured spectral bands, searching outward from a day
/// with no direct hits rather than giving up.
pub struct SceneArchiveFetcher {
    catalog: Arc<dyn SceneCatalog>,
    client: reqwest::Client,
    roots: DataRoots,
    bands: Vec<String>,
    search_window_days: i64,
    max_connections: usize,
    max_retries: u32,
}

impl SceneArchiveFetcher {
    pub fn new(catalog: Arc<dyn SceneCatalog>, client: reqwest::Client, roots: DataRoots, bands: Vec<String>) -> Self {
        Self { catalog, client, roots, bands, search_window_days: DEFAULT_SEARCH_WINDOW_DAYS, max_connections: 4, max_retries: 2 }
    }

    pub fn with_search_window(mut self, days: i64) -> Self {
        self.search_window_days = days;
        self
    }

    pub fn with_max_connections(mut self, n: usize) -> Self {
        self.max_connections = n;
        self
    }

    async fn search_outward(&self, day: NaiveDate, aoi: &Aoi) -> Result<Option<(NaiveDate, Vec<CatalogItem>)>> {
        let items = retry_with_backoff(self.max_retries, || self.catalog.search(day, aoi)).await?;
        if !items.is_empty() {
            return Ok(Some((day, items)));
        }

        for offset in 1..=self.search_window_days {
            for sign in [1i64, -1i64] {
                let candidate = day + Duration::days(sign * offset);
                let items = retry_with_backoff(self.max_retries, || self.catalog.search(candidate, aoi)).await?;
                if !items.is_empty() {
                    return Ok(Some((candidate, items)));
                }
            }
        }

        Ok(None)
    }

    async fn download_items(&self, items: Vec<CatalogItem>, scene_date: NaiveDate) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.max_connections));
        let mut tasks = Vec::new();

        for item in items {
            for band in &self.bands {
                let Some(href) = item.assets.get(band).cloned() else {
                    tracing::warn!(scene_id = %item.scene_id, band, "no asset for band, skipping");
                    continue;
                };

                let dest = self.roots.landsat_scene_path(band, &item.scene_id, scene_date);
                if already_present(&dest) {
                    continue;
                }

                let client = self.client.clone();
                let semaphore = semaphore.clone();
                let max_retries = self.max_retries;
                let scene_id = item.scene_id.clone();
                let band = band.clone();

                tasks.push(tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                    let result = retry_with_backoff(max_retries, || download_to_path(&client, &href, &dest)).await;
                    if let Err(e) = &result {
                        tracing::warn!(scene_id, band, error = %e, "band download failed, continuing with remaining units");
                    }
                }));
            }
        }

        for t in tasks {
            let _ = t.await;
        }
        Ok(())
    }
}

#[async_trait]
impl DatasetFetcher for SceneArchiveFetcher {
    fn name(&self) -> &str { "landsat" }

    async fn fetch(&self, date_from: NaiveDate, date_to: NaiveDate, aoi: &Aoi) -> Result<bool> {
        let mut day = date_from;
        while day <= date_to {
            match self.search_outward(day, aoi).await {
                Ok(Some((scene_date, items))) => {
                    if scene_date != day {
                        tracing::info!(requested = %day, used = %scene_date, "scene archive search used an offset date");
                    }
                    self.download_items(items, scene_date).await?;
                }
                Ok(None) => {
                    tracing::info!(date = %day, window = self.search_window_days, "no scenes found within search window, skipping day");
                }
                Err(e @ EtmapFetchError::FetchFatal(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(date = %day, error = %e, "scene search failed for this day, continuing");
                }
            }
            day = day.succ_opt().unwrap();
        }
        Ok(true)
    }
}
