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
use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use etmap_coverage::Aoi;

use crate::fetcher::DatasetFetcher;

/// binds dataset name -> fetcher instance. Populated once at startup and read-only
/// thereafter, so a `DashMap` gives lock-free reads without the Orchestrator needing to
/// know how many providers exist or in what order they were registered.
#[derive(Clone, Default)]
pub struct FetchManager {
    fetchers: Arc<DashMap<String, Arc<dyn DatasetFetcher>>>,
}

impl FetchManager {
    pub fn new() -> Self {
        Self { fetchers: Arc::new(DashMap::new()) }
    }

    pub fn register(&self, fetcher: Arc<dyn DatasetFetcher>) {
        self.fetchers.insert(fetcher.name().to_string(), fetcher);
    }

    /// looks up the fetcher by name and invokes it. Returns `false` if the name is
    /// unregistered or the fetcher itself reports a non-fatal failure to make progress;
    /// a fatal error from the fetcher is still surfaced to the caller.
    pub async fn fetch_dataset(&self, name: &str, date_from: NaiveDate, date_to: NaiveDate, aoi: &Aoi) -> crate::errors::Result<bool> {
        let Some(fetcher) = self.fetchers.get(name).map(|e| e.clone()) else {
            tracing::warn!(dataset = name, "no fetcher registered for dataset");
            return Ok(false);
        };

        fetcher.fetch(date_from, date_to, aoi).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubFetcher { name: String, result: bool }

    #[async_trait]
    impl DatasetFetcher for StubFetcher {
        fn name(&self) -> &str { &self.name }
        async fn fetch(&self, _date_from: NaiveDate, _date_to: NaiveDate, _aoi: &Aoi) -> crate::errors::Result<bool> {
            Ok(self.result)
        }
    }

    #[tokio::test]
    async fn unregistered_dataset_returns_false() {
        let manager = FetchManager::new();
        let d = NaiveDate::from_ymd_opt(2024,3,29).unwrap();
        let result = manager.fetch_dataset("landsat", d, d, &Aoi::empty()).await.unwrap();
        assert!(!result);
    }

    #[tokio::test]
    async fn registered_dataset_delegates_to_fetcher() {
        let manager = FetchManager::new();
        manager.register(Arc::new(StubFetcher { name: "prism".into(), result: true }));
        let d = NaiveDate::from_ymd_opt(2024,3,29).unwrap();
        let result = manager.fetch_dataset("prism", d, d, &Aoi::empty()).await.unwrap();
        assert!(result);
    }
}
