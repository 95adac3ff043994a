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

//! retrieves raw data for datasets the Coverage Checker declared missing. Each fetcher
//! implements a uniform contract (idempotent, atomic writes, bounded concurrency) so the
//! Fetch Manager can drive any of them without provider-specific logic.

pub mod errors;
pub mod fetcher;
pub mod fetchers;
pub mod manager;
pub mod retry;

pub use errors::{EtmapFetchError, Result};
pub use fetcher::DatasetFetcher;
pub use fetchers::{GriddedClimateFetcher, HourlyForcingFetcher, SceneArchiveFetcher};
pub use fetchers::scene::{CatalogItem, SceneCatalog, StacCatalog};
pub use manager::FetchManager;
