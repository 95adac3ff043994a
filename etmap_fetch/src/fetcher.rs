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
use async_trait::async_trait;
use chrono::NaiveDate;
use etmap_coverage::Aoi;

use crate::errors::Result;

/// uniform contract every dataset fetcher implements, so the Fetch Manager can hold
/// `Box<dyn DatasetFetcher>` without a generic parameter per provider.
#[async_trait]
pub trait DatasetFetcher: Send + Sync {
    /// human-readable name used for registration and log tagging (e.g. "landsat").
    fn name(&self) -> &str;

    /// fetches everything missing for the given range/area. Returns `Ok(true)` on full
    /// success, `Ok(false)` if the fetcher could not make progress but did not error, and
    /// `Err` only for a fatal, unrecoverable condition.
    async fn fetch(&self, date_from: NaiveDate, date_to: NaiveDate, aoi: &Aoi) -> Result<bool>;
}
