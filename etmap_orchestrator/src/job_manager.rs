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
use chrono::{NaiveDate,Utc};
use serde::Serialize;
use uuid::Uuid;

use etmap_store::{dedup_key,Job,JobStatus,JobStore};

use crate::errors::Result;

/// creates jobs, deduplicates identical requests, and advances/reads status. Thin wrapper
/// around the Job Store: all persistence lives there, this only adds identifier
/// generation and the "same request -> same job" policy (§4.5).
#[derive(Clone)]
pub struct JobManager {
    store: JobStore,
}

/// the view returned to HTTP callers - identifier, status, timestamps, original request,
/// optional error, with no internal store details leaking through.
#[derive(Debug,Clone,Serialize)]
pub struct JobView {
    pub request_id: String,
    pub status: JobStatus,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
    pub request: serde_json::Value,
    pub error_message: Option<String>,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        JobView {
            request_id: job.id,
            status: job.status,
            created_at: job.created_at,
            updated_at: job.updated_at,
            request: job.request_json,
            error_message: job.error_message,
        }
    }
}

impl JobManager {
    pub fn new(store: JobStore) -> Self {
        Self { store }
    }

    /// returns (identifier, is_new). A duplicate (date_from, date_to, geometry) reuses the
    /// existing job and its current lifecycle rather than creating a second row.
    pub async fn create(&self, date_from: NaiveDate, date_to: NaiveDate, geometry: serde_json::Value, request_json: serde_json::Value) -> Result<(String, bool)> {
        if let Some(existing) = self.find_existing(date_from, date_to, &geometry).await? {
            return Ok((existing, false));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let job = Job {
            id: id.clone(),
            date_from,
            date_to,
            dedup_key: dedup_key(date_from, date_to, &geometry),
            geometry,
            status: JobStatus::Queued,
            request_json,
            created_at: now,
            updated_at: now,
            error_message: None,
        };

        self.store.insert(&job).await?;
        Ok((id, true))
    }

    /// scans candidate rows by (date_from, date_to) and returns the first whose stored
    /// geometry equals the requested one *by value*, not by lexical form.
    pub async fn find_existing(&self, date_from: NaiveDate, date_to: NaiveDate, geometry: &serde_json::Value) -> Result<Option<String>> {
        let candidates = self.store.find_by_date_range(date_from, date_to).await?;
        Ok(candidates.into_iter().find(|job| &job.geometry == geometry).map(|job| job.id))
    }

    pub async fn update_status(&self, id: &str, new_status: JobStatus, error_message: Option<&str>) -> Result<()> {
        self.store.update_status(id, new_status, Utc::now(), error_message).await?;
        Ok(())
    }

    pub async fn get_status(&self, id: &str) -> Result<JobView> {
        Ok(self.store.get(id).await?.into())
    }

    pub async fn get_job(&self, id: &str) -> Result<Job> {
        Ok(self.store.get(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;
    use serde_json::json;

    async fn test_manager() -> JobManager {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let store = JobStore::from_pool(pool);
        JobManager::new(store)
    }

    #[tokio::test]
    async fn create_is_idempotent_for_identical_requests() {
        let manager = test_manager().await;
        let d = NaiveDate::from_ymd_opt(2024,3,29).unwrap();
        let geometry = json!({"type":"Polygon","coordinates":[[[0.0,0.0],[1.0,0.0],[1.0,1.0],[0.0,0.0]]]});
        let request = json!({"date_from":"2024-03-29","date_to":"2024-03-29","geometry":geometry});

        let (id1, is_new1) = manager.create(d, d, geometry.clone(), request.clone()).await.unwrap();
        let (id2, is_new2) = manager.create(d, d, geometry, request).await.unwrap();

        assert!(is_new1);
        assert!(!is_new2);
        assert_eq!(id1, id2);
    }

    #[tokio::test]
    async fn create_ignores_geometry_field_order() {
        let manager = test_manager().await;
        let d = NaiveDate::from_ymd_opt(2024,3,29).unwrap();
        let g1 = json!({"type":"Polygon","coordinates":[[[0.0,0.0],[1.0,0.0]]]});
        let g2 = json!({"coordinates":[[[0.0,0.0],[1.0,0.0]]],"type":"Polygon"});

        let (id1, _) = manager.create(d, d, g1, json!({})).await.unwrap();
        let (id2, is_new2) = manager.create(d, d, g2, json!({})).await.unwrap();

        assert_eq!(id1, id2);
        assert!(!is_new2);
    }

    #[tokio::test]
    async fn different_geometry_creates_a_new_job() {
        let manager = test_manager().await;
        let d = NaiveDate::from_ymd_opt(2024,3,29).unwrap();
        let g1 = json!({"type":"Polygon","coordinates":[[[0.0,0.0]]]});
        let g2 = json!({"type":"Polygon","coordinates":[[[5.0,5.0]]]});

        let (id1, _) = manager.create(d, d, g1, json!({})).await.unwrap();
        let (id2, is_new2) = manager.create(d, d, g2, json!({})).await.unwrap();

        assert_ne!(id1, id2);
        assert!(is_new2);
    }
}
