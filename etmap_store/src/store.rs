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
use chrono::{DateTime,NaiveDate,SecondsFormat,Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::str::FromStr;

use crate::errors::{EtmapStoreError,Result};
use crate::job::{Job,JobRow,JobStatus};

/// durable, single-node persistence of Job records (§4.1). Backed by a pooled sqlite
/// connection so a single binary needs no external database service; sqlite's own
/// single-writer semantics are sufficient for the "serializable per identifier" contract.
#[derive(Debug,Clone)]
pub struct JobStore {
    db: SqlitePool,
}

impl JobStore {
    /// opens (creating if absent) the sqlite file at `path` and ensures the schema exists.
    pub async fn open(path: &str) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))?
            .create_if_missing(true);
        let db = SqlitePool::connect_with(opts).await?;
        let store = Self { db };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// wraps an already-open pool, e.g. an in-memory database used in tests.
    pub fn from_pool(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            create table if not exists etmap_jobs (
                id text primary key not null,
                date_from text not null,
                date_to text not null,
                geometry text not null,
                dedup_key text not null,
                status text not null,
                request_json text not null,
                created_at text not null,
                updated_at text not null,
                error_message text
            )
            "#
        ).execute(&self.db).await?;

        sqlx::query("create index if not exists etmap_jobs_date_range on etmap_jobs (date_from, date_to)")
            .execute(&self.db).await?;

        Ok(())
    }

    /// fails with `DuplicateIdentifier` if the identifier already exists; otherwise commits atomically.
    pub async fn insert(&self, job: &Job) -> Result<()> {
        let res = sqlx::query(
            r#"insert into etmap_jobs
               (id, date_from, date_to, geometry, dedup_key, status, request_json, created_at, updated_at, error_message)
               values (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#
        )
        .bind(&job.id)
        .bind(job.date_from.format("%Y-%m-%d").to_string())
        .bind(job.date_to.format("%Y-%m-%d").to_string())
        .bind(job.geometry.to_string())
        .bind(&job.dedup_key)
        .bind(job.status.to_string())
        .bind(job.request_json.to_string())
        .bind(job.created_at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .bind(job.updated_at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .bind(&job.error_message)
        .execute(&self.db)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(EtmapStoreError::DuplicateIdentifier(job.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// atomic status update; fails with `NotFound` if the identifier is absent.
    pub async fn update_status(&self, id: &str, new_status: JobStatus, updated_at: DateTime<Utc>, error_message: Option<&str>) -> Result<()> {
        let n = sqlx::query(
            "update etmap_jobs set status = ?, updated_at = ?, error_message = ? where id = ?"
        )
        .bind(new_status.to_string())
        .bind(updated_at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .bind(error_message)
        .bind(id)
        .execute(&self.db)
        .await?
        .rows_affected();

        if n == 0 { Err(EtmapStoreError::NotFound(id.to_string())) } else { Ok(()) }
    }

    /// returns the full row, or `NotFound`.
    pub async fn get(&self, id: &str) -> Result<Job> {
        let row: Option<JobRow> = sqlx::query_as("select * from etmap_jobs where id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.ok_or_else(|| EtmapStoreError::NotFound(id.to_string()))
            .and_then(Job::try_from)
    }

    /// returns all rows matching the exact (date_from, date_to) pair; the caller filters by
    /// geometry equality (see `find_existing` in the job manager).
    pub async fn find_by_date_range(&self, date_from: NaiveDate, date_to: NaiveDate) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as("select * from etmap_jobs where date_from = ? and date_to = ?")
            .bind(date_from.format("%Y-%m-%d").to_string())
            .bind(date_to.format("%Y-%m-%d").to_string())
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(Job::try_from).collect()
    }

    /// returns the first row whose dedup_key matches exactly, if any.
    pub async fn find_by_dedup_key(&self, dedup_key: &str) -> Result<Option<Job>> {
        let row: Option<JobRow> = sqlx::query_as("select * from etmap_jobs where dedup_key = ? limit 1")
            .bind(dedup_key)
            .fetch_optional(&self.db)
            .await?;

        row.map(Job::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::job::dedup_key;

    async fn test_store() -> JobStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let store = JobStore::from_pool(pool);
        store.ensure_schema().await.unwrap();
        store
    }

    fn sample_job(id: &str) -> Job {
        let d = NaiveDate::from_ymd_opt(2024,3,29).unwrap();
        let geometry = json!({"type":"Polygon","coordinates":[[[0.0,0.0],[1.0,0.0],[1.0,1.0],[0.0,0.0]]]});
        let now = Utc::now();
        Job {
            id: id.to_string(),
            date_from: d,
            date_to: d,
            dedup_key: dedup_key(d,d,&geometry),
            geometry,
            status: JobStatus::Queued,
            request_json: json!({"date_from":"2024-03-29","date_to":"2024-03-29"}),
            created_at: now,
            updated_at: now,
            error_message: None,
        }
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = test_store().await;
        let job = sample_job("job-1");
        store.insert(&job).await.unwrap();

        let fetched = store.get("job-1").await.unwrap();
        assert_eq!(fetched.id, "job-1");
        assert_eq!(fetched.status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn insert_duplicate_identifier_fails() {
        let store = test_store().await;
        let job = sample_job("job-2");
        store.insert(&job).await.unwrap();

        let err = store.insert(&job).await.unwrap_err();
        assert!(matches!(err, EtmapStoreError::DuplicateIdentifier(_)));
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = test_store().await;
        let err = store.get("nope").await.unwrap_err();
        assert!(matches!(err, EtmapStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_status_is_monotonic_and_persists_error_message() {
        let store = test_store().await;
        let job = sample_job("job-3");
        store.insert(&job).await.unwrap();

        let t1 = job.updated_at + chrono::Duration::seconds(5);
        store.update_status("job-3", JobStatus::Failed, t1, Some("landsat: auth error")).await.unwrap();

        let fetched = store.get("job-3").await.unwrap();
        assert_eq!(fetched.status, JobStatus::Failed);
        assert_eq!(fetched.error_message.as_deref(), Some("landsat: auth error"));
        assert!(fetched.updated_at >= fetched.created_at);
    }

    #[tokio::test]
    async fn update_status_missing_identifier_is_not_found() {
        let store = test_store().await;
        let err = store.update_status("ghost", JobStatus::Failed, Utc::now(), None).await.unwrap_err();
        assert!(matches!(err, EtmapStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn find_by_dedup_key_locates_duplicate() {
        let store = test_store().await;
        let job = sample_job("job-4");
        store.insert(&job).await.unwrap();

        let found = store.find_by_dedup_key(&job.dedup_key).await.unwrap();
        assert_eq!(found.map(|j| j.id), Some("job-4".to_string()));
    }

    #[tokio::test]
    async fn find_by_date_range_matches_exact_pair() {
        let store = test_store().await;
        let job = sample_job("job-5");
        store.insert(&job).await.unwrap();

        let found = store.find_by_date_range(job.date_from, job.date_to).await.unwrap();
        assert_eq!(found.len(), 1);

        let other_day = NaiveDate::from_ymd_opt(2024,4,1).unwrap();
        let none = store.find_by_date_range(other_day, other_day).await.unwrap();
        assert!(none.is_empty());
    }
}
