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
use chrono::Utc;
use serde_json::json;

use etmap_store::{dedup_key, Job, JobStatus, JobStore};

fn sample_job(id: &str, day: &str) -> Job {
    let date = chrono::NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap();
    let geometry = json!({"type":"Polygon","coordinates":[[[0.0,0.0],[1.0,0.0],[1.0,1.0],[0.0,0.0]]]});
    let now = Utc::now();
    Job {
        id: id.into(),
        date_from: date,
        date_to: date,
        dedup_key: dedup_key(date, date, &geometry),
        geometry,
        status: JobStatus::Queued,
        request_json: json!({}),
        created_at: now,
        updated_at: now,
        error_message: None,
    }
}

#[tokio::test]
async fn reopening_the_same_file_preserves_rows_and_schema() {
    let dir = std::env::temp_dir().join(format!("etmap-store-test-{}", Utc::now().timestamp_nanos_opt().unwrap_or(0)));
    std::fs::create_dir_all(&dir).unwrap();
    let db_path = dir.join("jobs.sqlite3");
    let db_path = db_path.to_str().unwrap().to_string();

    {
        let store = JobStore::open(&db_path).await.unwrap();
        store.insert(&sample_job("job-a", "2024-03-29")).await.unwrap();
    }

    // reopening an existing file must not fail or clobber prior rows - schema creation
    // is `create table if not exists`, so a restart behaves like a fresh process.
    let store = JobStore::open(&db_path).await.unwrap();
    let job = store.get("job-a").await.unwrap();
    assert_eq!(job.status, JobStatus::Queued);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn concurrent_operations_on_distinct_identifiers_both_succeed() {
    let dir = std::env::temp_dir().join(format!("etmap-store-test-concurrent-{}", Utc::now().timestamp_nanos_opt().unwrap_or(0)));
    std::fs::create_dir_all(&dir).unwrap();
    let db_path = dir.join("jobs.sqlite3");
    let store = JobStore::open(db_path.to_str().unwrap()).await.unwrap();

    let a = sample_job("job-a", "2024-03-29");
    let b = sample_job("job-b", "2024-03-30");

    let (r1, r2) = tokio::join!(store.insert(&a), store.insert(&b));
    r1.unwrap();
    r2.unwrap();

    let updated_a = Utc::now();
    let updated_b = Utc::now();
    let (r1, r2) = tokio::join!(
        store.update_status("job-a", JobStatus::Success, updated_a, None),
        store.update_status("job-b", JobStatus::Failed, updated_b, Some("boom")),
    );
    r1.unwrap();
    r2.unwrap();

    assert_eq!(store.get("job-a").await.unwrap().status, JobStatus::Success);
    let failed = store.get("job-b").await.unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("boom"));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn find_by_date_range_only_returns_exact_pair_matches() {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    let store = JobStore::from_pool(pool);

    store.insert(&sample_job("in-range", "2024-03-29")).await.unwrap();
    store.insert(&sample_job("out-of-range", "2024-04-01")).await.unwrap();

    let date = chrono::NaiveDate::parse_from_str("2024-03-29", "%Y-%m-%d").unwrap();
    let matches = store.find_by_date_range(date, date).await.unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, "in-range");
}
