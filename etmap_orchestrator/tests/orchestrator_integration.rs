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
use chrono::NaiveDate;
use serde_json::json;
use sqlx::SqlitePool;

use etmap_common::paths::DataRoots;
use etmap_coverage::CoverageChecker;
use etmap_fetch::FetchManager;
use etmap_orchestrator::{JobManager, Orchestrator, OrchestratorConfig};
use etmap_store::{JobStatus, JobStore};

async fn new_job_manager() -> JobManager {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    JobManager::new(JobStore::from_pool(pool))
}

fn empty_request(tag: &str) -> (NaiveDate, NaiveDate, serde_json::Value, serde_json::Value) {
    let d = NaiveDate::from_ymd_opt(2024, 3, 29).unwrap();
    (d, d, serde_json::Value::Null, json!({"tag": tag}))
}

fn scratch_roots(name: &str) -> DataRoots {
    DataRoots::new(std::env::temp_dir().join(format!("etmap-orch-test-{name}-data")),
                    std::env::temp_dir().join(format!("etmap-orch-test-{name}-results")))
}

#[tokio::test]
async fn empty_aoi_skips_every_dataset_and_reaches_success() {
    let jobs = new_job_manager().await;
    let (from, to, geometry, request) = empty_request("skip");
    let (job_id, is_new) = jobs.create(from, to, geometry, request).await.unwrap();
    assert!(is_new);

    let orchestrator = Orchestrator::new(
        jobs.clone(),
        CoverageChecker::new(scratch_roots("skip")),
        FetchManager::new(),
        OrchestratorConfig { auto_calc: false, calculation_bin: "true".into(), db_path: ":memory:".into() },
    );

    orchestrator.run(&job_id).await.unwrap();

    let view = jobs.get_status(&job_id).await.unwrap();
    assert_eq!(view.status, JobStatus::Success);
    assert!(view.error_message.is_none());
}

#[tokio::test]
async fn auto_calc_runs_after_success_and_completes() {
    let jobs = new_job_manager().await;
    let (from, to, geometry, request) = empty_request("calc-ok");
    let (job_id, _) = jobs.create(from, to, geometry, request).await.unwrap();

    let orchestrator = Orchestrator::new(
        jobs.clone(),
        CoverageChecker::new(scratch_roots("calc-ok")),
        FetchManager::new(),
        OrchestratorConfig { auto_calc: true, calculation_bin: "true".into(), db_path: ":memory:".into() },
    );

    orchestrator.run(&job_id).await.unwrap();

    let view = jobs.get_status(&job_id).await.unwrap();
    assert_eq!(view.status, JobStatus::CalculationComplete);
}

#[tokio::test]
async fn auto_calc_failure_is_recorded_with_exit_code() {
    let jobs = new_job_manager().await;
    let (from, to, geometry, request) = empty_request("calc-fail");
    let (job_id, _) = jobs.create(from, to, geometry, request).await.unwrap();

    let orchestrator = Orchestrator::new(
        jobs.clone(),
        CoverageChecker::new(scratch_roots("calc-fail")),
        FetchManager::new(),
        OrchestratorConfig { auto_calc: true, calculation_bin: "false".into(), db_path: ":memory:".into() },
    );

    orchestrator.run(&job_id).await.unwrap();

    let view = jobs.get_status(&job_id).await.unwrap();
    assert_eq!(view.status, JobStatus::CalculationFailed);
    assert!(view.error_message.unwrap().contains("compute step exited with code"));
}

#[tokio::test]
async fn retrigger_calculation_reruns_just_the_compute_step() {
    let jobs = new_job_manager().await;
    let (from, to, geometry, request) = empty_request("retrigger");
    let (job_id, _) = jobs.create(from, to, geometry, request).await.unwrap();

    let orchestrator = Orchestrator::new(
        jobs.clone(),
        CoverageChecker::new(scratch_roots("retrigger")),
        FetchManager::new(),
        OrchestratorConfig { auto_calc: false, calculation_bin: "true".into(), db_path: ":memory:".into() },
    );

    orchestrator.run(&job_id).await.unwrap();
    assert_eq!(jobs.get_status(&job_id).await.unwrap().status, JobStatus::Success);

    orchestrator.retrigger_calculation(&job_id).await.unwrap();
    assert_eq!(jobs.get_status(&job_id).await.unwrap().status, JobStatus::CalculationComplete);
}
