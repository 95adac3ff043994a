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

use etmap_coverage::{Aoi,CoverageChecker,DatasetKind};
use etmap_fetch::FetchManager;
use etmap_store::JobStatus;

use crate::compute::run_calculation;
use crate::config::OrchestratorConfig;
use crate::errors::{EtmapOrchestratorError,Result};
use crate::job_manager::JobManager;

/// per-dataset status variants in processing order, used to drive the state machine of
/// §4.7 without repeating the match logic for each of the three datasets.
fn status_variants(dataset: DatasetKind) -> (JobStatus, JobStatus, JobStatus, JobStatus) {
    match dataset {
        DatasetKind::Landsat => (JobStatus::LandsatStarted, JobStatus::LandsatDone, JobStatus::LandsatError, JobStatus::LandsatSkipped),
        DatasetKind::Prism => (JobStatus::PrismStarted, JobStatus::PrismDone, JobStatus::PrismError, JobStatus::PrismSkipped),
        DatasetKind::Nldas => (JobStatus::NldasStarted, JobStatus::NldasDone, JobStatus::NldasError, JobStatus::NldasSkipped),
    }
}

/// drives one job from `queued` to a terminal state: coverage check, sequential fetches
/// for the datasets declared missing, and (if enabled) the downstream compute step.
#[derive(Clone)]
pub struct Orchestrator {
    jobs: JobManager,
    coverage: Arc<CoverageChecker>,
    fetchers: FetchManager,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(jobs: JobManager, coverage: CoverageChecker, fetchers: FetchManager, config: OrchestratorConfig) -> Self {
        Self { jobs, coverage: Arc::new(coverage), fetchers, config }
    }

    /// runs the full job lifecycle. Intended to be driven from a detached `tokio::spawn`
    /// task started by the HTTP handler that created the job, never awaited inline by it.
    pub async fn run(&self, job_id: &str) -> Result<()> {
        let job = self.jobs.get_job(job_id).await?;
        self.jobs.update_status(job_id, JobStatus::CheckingCoverage, None).await?;

        let aoi = Aoi::from_geojson_value(&job.geometry)?;

        let coverage = self.coverage.clone();
        let aoi_for_check = aoi.clone();
        let summary = {
            let date_from = job.date_from;
            let date_to = job.date_to;
            tokio::task::spawn_blocking(move || coverage.coverage_summary(&aoi_for_check, date_from, date_to)).await??
        };

        for dataset in DatasetKind::ALL {
            let (started, done, error, skipped) = status_variants(dataset);
            let detail = summary.datasets.iter().find(|(k, _)| *k == dataset).map(|(_, d)| d);
            let covered = detail.map(|d| d.covered).unwrap_or(false);

            if covered {
                self.jobs.update_status(job_id, skipped, None).await?;
                continue;
            }

            self.jobs.update_status(job_id, started, None).await?;

            match self.fetchers.fetch_dataset(dataset.to_string().as_str(), job.date_from, job.date_to, &aoi).await {
                Ok(true) => {
                    self.jobs.update_status(job_id, done, None).await?;
                }
                Ok(false) => {
                    let message = format!("{dataset}: fetch made no progress");
                    self.jobs.update_status(job_id, error, Some(&message)).await?;
                    self.jobs.update_status(job_id, JobStatus::Failed, Some(&message)).await?;
                    return Ok(());
                }
                Err(e) => {
                    let message = format!("{dataset}: {e}");
                    self.jobs.update_status(job_id, error, Some(&message)).await?;
                    self.jobs.update_status(job_id, JobStatus::Failed, Some(&message)).await?;
                    return Ok(());
                }
            }
        }

        self.jobs.update_status(job_id, JobStatus::Success, None).await?;

        if self.config.auto_calc {
            self.run_calculation(job_id).await?;
        }

        Ok(())
    }

    /// re-triggers just the compute step for a job that already reached `success` on a
    /// prior request, without repeating coverage checks or fetches (§6.1 POST /etmap).
    pub async fn retrigger_calculation(&self, job_id: &str) -> Result<()> {
        self.run_calculation(job_id).await
    }

    async fn run_calculation(&self, job_id: &str) -> Result<()> {
        self.jobs.update_status(job_id, JobStatus::CalculationStarted, None).await?;

        match run_calculation(&self.config.calculation_bin, job_id, &self.config.db_path).await {
            Ok(()) => {
                self.jobs.update_status(job_id, JobStatus::CalculationComplete, None).await?;
                Ok(())
            }
            Err(EtmapOrchestratorError::ComputeFailure(code)) => {
                let message = format!("compute step exited with code {code}");
                self.jobs.update_status(job_id, JobStatus::CalculationFailed, Some(&message)).await?;
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.jobs.update_status(job_id, JobStatus::CalculationFailed, Some(&message)).await?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_variants_are_distinct_per_dataset() {
        let (s1, d1, e1, k1) = status_variants(DatasetKind::Landsat);
        let (s2, d2, e2, k2) = status_variants(DatasetKind::Prism);
        assert_ne!(s1, s2);
        assert_ne!(d1, d2);
        assert_ne!(e1, e2);
        assert_ne!(k1, k2);
    }
}
