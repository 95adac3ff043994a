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
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt,BufReader};
use tokio::process::Command;

use crate::errors::{EtmapOrchestratorError,Result};

/// spawns the downstream compute step and waits for it to exit, forwarding its merged
/// stdout/stderr through `tracing` one line at a time, tagged with the job identifier.
/// Returns `Ok(())` on exit code zero, `ComputeFailure` otherwise.
pub async fn run_calculation(calculation_bin: &str, job_id: &str, db_path: &str) -> Result<()> {
    let mut cmd = Command::new(calculation_bin);
    cmd.arg("--uuid").arg(job_id)
        .arg("--db-path").arg(db_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| EtmapOrchestratorError::ConfigError(format!("failed to spawn compute step: {e}")))?;

    let stdout = child.stdout.take().expect("piped stdout");
    let stderr = child.stderr.take().expect("piped stderr");

    let job_id_out = job_id.to_string();
    let stdout_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::info!(job_id = %job_id_out, "{line}");
        }
    });

    let job_id_err = job_id.to_string();
    let stderr_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::info!(job_id = %job_id_err, "{line}");
        }
    });

    let status = child.wait().await.map_err(|e| EtmapOrchestratorError::ConfigError(format!("compute step wait failed: {e}")))?;
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    if status.success() {
        Ok(())
    } else {
        Err(EtmapOrchestratorError::ComputeFailure(status.code().unwrap_or(-1)))
    }
}
