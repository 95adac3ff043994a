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

//! drives a job from creation to a terminal state: coverage check, sequential dataset
//! fetches, and the optional downstream compute step.

pub mod compute;
pub mod config;
pub mod errors;
pub mod job_manager;
pub mod orchestrator;

pub use config::OrchestratorConfig;
pub use errors::{EtmapOrchestratorError, Result};
pub use job_manager::{JobManager, JobView};
pub use orchestrator::Orchestrator;
