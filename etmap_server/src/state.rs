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

use etmap_common::paths::DataRoots;
use etmap_orchestrator::{JobManager,Orchestrator};

use crate::config::EtmapConfig;

/// everything a handler needs, cloned cheaply into every request (axum requires `Clone`
/// on the state type; every field here is already an `Arc`/cheap-clone handle).
#[derive(Clone)]
pub struct AppState(Arc<Inner>);

struct Inner {
    jobs: JobManager,
    orchestrator: Orchestrator,
    roots: DataRoots,
    config: EtmapConfig,
}

impl AppState {
    pub fn new(jobs: JobManager, orchestrator: Orchestrator, roots: DataRoots, config: EtmapConfig) -> Self {
        Self(Arc::new(Inner { jobs, orchestrator, roots, config }))
    }

    pub fn jobs(&self) -> &JobManager { &self.0.jobs }
    pub fn orchestrator(&self) -> &Orchestrator { &self.0.orchestrator }
    pub fn roots(&self) -> &DataRoots { &self.0.roots }
    pub fn config(&self) -> &EtmapConfig { &self.0.config }
}
