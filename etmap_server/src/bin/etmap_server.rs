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
use etmap_coverage::CoverageChecker;
use etmap_fetch::{FetchManager,GriddedClimateFetcher,HourlyForcingFetcher,SceneArchiveFetcher,StacCatalog};
use etmap_orchestrator::{JobManager,Orchestrator,OrchestratorConfig};
use etmap_server::{AppState,EtmapConfig,build_router};
use etmap_store::JobStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = EtmapConfig::load()?;
    tracing::info!(bind_addr = %config.bind_addr, data_dir = %config.data_dir, "starting etmap_server");

    let roots = DataRoots::new(config.data_dir.clone(), config.results_dir.clone());
    let store = JobStore::open(&config.db_path).await?;
    let jobs = JobManager::new(store);
    let coverage = CoverageChecker::new(roots.clone());

    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .build()?;

    let mut fetchers = FetchManager::new();

    let catalog = Arc::new(StacCatalog::new(http_client.clone(), "https://landsatlook.usgs.gov/stac-server", "landsat-c2l2-sr"));
    let scene_fetcher = SceneArchiveFetcher::new(catalog, http_client.clone(), roots.clone(), vec!["B4".to_string(), "B5".to_string()])
        .with_max_connections(config.max_connections_per_provider);
    fetchers.register(Arc::new(scene_fetcher));

    let gridded_fetcher = GriddedClimateFetcher::new(
        http_client.clone(),
        roots.clone(),
        "https://services.nacse.org/prism/data/get/us/4km",
        vec!["tmax".to_string(), "tmin".to_string(), "ppt".to_string()],
    ).with_max_connections(config.max_connections_per_provider);
    fetchers.register(Arc::new(gridded_fetcher));

    let netrc_path = dirs_netrc_path();
    match HourlyForcingFetcher::new(http_client.clone(), roots.clone(), "https://hydro1.gesdisc.eosdis.nasa.gov/data/NLDAS", &netrc_path) {
        Ok(hourly_fetcher) => fetchers.register(Arc::new(hourly_fetcher)),
        Err(e) => tracing::warn!(error = %e, path = %netrc_path.display(), "hourly forcing fetcher unavailable, nldas requests will fail at fetch time"),
    }

    let orchestrator_config = OrchestratorConfig {
        auto_calc: config.auto_calc,
        calculation_bin: config.calculation_bin.clone(),
        db_path: config.db_path.clone(),
    };
    let orchestrator = Orchestrator::new(jobs.clone(), coverage, fetchers, orchestrator_config);

    let state = AppState::new(jobs, orchestrator, roots, config.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn dirs_netrc_path() -> std::path::PathBuf {
    std::env::var_os("HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".netrc")
}
