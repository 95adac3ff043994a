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
use clap::Parser;
use serde::{Deserialize,Serialize};

use crate::errors::{EtmapServerError,Result};

/// read-only configuration built once at startup, layered defaults -> RON file -> env
/// vars -> CLI flags (§6.3), mirroring this codebase's own `ron`-based config-file
/// convention adapted to a single-service binary.
#[derive(Debug,Clone,Serialize,Deserialize)]
pub struct EtmapConfig {
    pub data_dir: String,
    pub results_dir: String,
    pub db_path: String,
    pub bind_addr: String,
    pub max_connections_per_provider: usize,
    pub auto_calc: bool,
    pub calculation_bin: String,
}

impl Default for EtmapConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            results_dir: "./results".to_string(),
            db_path: "./etmap.sqlite".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            max_connections_per_provider: 4,
            auto_calc: true,
            calculation_bin: "etmap-calculate".to_string(),
        }
    }
}

/// a config file holds a (possibly partial) layer on top of the compiled-in defaults;
/// every field is optional so a deployment only overrides what it needs to.
#[derive(Debug,Clone,Default,Deserialize)]
struct ConfigFile {
    data_dir: Option<String>,
    results_dir: Option<String>,
    db_path: Option<String>,
    bind_addr: Option<String>,
    max_connections_per_provider: Option<usize>,
    auto_calc: Option<bool>,
    calculation_bin: Option<String>,
}

#[derive(Debug,Parser)]
#[command(name = "etmap_server", about = "ET map-request orchestration service")]
struct CliArgs {
    /// path to a RON config file
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    data_dir: Option<String>,

    #[arg(long)]
    results_dir: Option<String>,

    #[arg(long)]
    db_path: Option<String>,

    #[arg(long)]
    bind_addr: Option<String>,

    #[arg(long)]
    max_connections_per_provider: Option<usize>,

    #[arg(long)]
    auto_calc: Option<bool>,

    #[arg(long)]
    calculation_bin: Option<String>,
}

impl EtmapConfig {
    /// builds the final configuration from compiled-in defaults, an optional RON file,
    /// `ETMAP_*` environment variables, and CLI flags, each layer overriding the last.
    pub fn load() -> Result<Self> {
        let args = CliArgs::parse();
        Self::load_from(args)
    }

    fn load_from(args: CliArgs) -> Result<Self> {
        let mut cfg = EtmapConfig::default();

        if let Some(path) = &args.config {
            let data = std::fs::read(path).map_err(|e| EtmapServerError::ConfigError(format!("cannot read config file {path}: {e}")))?;
            let file: ConfigFile = ron::de::from_bytes(&data).map_err(|e| EtmapServerError::ConfigError(format!("malformed config file {path}: {e}")))?;
            cfg.apply_file(file);
        }

        cfg.apply_env();
        cfg.apply_cli(args);

        Ok(cfg)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(v) = file.data_dir { self.data_dir = v; }
        if let Some(v) = file.results_dir { self.results_dir = v; }
        if let Some(v) = file.db_path { self.db_path = v; }
        if let Some(v) = file.bind_addr { self.bind_addr = v; }
        if let Some(v) = file.max_connections_per_provider { self.max_connections_per_provider = v; }
        if let Some(v) = file.auto_calc { self.auto_calc = v; }
        if let Some(v) = file.calculation_bin { self.calculation_bin = v; }
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("ETMAP_DATA_DIR") { self.data_dir = v; }
        if let Ok(v) = std::env::var("ETMAP_RESULTS_DIR") { self.results_dir = v; }
        if let Ok(v) = std::env::var("ETMAP_DB_PATH") { self.db_path = v; }
        if let Ok(v) = std::env::var("ETMAP_BIND_ADDR") { self.bind_addr = v; }
        if let Ok(v) = std::env::var("ETMAP_MAX_CONNECTIONS_PER_PROVIDER") {
            if let Ok(n) = v.parse() { self.max_connections_per_provider = n; }
        }
        if let Ok(v) = std::env::var("ETMAP_AUTO_CALC") {
            if let Ok(b) = v.parse() { self.auto_calc = b; }
        }
        if let Ok(v) = std::env::var("ETMAP_CALCULATION_BIN") { self.calculation_bin = v; }
    }

    fn apply_cli(&mut self, args: CliArgs) {
        if let Some(v) = args.data_dir { self.data_dir = v; }
        if let Some(v) = args.results_dir { self.results_dir = v; }
        if let Some(v) = args.db_path { self.db_path = v; }
        if let Some(v) = args.bind_addr { self.bind_addr = v; }
        if let Some(v) = args.max_connections_per_provider { self.max_connections_per_provider = v; }
        if let Some(v) = args.auto_calc { self.auto_calc = v; }
        if let Some(v) = args.calculation_bin { self.calculation_bin = v; }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_args() -> CliArgs {
        CliArgs { config: None, data_dir: None, results_dir: None, db_path: None, bind_addr: None, max_connections_per_provider: None, auto_calc: None, calculation_bin: None }
    }

    #[test]
    fn defaults_apply_with_no_overrides() {
        let cfg = EtmapConfig::load_from(no_args()).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert!(cfg.auto_calc);
    }

    #[test]
    fn cli_flag_overrides_default() {
        let mut args = no_args();
        args.bind_addr = Some("127.0.0.1:9090".to_string());
        let cfg = EtmapConfig::load_from(args).unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:9090");
    }
}
