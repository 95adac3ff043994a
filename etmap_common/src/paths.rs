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

//! the on-disk raw-data cache layout shared between the dataset fetchers, the coverage
//! checker and the downstream compute step. Keeping this in one place means a path
//! convention only ever needs to change here.

use std::path::PathBuf;
use chrono::{Datelike,NaiveDate};

/// roots of the raw-data cache and the per-job results tree, rooted at `ETMAP_DATA_DIR` /
/// `ETMAP_RESULTS_DIR`.
#[derive(Debug,Clone)]
pub struct DataRoots {
    pub data_dir: PathBuf,
    pub results_dir: PathBuf,
}

impl DataRoots {
    pub fn new(data_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into(), results_dir: results_dir.into() }
    }

    pub fn landsat_band_dir(&self, band: &str) -> PathBuf {
        self.data_dir.join(format!("Landsat_{band}"))
    }

    pub fn landsat_scene_path(&self, band: &str, scene_id: &str, date: NaiveDate) -> PathBuf {
        self.landsat_band_dir(band).join(format!("{band}_{scene_id}_{date}.tif", date = date.format("%Y-%m-%d")))
    }

    pub fn prism_day_dir(&self, date: NaiveDate) -> PathBuf {
        self.data_dir.join("Prism_Daily").join(date.format("%Y-%m-%d").to_string())
    }

    pub fn prism_variable_path(&self, date: NaiveDate, variable: &str) -> PathBuf {
        self.prism_day_dir(date).join(format!("prism_{variable}_{}.tif", date.format("%Y%m%d")))
    }

    pub fn nldas_year_dir(&self, year: i32) -> PathBuf {
        self.data_dir.join(format!("NLDAS_{year}_GeoTiff"))
    }

    pub fn nldas_day_dir(&self, date: NaiveDate) -> PathBuf {
        self.nldas_year_dir(date.year())
            .join(date.format("%Y-%m-%d").to_string())
    }

    pub fn nldas_hour_path(&self, date: NaiveDate, hour: u32) -> PathBuf {
        self.nldas_day_dir(date).join(format!("NLDAS_FORA_{}_{hour:02}00.tif", date.format("%Y%m%d")))
    }

    pub fn job_results_dir(&self, job_id: &str) -> PathBuf {
        self.results_dir.join(job_id)
    }

    pub fn preview_png_path(&self, job_id: &str) -> PathBuf {
        self.job_results_dir(job_id).join("preview.png")
    }

    pub fn result_tif_path(&self, job_id: &str) -> PathBuf {
        self.job_results_dir(job_id).join("result.tif")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landsat_path_matches_canonical_naming() {
        let roots = DataRoots::new("/data", "/results");
        let d = NaiveDate::from_ymd_opt(2024,3,29).unwrap();
        let p = roots.landsat_scene_path("B4", "LC08_123034_20240329", d);
        assert_eq!(p, PathBuf::from("/data/Landsat_B4/B4_LC08_123034_20240329_2024-03-29.tif"));
    }

    #[test]
    fn prism_path_uses_compact_date() {
        let roots = DataRoots::new("/data", "/results");
        let d = NaiveDate::from_ymd_opt(2024,3,29).unwrap();
        let p = roots.prism_variable_path(d, "tmax");
        assert_eq!(p, PathBuf::from("/data/Prism_Daily/2024-03-29/prism_tmax_20240329.tif"));
    }

    #[test]
    fn nldas_hour_path_zero_pads_hour() {
        let roots = DataRoots::new("/data", "/results");
        let d = NaiveDate::from_ymd_opt(2024,3,29).unwrap();
        let p = roots.nldas_hour_path(d, 3);
        assert_eq!(p, PathBuf::from("/data/NLDAS_2024_GeoTiff/2024-03-29/NLDAS_FORA_20240329_0300.tif"));
    }
}
