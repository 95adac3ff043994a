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
use std::path::{Path,PathBuf};
use chrono::NaiveDate;
use geo::{BooleanOps,Contains};
use geo_types::{polygon,MultiPolygon,Polygon};

use etmap_common::paths::DataRoots;
use etmap_gdal::{Dataset,raster_bounds_wgs84};

use crate::errors::Result;
use crate::types::{Aoi,CoverageDetail,CoverageSummary,DatasetKind};

/// decides, per dataset, whether the local raw-data cache already satisfies a
/// (geometry, date range) request (§4.2). Holds no mutable state: every call re-reads
/// the cache from disk, so results are never stale across calls.
#[derive(Debug,Clone)]
pub struct CoverageChecker {
    roots: DataRoots,
}

impl CoverageChecker {
    pub fn new(roots: DataRoots) -> Self {
        Self { roots }
    }

    pub fn is_covered(&self, dataset: DatasetKind, aoi: &Aoi, date_from: NaiveDate, date_to: NaiveDate) -> Result<bool> {
        Ok(self.check_dataset(dataset, aoi, date_from, date_to)?.covered)
    }

    pub fn coverage_summary(&self, aoi: &Aoi, date_from: NaiveDate, date_to: NaiveDate) -> Result<CoverageSummary> {
        let mut datasets = Vec::with_capacity(3);
        for kind in DatasetKind::ALL {
            datasets.push((kind, self.check_dataset(kind, aoi, date_from, date_to)?));
        }
        Ok(CoverageSummary { datasets })
    }

    fn check_dataset(&self, dataset: DatasetKind, aoi: &Aoi, date_from: NaiveDate, date_to: NaiveDate) -> Result<CoverageDetail> {
        if aoi.is_empty() {
            // nothing to cover - §4.2 edge case
            return Ok(CoverageDetail { covered: true, file_count: 0, days_checked: 0, days_present: 0, temporal_ratio: None, spatial_contains: None });
        }

        match dataset {
            DatasetKind::Landsat => Ok(self.check_landsat(aoi)),
            DatasetKind::Prism => Ok(self.check_prism(aoi, date_from, date_to)),
            DatasetKind::Nldas => Ok(self.check_nldas(aoi, date_from, date_to)),
        }
    }

    /// Scene archive coverage intentionally ignores the request's date range - scenes are
    /// retained across dates and the union of everything on disk is what matters (§9).
    fn check_landsat(&self, aoi: &Aoi) -> CoverageDetail {
        let dir = self.roots.landsat_band_dir("B4");
        let polygons = footprint_polygons(&dir, "*.tif");
        let union = union_polygons(&polygons);
        let covered = spatial_contains(&union, aoi);

        CoverageDetail {
            covered,
            file_count: polygons.len(),
            days_checked: 0,
            days_present: 0,
            temporal_ratio: None,
            spatial_contains: Some(covered),
        }
    }

    /// every day in range must have at least one raster, and the footprint of one sample
    /// file (the first one found) must contain the AOI (§4.2, §9 - preserved quirk: only
    /// the first file's bounds are checked, not every day's).
    fn check_prism(&self, aoi: &Aoi, date_from: NaiveDate, date_to: NaiveDate) -> CoverageDetail {
        let days = date_range(date_from, date_to);
        let mut days_present = 0usize;
        let mut file_count = 0usize;
        let mut sample_footprint: Option<Polygon<f64>> = None;

        for day in &days {
            let dir = self.roots.prism_day_dir(*day);
            let files = list_files(&dir, "*.tif");
            file_count += files.len();
            if !files.is_empty() {
                days_present += 1;
                if sample_footprint.is_none() {
                    sample_footprint = files.first().and_then(|p| read_bounds_polygon(p));
                }
            }
        }

        let all_days_present = days_present == days.len() && !days.is_empty();
        let spatial_ok = sample_footprint.as_ref().map(|p| polygon_contains(p, aoi)).unwrap_or(false);
        let covered = all_days_present && spatial_ok;

        CoverageDetail {
            covered,
            file_count,
            days_checked: days.len(),
            days_present,
            temporal_ratio: None,
            spatial_contains: Some(spatial_ok),
        }
    }

    /// temporal coverage ratio = found_hours / (24 * days) must be >= 0.9, AND the union
    /// of all present files' footprints must contain the AOI (§4.2).
    fn check_nldas(&self, aoi: &Aoi, date_from: NaiveDate, date_to: NaiveDate) -> CoverageDetail {
        let days = date_range(date_from, date_to);
        let mut found_hours = 0usize;
        let mut polygons = Vec::new();

        for day in &days {
            let dir = self.roots.nldas_day_dir(*day);
            let files = list_files(&dir, "*.tif");
            found_hours += files.len();
            polygons.extend(files.iter().filter_map(|p| read_bounds_polygon(p)));
        }

        let total_required = days.len() * 24;
        let temporal_ratio = if total_required == 0 { 0.0 } else { found_hours as f64 / total_required as f64 };
        let union = union_polygons(&polygons);
        let spatial_ok = spatial_contains(&union, aoi);
        let covered = temporal_ratio >= 0.9 && spatial_ok;

        CoverageDetail {
            covered,
            file_count: found_hours,
            days_checked: days.len(),
            days_present: 0,
            temporal_ratio: Some(temporal_ratio),
            spatial_contains: Some(spatial_ok),
        }
    }
}

fn date_range(date_from: NaiveDate, date_to: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut d = date_from;
    while d <= date_to {
        days.push(d);
        d = d.succ_opt().unwrap();
    }
    days
}

/// missing directories yield an empty listing, never an error (§4.2 edge case).
fn list_files(dir: &Path, pattern: &str) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let glob_pattern = dir.join(pattern);
    match glob::glob(&glob_pattern.to_string_lossy()) {
        Ok(paths) => paths.filter_map(std::result::Result::ok).collect(),
        Err(_) => Vec::new(),
    }
}

fn footprint_polygons(dir: &Path, pattern: &str) -> Vec<Polygon<f64>> {
    list_files(dir, pattern).iter().filter_map(|p| read_bounds_polygon(p)).collect()
}

/// reads a raster's footprint, reprojected to geographic coordinates. Files with corrupted
/// or unreadable headers are logged and skipped rather than failing the whole check (§4.2).
fn read_bounds_polygon(path: &Path) -> Option<Polygon<f64>> {
    match Dataset::open(path) {
        Ok(ds) => match raster_bounds_wgs84(&ds) {
            Ok((west,south,east,north)) => Some(polygon![
                (x: west, y: south), (x: east, y: south), (x: east, y: north), (x: west, y: north), (x: west, y: south)
            ]),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read raster bounds, skipping");
                None
            }
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to open raster, skipping");
            None
        }
    }
}

fn union_polygons(polygons: &[Polygon<f64>]) -> Option<MultiPolygon<f64>> {
    let mut iter = polygons.iter();
    let first = iter.next()?;
    let mut acc = MultiPolygon::new(vec![first.clone()]);
    for p in iter {
        acc = acc.union(&MultiPolygon::new(vec![p.clone()]));
    }
    Some(acc)
}

fn spatial_contains(union: &Option<MultiPolygon<f64>>, aoi: &Aoi) -> bool {
    match (union, aoi.polygon()) {
        (Some(u), Some(p)) => u.contains(p),
        _ => false,
    }
}

fn polygon_contains(footprint: &Polygon<f64>, aoi: &Aoi) -> bool {
    match aoi.polygon() {
        Some(p) => footprint.contains(p),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_range_is_inclusive() {
        let d1 = NaiveDate::from_ymd_opt(2024,3,29).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024,3,31).unwrap();
        assert_eq!(date_range(d1,d2), vec![d1, d1.succ_opt().unwrap(), d2]);
    }

    #[test]
    fn date_range_single_day() {
        let d = NaiveDate::from_ymd_opt(2024,3,29).unwrap();
        assert_eq!(date_range(d,d), vec![d]);
    }

    #[test]
    fn list_files_on_missing_dir_is_empty_not_error() {
        let files = list_files(Path::new("/no/such/directory/at/all"), "*.tif");
        assert!(files.is_empty());
    }

    #[test]
    fn empty_aoi_is_always_covered() {
        let roots = DataRoots::new("/nonexistent", "/nonexistent");
        let checker = CoverageChecker::new(roots);
        let d = NaiveDate::from_ymd_opt(2024,3,29).unwrap();
        let detail = checker.check_dataset(DatasetKind::Landsat, &Aoi::empty(), d, d).unwrap();
        assert!(detail.covered);
    }

    #[test]
    fn missing_cache_is_not_covered_for_nonempty_aoi() {
        let roots = DataRoots::new("/nonexistent-root-for-test", "/nonexistent-results");
        let checker = CoverageChecker::new(roots);
        let d = NaiveDate::from_ymd_opt(2024,3,29).unwrap();
        let aoi = Aoi::from_geojson_value(&serde_json::json!({
            "type":"Polygon",
            "coordinates":[[[0.0,0.0],[1.0,0.0],[1.0,1.0],[0.0,1.0],[0.0,0.0]]]
        })).unwrap();

        for kind in DatasetKind::ALL {
            let detail = checker.check_dataset(kind, &aoi, d, d).unwrap();
            assert!(!detail.covered, "{kind} should not be covered with an empty cache");
        }
    }
}
