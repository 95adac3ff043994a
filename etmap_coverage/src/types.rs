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
use std::fmt;
use geo_types::{Geometry,MultiPolygon,Polygon};
use serde::{Deserialize,Serialize};
use strum::{Display,EnumString};

use crate::errors::{EtmapCoverageError,Result};

/// the three raw-data sources the orchestrator drives, in the fixed processing order.
#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash,Serialize,Deserialize,Display,EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Landsat,
    Prism,
    Nldas,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 3] = [DatasetKind::Landsat, DatasetKind::Prism, DatasetKind::Nldas];
}

/// the requested area of interest, parsed from a client-supplied GeoJSON value into a
/// `geo_types` polygon so it can be intersected with raster footprints.
#[derive(Debug,Clone)]
pub struct Aoi(pub Option<Polygon<f64>>);

impl Aoi {
    /// an AOI with no geometry is trivially covered by every dataset (§4.2 edge case).
    pub fn empty() -> Self { Aoi(None) }

    pub fn is_empty(&self) -> bool { self.0.is_none() }

    pub fn polygon(&self) -> Option<&Polygon<f64>> { self.0.as_ref() }

    pub fn from_geojson_value(value: &serde_json::Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Aoi::empty());
        }

        let geojson_geom = geojson::Geometry::from_json_value(value.clone())
            .map_err(|e| EtmapCoverageError::InvalidGeometry(e.to_string()))?;

        let geometry: Geometry<f64> = geojson_geom.value.try_into()
            .map_err(|e: geojson::Error| EtmapCoverageError::InvalidGeometry(e.to_string()))?;

        match geometry {
            Geometry::Polygon(p) => Ok(Aoi(Some(p))),
            Geometry::MultiPolygon(mp) => {
                mp.0.into_iter().next()
                    .map(|p| Aoi(Some(p)))
                    .ok_or_else(|| EtmapCoverageError::InvalidGeometry("empty MultiPolygon".into()))
            }
            other => Err(EtmapCoverageError::InvalidGeometry(format!("unsupported geometry type: {other:?}"))),
        }
    }
}

/// per-dataset coverage detail surfaced for diagnostics (not persisted, §3).
#[derive(Debug,Clone,Serialize)]
pub struct CoverageDetail {
    pub covered: bool,
    pub file_count: usize,
    pub days_checked: usize,
    pub days_present: usize,
    pub temporal_ratio: Option<f64>,
    pub spatial_contains: Option<bool>,
}

/// the aggregate report returned by `coverage_summary`.
#[derive(Debug,Clone,Serialize)]
pub struct CoverageSummary {
    pub datasets: Vec<(DatasetKind,CoverageDetail)>,
}

impl CoverageSummary {
    pub fn datasets_covered(&self) -> usize {
        self.datasets.iter().filter(|(_,d)| d.covered).count()
    }

    pub fn total_datasets(&self) -> usize {
        self.datasets.len()
    }

    pub fn needs_fetching(&self) -> Vec<DatasetKind> {
        self.datasets.iter().filter(|(_,d)| !d.covered).map(|(k,_)| *k).collect()
    }
}
