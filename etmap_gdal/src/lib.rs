/*
 * Copyright (c) 2024, United States Government, as represented by the
 * Administrator of the National Aeronautics and Space Administration.
 * All rights reserved.
 *
 * The ODIN - Open Data Integration Framework is licensed under the
 * Apache License, Version 2.0 (the "License"); you may not use this file
 * except in compliance with the License. You may obtain a copy of the
 * License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */
#![allow(unused)]

pub mod errors;

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::path::Path;

// re-exported so downstream crates don't need a direct gdal dependency for the common types
pub use gdal::{self, Driver, DriverManager, Metadata, MetadataEntry, Dataset, errors::GdalError, GeoTransform};
pub use gdal::raster::{GdalType, RasterBand, Buffer};
pub use gdal::spatial_ref::{CoordTransform, CoordTransformOptions, SpatialRef};

use etmap_common::fs::get_filename_extension;
use crate::errors::{Result, misc_error, last_gdal_error, EtmapGdalError, gdal_error};

lazy_static! {
    static ref EXT_MAP: HashMap<&'static str, &'static str> = HashMap::from( [
        ("tif", "GTiff"),
        ("png", "PNG"),
        ("nc", "netCDF"),
        ("json", "GeoJSON"),
        ("geojson", "GeoJSON"),
    ]);
}

pub fn initialize_gdal() -> bool {
    EXT_MAP.len() > 0
}

pub fn get_driver_name_from_filename (filename: &str) -> Option<&'static str> {
    get_filename_extension(filename).and_then( |ext| EXT_MAP.get( ext.to_lowercase().as_str()).map(|v| *v))
}

pub fn get_driver_from_filename (filename: &str) -> Option<gdal::Driver> {
    get_filename_extension(filename)
        .and_then( |ext| EXT_MAP.get( ext.to_lowercase().as_str()))
        .and_then( |n| DriverManager::get_driver_by_name(n).ok())
}

pub fn bounds_center (x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> (f64,f64) {
    ((x_min + x_max) / 2.0, (y_min + y_max) / 2.0)
}

pub fn transform_point_2d (transform: &CoordTransform, x: f64, y: f64) -> Result<(f64,f64)> {
    let mut ax: [f64;1] = [x];
    let mut ay: [f64;1] = [y];
    let mut az: [f64;0] = [];

    transform.transform_coords(&mut ax, &mut ay, &mut az)?;
    Ok((ax[0],ay[0]))
}

// watch out - if source or target are geographic we might have to swap axis order
// (we don't want to change axis_mapping_strategy in the provided SpatialRefs though)
pub fn transform_bounds_2d (s_srs: &SpatialRef, t_srs: &SpatialRef,
                            x_min: f64, y_min: f64,
                            x_max: f64, y_max: f64,
                            opt_densify_pts: Option<i32>) -> Result<(f64,f64,f64,f64)> {

    let s_is_geo = s_srs.is_geographic();
    let t_is_geo = t_srs.is_geographic();

    let mut bounds: [f64;4] = if s_is_geo && !t_is_geo { [y_min,x_min,y_max,x_max] } else { [x_min,y_min,x_max,y_max] };
    let densify_pts: i32 = opt_densify_pts.unwrap_or(21); // default recommended by GDAL OCTTransformBounds doc

    let mut ct_options = CoordTransformOptions::new()?;
    ct_options.desired_accuracy( 0.0);
    ct_options.set_ballpark_allowed(false);

    CoordTransform::new_with_options(s_srs, t_srs, &ct_options)
        .and_then( |transform| transform.transform_bounds(&mut bounds, densify_pts))
        .map_err(gdal_error)
        .map( |a| {
            if t_is_geo && !s_is_geo { (a[1], a[0], a[3], a[2]) } else { (a[0], a[1], a[2], a[3]) }
        })
}

pub fn srs_lon_lat () -> SpatialRef { SpatialRef::from_epsg(4326).unwrap() }
pub fn srs_epsg_4326 () -> SpatialRef { SpatialRef::from_epsg(4326).unwrap() }

pub fn srs_epsg (epsg: u32) -> Result<SpatialRef> {
    Ok(SpatialRef::from_epsg(epsg)?)
}

/// west/south/east/north bounds of a raster dataset's footprint, in its own CRS
pub fn raster_bounds (ds: &Dataset) -> Result<(f64,f64,f64,f64)> {
    let (cols,rows) = ds.raster_size();
    let gt = ds.geo_transform()?;
    let x0 = gt[0];
    let y0 = gt[3];
    let x1 = gt[0] + gt[1]*(cols as f64) + gt[2]*(rows as f64);
    let y1 = gt[3] + gt[4]*(cols as f64) + gt[5]*(rows as f64);
    Ok( (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)) )
}

/// west/south/east/north bounds of a raster dataset's footprint, reprojected to EPSG:4326 (lon/lat)
pub fn raster_bounds_wgs84 (ds: &Dataset) -> Result<(f64,f64,f64,f64)> {
    let (x_min,y_min,x_max,y_max) = raster_bounds(ds)?;
    let s_srs = ds.spatial_ref().map_err(gdal_error)?;
    let t_srs = srs_epsg_4326();

    if s_srs.auth_code().ok() == t_srs.auth_code().ok() {
        return Ok((x_min,y_min,x_max,y_max));
    }
    transform_bounds_2d(&s_srs, &t_srs, x_min, y_min, x_max, y_max, None)
}
