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

use async_trait::async_trait;
use chrono::{Datelike,NaiveDate};
use gdal::{Dataset,DriverManager};
use gdal::raster::{Buffer,GdalType,RasterCreationOption};

use etmap_common::paths::DataRoots;
use etmap_coverage::Aoi;

use crate::errors::{EtmapFetchError,Result};
use crate::fetcher::DatasetFetcher;
use crate::fetchers::download::already_present;
use crate::retry::retry_with_backoff;

/// the six bands every hourly forcing raster carries, in fixed output order, together
/// with the alternative netCDF variable names providers have used historically.
const BAND_CANDIDATES: [(&str, &[&str]); 6] = [
    ("air_temperature", &["TMP", "Tair", "air_temperature"]),
    ("specific_humidity", &["SPFH", "Qair", "specific_humidity"]),
    ("surface_pressure", &["PRES", "PSurf", "surface_pressure"]),
    ("wind_u", &["UGRD", "Wind_E", "eastward_wind"]),
    ("wind_v", &["VGRD", "Wind_N", "northward_wind"]),
    ("shortwave_radiation", &["DSWRF", "SWdown", "surface_downwelling_shortwave_flux_in_air"]),
];

/// fetches hourly forcing rasters, one 6-band GeoTIFF per hour, from a credentialed
/// provider. Requires a `.netrc`-style credentials file read once at construction.
pub struct HourlyForcingFetcher {
    client: reqwest::Client,
    roots: DataRoots,
    base_url: String,
    #[allow(dead_code)]
    credentials: NetrcCredentials,
    max_retries: u32,
}

#[derive(Debug,Clone)]
struct NetrcCredentials {
    #[allow(dead_code)]
    login: String,
    #[allow(dead_code)]
    password: String,
}

impl HourlyForcingFetcher {
    pub fn new(client: reqwest::Client, roots: DataRoots, base_url: impl Into<String>, netrc_path: impl AsRef<Path>) -> Result<Self> {
        let credentials = read_netrc_credentials(netrc_path.as_ref())?;
        Ok(Self { client, roots, base_url: base_url.into(), credentials, max_retries: 3 })
    }

    fn provider_url(&self, date: NaiveDate, hour: u32) -> String {
        let day_of_year = date.ordinal();
        format!("{}/{}/{:03}/nldas_fora_{}_{hour:02}00.nc4", self.base_url, date.year(), day_of_year, date.format("%Y%m%d"))
    }

    async fn fetch_hour(&self, date: NaiveDate, hour: u32) -> Result<()> {
        let dest = self.roots.nldas_hour_path(date, hour);
        if already_present(&dest) {
            return Ok(());
        }

        let url = self.provider_url(date, hour);
        let tmp_payload = dest.with_extension("nc4.part");

        if let Some(parent) = tmp_payload.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let download_result = download_payload(&self.client, &url, &tmp_payload).await;
        let result = match download_result {
            Ok(()) => build_forcing_raster(&tmp_payload, &dest).await,
            Err(e) => Err(e),
        };

        let _ = std::fs::remove_file(&tmp_payload);
        result
    }
}

async fn download_payload(client: &reqwest::Client, url: &str, dest: &Path) -> Result<()> {
    let response = client.get(url).send().await.map_err(|e| EtmapFetchError::FetchTransient(e.to_string()))?;
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(EtmapFetchError::FetchFatal(format!("authentication failed ({status})")));
    }
    if !status.is_success() {
        return Err(EtmapFetchError::FetchTransient(format!("request failed with status {status}")));
    }

    let bytes = response.bytes().await.map_err(|e| EtmapFetchError::FetchTransient(e.to_string()))?;
    if bytes.len() >= 15 && &bytes[..15].to_ascii_lowercase() == b"<!doctype html>" {
        return Err(EtmapFetchError::FetchFatal("provider returned an HTML response (authentication error)".into()));
    }

    std::fs::write(dest, &bytes)?;
    Ok(())
}

/// reads the six forcing variables from the downloaded netCDF payload and writes them as
/// a tiled, compressed, band-described GeoTIFF at `dest`. Runs on a blocking thread since
/// `gdal` is not async-aware.
async fn build_forcing_raster(payload: &Path, dest: &Path) -> Result<()> {
    let payload = payload.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || build_forcing_raster_blocking(&payload, &dest))
        .await
        .map_err(|e| EtmapFetchError::FetchFatal(format!("raster build task panicked: {e}")))?
}

fn build_forcing_raster_blocking(payload: &Path, dest: &Path) -> Result<()> {
    let mut bands: Vec<Buffer<f32>> = Vec::with_capacity(BAND_CANDIDATES.len());
    let mut size = None;
    let mut geo_transform = None;
    let mut srs = None;
    let mut needs_flip = false;

    for (canonical_name, candidates) in BAND_CANDIDATES {
        let subds = open_variable(payload, candidates)
            .ok_or_else(|| EtmapFetchError::FetchFatal(format!("variable {canonical_name} not found under any known name")))?;

        let band = subds.rasterband(1).map_err(|e| EtmapFetchError::FetchFatal(format!("no raster band for {canonical_name}: {e}")))?;
        let (w, h) = subds.raster_size();
        let mut data: Buffer<f32> = band.read_as((0, 0), (w, h), (w, h), None)
            .map_err(|e| EtmapFetchError::FetchFatal(format!("failed to read {canonical_name}: {e}")))?;

        if geo_transform.is_none() {
            let gt = subds.geo_transform().ok();
            needs_flip = gt.as_ref().map(|gt| gt[5] > 0.0).unwrap_or(false);
            geo_transform = gt;
            srs = subds.spatial_ref().ok();
            size = Some((w, h));
        }

        if needs_flip {
            flip_rows(&mut data, w, h);
        }

        bands.push(data);
    }

    let (w, h) = size.ok_or_else(|| EtmapFetchError::FetchFatal("no bands read".into()))?;
    let driver = DriverManager::get_driver_by_name("GTiff")
        .map_err(|e| EtmapFetchError::FetchFatal(format!("GTiff driver unavailable: {e}")))?;

    let creation_options = [
        RasterCreationOption { key: "TILED", value: "YES" },
        RasterCreationOption { key: "COMPRESS", value: "DEFLATE" },
        RasterCreationOption { key: "PREDICTOR", value: "2" },
    ];
    let mut out_ds = driver.create_with_band_type_with_options::<f32, _>(dest, w, h, bands.len(), &creation_options)
        .map_err(|e| EtmapFetchError::FetchFatal(format!("failed to create output raster: {e}")))?;

    if let Some(mut gt) = geo_transform {
        if needs_flip {
            // rows were reversed into north-up order above; the source transform still
            // describes the south-origin layout, so recompute a north-up transform
            // (equivalent to rasterio's from_bounds after a[::-1,:]) rather than writing
            // it unchanged over flipped data.
            gt[3] += (h as f64) * gt[5];
            gt[5] = -gt[5];
        }
        let _ = out_ds.set_geo_transform(&gt);
    }
    if let Some(srs) = srs {
        let _ = out_ds.set_spatial_ref(&srs);
    }

    for (i, (data, (canonical_name, _))) in bands.into_iter().zip(BAND_CANDIDATES).enumerate() {
        let mut band = out_ds.rasterband(i + 1).map_err(|e| EtmapFetchError::FetchFatal(format!("failed to access output band {i}: {e}")))?;
        band.write((0, 0), (w, h), &data).map_err(|e| EtmapFetchError::FetchFatal(format!("failed to write band {canonical_name}: {e}")))?;
        let _ = band.set_description(canonical_name);
    }

    Ok(())
}

fn open_variable(payload: &Path, candidates: &[&str]) -> Option<Dataset> {
    let path_str = payload.to_string_lossy();
    candidates.iter().find_map(|name| {
        Dataset::open(format!("NETCDF:\"{path_str}\":{name}")).ok()
    })
}

fn flip_rows(buffer: &mut Buffer<f32>, width: usize, height: usize) {
    for row in 0..height / 2 {
        let top = row * width;
        let bottom = (height - 1 - row) * width;
        for col in 0..width {
            buffer.data.swap(top + col, bottom + col);
        }
    }
}

/// minimal `.netrc` parser: looks for a `machine <host> login <user> password <pass>`
/// entry. Fails fast if the file is absent, matching the contract obligation (§4.3.3).
fn read_netrc_credentials(path: &Path) -> Result<NetrcCredentials> {
    let contents = std::fs::read_to_string(path)
        .map_err(|_| EtmapFetchError::ConfigError(format!("credentials file not found: {}", path.display())))?;

    let tokens: Vec<&str> = contents.split_whitespace().collect();
    let mut login = None;
    let mut password = None;
    let mut i = 0;
    while i + 1 < tokens.len() {
        match tokens[i] {
            "login" => login = Some(tokens[i + 1].to_string()),
            "password" => password = Some(tokens[i + 1].to_string()),
            _ => {}
        }
        i += 1;
    }

    match (login, password) {
        (Some(login), Some(password)) => Ok(NetrcCredentials { login, password }),
        _ => Err(EtmapFetchError::ConfigError(format!("no login/password entry in {}", path.display()))),
    }
}

#[async_trait]
impl DatasetFetcher for HourlyForcingFetcher {
    fn name(&self) -> &str { "nldas" }

    async fn fetch(&self, date_from: NaiveDate, date_to: NaiveDate, _aoi: &Aoi) -> Result<bool> {
        let mut day = date_from;
        while day <= date_to {
            let dir = self.roots.nldas_day_dir(day);
            let existing = glob_count(&dir);
            if existing >= 24 {
                day = day.succ_opt().unwrap();
                continue;
            }

            for hour in 0..24u32 {
                let dest = self.roots.nldas_hour_path(day, hour);
                if already_present(&dest) {
                    continue;
                }

                match retry_with_backoff(self.max_retries, || self.fetch_hour(day, hour)).await {
                    Ok(()) => {}
                    Err(e @ EtmapFetchError::FetchFatal(_)) => return Err(e),
                    Err(e) => tracing::warn!(date = %day, hour, error = %e, "hour download failed, continuing with remaining hours"),
                }
            }
            day = day.succ_opt().unwrap();
        }
        Ok(true)
    }
}

fn glob_count(dir: &Path) -> usize {
    if !dir.is_dir() {
        return 0;
    }
    let pattern = dir.join("*.tif");
    glob::glob(&pattern.to_string_lossy()).map(|p| p.count()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn netrc_parsing_reads_login_and_password() {
        let dir = std::env::temp_dir().join(format!("etmap-netrc-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(".netrc");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "machine urs.earthdata.nasa.gov login alice password s3cr3t").unwrap();

        let creds = read_netrc_credentials(&path).unwrap();
        assert_eq!(creds.login, "alice");
        assert_eq!(creds.password, "s3cr3t");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_netrc_is_a_config_error() {
        let result = read_netrc_credentials(Path::new("/no/such/.netrc"));
        assert!(matches!(result, Err(EtmapFetchError::ConfigError(_))));
    }

    #[test]
    fn glob_count_on_missing_dir_is_zero() {
        assert_eq!(glob_count(Path::new("/no/such/directory")), 0);
    }
}
