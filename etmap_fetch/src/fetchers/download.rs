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
use std::io::Write;
use std::path::Path;

use crate::errors::{EtmapFetchError,Result};

/// true if `path` already exists with a non-zero size - the idempotence check every
/// fetcher runs before attempting a download.
pub fn already_present(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

/// streams `url` to a `<name>.part` sibling of `dest` and renames into place on success,
/// so interrupted downloads never leave a half-written file at the canonical path.
/// an HTML response body is treated as a non-retryable authentication failure.
pub async fn download_to_path(client: &reqwest::Client, url: &str, dest: &Path) -> Result<()> {
    if already_present(dest) {
        return Ok(());
    }

    let tmp_path = dest.with_extension(
        format!("{}.part", dest.extension().and_then(|e| e.to_str()).unwrap_or("tmp"))
    );

    let response = client.get(url).send().await.map_err(|e| EtmapFetchError::FetchTransient(e.to_string()))?;
    let status = response.status();

    let content_type = response.headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !status.is_success() {
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(EtmapFetchError::FetchFatal(format!("authentication failed ({status})")));
        }
        return Err(EtmapFetchError::FetchTransient(format!("request failed with status {status}")));
    }

    if content_type.contains("text/html") {
        return Err(EtmapFetchError::FetchFatal("provider returned an HTML response (authentication error)".into()));
    }

    if let Some(parent) = tmp_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let bytes = response.bytes().await.map_err(|e| EtmapFetchError::FetchTransient(e.to_string()))?;
    if looks_like_html(&bytes) {
        return Err(EtmapFetchError::FetchFatal("provider returned an HTML response (authentication error)".into()));
    }

    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(&bytes)?;
    }

    if std::fs::metadata(&tmp_path)?.len() == 0 {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(EtmapFetchError::FetchTransient("downloaded file is empty".into()));
    }

    std::fs::rename(&tmp_path, dest)?;
    Ok(())
}

fn looks_like_html(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(256)];
    let text = String::from_utf8_lossy(head).to_ascii_lowercase();
    text.trim_start().starts_with("<!doctype html") || text.trim_start().starts_with("<html")
}

pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && &bytes[0..4] == b"PK\x03\x04"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_zip_magic_bytes() {
        assert!(is_zip(b"PK\x03\x04rest-of-archive"));
        assert!(!is_zip(b"not a zip"));
    }

    #[test]
    fn detects_html_response() {
        assert!(looks_like_html(b"<!DOCTYPE html><html><body>login</body></html>"));
        assert!(!looks_like_html(b"\x89PNG\r\n\x1a\n"));
    }

    #[test]
    fn missing_file_is_not_present() {
        assert!(!already_present(Path::new("/no/such/file.tif")));
    }
}
