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
use std::str::FromStr;
use chrono::{DateTime,NaiveDate,Utc};
use serde::{Serialize,Deserialize};
use strum::{Display,EnumString};

use crate::errors::{EtmapStoreError,Result};

/// the job lifecycle state machine (§4.7 of the design). Transitions are enforced by the
/// orchestrator, not by this enum - the store persists whatever status it is given.
#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize,Display,EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    CheckingCoverage,

    LandsatStarted,
    LandsatDone,
    LandsatError,
    LandsatSkipped,

    PrismStarted,
    PrismDone,
    PrismError,
    PrismSkipped,

    NldasStarted,
    NldasDone,
    NldasError,
    NldasSkipped,

    Success,
    Failed,

    CalculationStarted,
    CalculationComplete,
    CalculationFailed,
}

impl JobStatus {
    /// terminal states admit no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::CalculationComplete | JobStatus::CalculationFailed)
    }

    pub fn is_error(&self) -> bool {
        matches!(self,
            JobStatus::LandsatError | JobStatus::PrismError | JobStatus::NldasError |
            JobStatus::Failed | JobStatus::CalculationFailed
        )
    }
}

/// a durable job record as persisted in the Job Store.
#[derive(Debug,Clone,Serialize,Deserialize)]
pub struct Job {
    pub id: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub geometry: serde_json::Value,
    pub dedup_key: String,
    pub status: JobStatus,
    pub request_json: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error_message: Option<String>,
}

/// raw row shape as it comes back from sqlite - every column is a plain scalar sqlx
/// knows how to decode, so `JobStatus`/geometry/timestamps are converted by hand
/// immediately afterwards rather than requiring a `sqlx::Type` impl on our own types.
#[derive(Debug,Clone,sqlx::FromRow)]
pub(crate) struct JobRow {
    pub id: String,
    pub date_from: String,
    pub date_to: String,
    pub geometry: String,
    pub dedup_key: String,
    pub status: String,
    pub request_json: String,
    pub created_at: String,
    pub updated_at: String,
    pub error_message: Option<String>,
}

impl TryFrom<JobRow> for Job {
    type Error = EtmapStoreError;

    fn try_from(row: JobRow) -> Result<Job> {
        let malformed = |field: &str| EtmapStoreError::MalformedRecord(format!("job {}: invalid {}", row.id, field));

        Ok(Job {
            date_from: NaiveDate::parse_from_str(&row.date_from, "%Y-%m-%d").map_err(|_| malformed("date_from"))?,
            date_to: NaiveDate::parse_from_str(&row.date_to, "%Y-%m-%d").map_err(|_| malformed("date_to"))?,
            geometry: serde_json::from_str(&row.geometry).map_err(|_| malformed("geometry"))?,
            status: JobStatus::from_str(&row.status).map_err(|_| EtmapStoreError::InvalidStatus(row.status.clone()))?,
            request_json: serde_json::from_str(&row.request_json).map_err(|_| malformed("request_json"))?,
            created_at: DateTime::parse_from_rfc3339(&row.created_at).map_err(|_| malformed("created_at"))?.with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&row.updated_at).map_err(|_| malformed("updated_at"))?.with_timezone(&Utc),
            id: row.id,
            dedup_key: row.dedup_key,
            error_message: row.error_message,
        })
    }
}

/// computes the deduplication key for a (date_from, date_to, geometry) tuple: the geometry
/// is first parsed and re-serialized with sorted keys so structurally identical GeoJSON
/// compares equal regardless of client-side field ordering or whitespace.
pub fn dedup_key(date_from: NaiveDate, date_to: NaiveDate, geometry: &serde_json::Value) -> String {
    let canonical_geometry = canonicalize_json(geometry);
    format!("{}|{}|{}", date_from, date_to, canonical_geometry)
}

/// recursively sorts object keys so two semantically-equal JSON values serialize identically
pub fn canonicalize_json(value: &serde_json::Value) -> String {
    fn sorted(value: &serde_json::Value) -> serde_json::Value {
        match value {
            serde_json::Value::Object(map) => {
                let mut entries: Vec<_> = map.iter().map(|(k,v)| (k.clone(), sorted(v))).collect();
                entries.sort_by(|a,b| a.0.cmp(&b.0));
                serde_json::Value::Object(entries.into_iter().collect())
            }
            serde_json::Value::Array(items) => serde_json::Value::Array(items.iter().map(sorted).collect()),
            other => other.clone(),
        }
    }
    sorted(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dedup_key_ignores_field_order() {
        let g1 = json!({"type":"Polygon","coordinates":[[[0.0,0.0],[1.0,0.0],[1.0,1.0],[0.0,0.0]]]});
        let g2 = json!({"coordinates":[[[0.0,0.0],[1.0,0.0],[1.0,1.0],[0.0,0.0]]],"type":"Polygon"});
        let d = NaiveDate::from_ymd_opt(2024,3,29).unwrap();
        assert_eq!(dedup_key(d,d,&g1), dedup_key(d,d,&g2));
    }

    #[test]
    fn dedup_key_differs_on_date() {
        let g = json!({"type":"Polygon","coordinates":[]});
        let d1 = NaiveDate::from_ymd_opt(2024,3,29).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024,3,30).unwrap();
        assert_ne!(dedup_key(d1,d1,&g), dedup_key(d2,d2,&g));
    }

    #[test]
    fn status_round_trips_through_string() {
        for s in [JobStatus::Queued, JobStatus::LandsatSkipped, JobStatus::CalculationFailed] {
            let text = s.to_string();
            let parsed = JobStatus::from_str(&text).unwrap();
            assert_eq!(s, parsed);
        }
    }

    #[test]
    fn terminal_states() {
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::CalculationComplete.is_terminal());
        assert!(!JobStatus::Success.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
    }
}
