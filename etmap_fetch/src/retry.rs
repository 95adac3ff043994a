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
use std::future::Future;
use std::time::Duration;

use crate::errors::{EtmapFetchError,Result};

/// linear backoff capped at 30s, as used by every fetcher in this crate: `min(5*attempt, 30)`.
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs((5 * attempt).min(30) as u64)
}

/// runs `op` up to `max_retries + 1` times. `FetchFatal` errors abort immediately and are
/// never retried; `FetchTransient` (and anything else) count against the retry cap.
pub async fn retry_with_backoff<T, F, Fut>(max_retries: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e @ EtmapFetchError::FetchFatal(_)) => return Err(e),
            Err(e) => {
                if attempt >= max_retries {
                    return Err(e);
                }
                attempt += 1;
                tracing::warn!(attempt, error = %e, "retrying after transient failure");
                tokio::time::sleep(backoff_delay(attempt)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32,Ordering};

    #[test]
    fn backoff_is_linear_and_caps_at_30s() {
        assert_eq!(backoff_delay(1), Duration::from_secs(5));
        assert_eq!(backoff_delay(4), Duration::from_secs(20));
        assert_eq!(backoff_delay(10), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 { Err(EtmapFetchError::FetchTransient("not yet".into())) } else { Ok(42) }
            }
        }).await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_error_is_never_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_backoff(5, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(EtmapFetchError::FetchFatal("auth".into())) }
        }).await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
