// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

use std::{future::Future, time::Duration};

use log::debug;
use tokio::time;

use crate::error::Result;

/// Runs an operation up to `max_attempts` times, doubling the delay between
/// attempts starting from `base_delay`. The final failure is returned
/// unchanged.
pub(crate) async fn with_backoff<T, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 >= max_attempts => return Err(e),
            Err(e) => {
                let delay = base_delay * 2_u32.pow(attempt);
                debug!(
                    "Attempt {} failed ({}), retrying in {:?}",
                    attempt + 1,
                    e,
                    delay
                );
                time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    use crate::error::{Error, Result};

    use super::*;

    #[tokio::test]
    async fn succeeds_once_the_operation_does() -> Result<()> {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let value = with_backoff(3, Duration::from_millis(1), move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::Command)
                } else {
                    Ok(17)
                }
            }
        })
        .await?;

        assert_eq!(value, 17);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn gives_up_after_the_last_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<()> = with_backoff(3, Duration::from_millis(1), move || {
            let counter = Arc::clone(&counter);
            async move {
                let _count = counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::Command)
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
