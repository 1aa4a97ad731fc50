use std::future::Future;
use std::time::Duration;

use seriesguide_metadata::MetadataError;

pub const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(500);

/// Run `op` until it succeeds, fails with a non-retryable error or
/// `MAX_ATTEMPTS` is used up. The delay doubles after each attempt.
pub async fn with_retry<T, F, Fut>(mut op: F) -> Result<T, MetadataError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MetadataError>>,
{
    with_retry_delay(BASE_DELAY, &mut op).await
}

async fn with_retry_delay<T, F, Fut>(base: Duration, op: &mut F) -> Result<T, MetadataError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MetadataError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.kind().is_retryable() && attempt < MAX_ATTEMPTS => {
                let delay = base * 2u32.pow(attempt - 1);
                tracing::warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
