//! Status and body handling shared by the remote clients.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::MetadataError;

/// 404 means the item does not exist, any other non-2xx status is a transient failure.
/// Transport and decode failures are reported separately by the callers.
pub(crate) fn ensure_success(resp: Response, context: &str) -> Result<Response, MetadataError> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(MetadataError::NotFound(format!("{context}: {status}")));
    }
    if !status.is_success() {
        return Err(MetadataError::Status {
            context: context.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(resp)
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    resp: Response,
    context: &str,
) -> Result<T, MetadataError> {
    let body = resp
        .bytes()
        .await
        .map_err(|e| MetadataError::Network(format!("{context}: {e}")))?;
    serde_json::from_slice(&body).map_err(|e| MetadataError::Corrupted(format!("{context}: {e}")))
}

pub(crate) fn transport(context: &str, err: reqwest::Error) -> MetadataError {
    MetadataError::Network(format!("{context}: {err}"))
}
