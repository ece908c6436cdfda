use axum::body::Bytes;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Lenient JSON body parsing: an empty or whitespace-only body is `T::default()`,
/// so cookie-driven endpoints work when the client posts nothing.
pub fn parse_optional_json<T>(body: &Bytes) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::MalformedBody(e.to_string()))
}
