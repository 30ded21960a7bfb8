use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::api::transport::ApiResponse;
use crate::error::{DeskError, Result};

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    status: ErrorStatus,
}

#[derive(Deserialize)]
struct ErrorStatus {
    message: String,
}

/// Unwrap `{data: ...}` from a successful response, or map the error
/// envelope to a [`DeskError`].
pub fn decode<T: DeserializeOwned>(response: ApiResponse) -> Result<T> {
    if !response.is_success() {
        return Err(error_for(&response));
    }
    let envelope: DataEnvelope<T> = serde_json::from_str(&response.body)?;
    Ok(envelope.data)
}

/// Accept any 2xx response and ignore its body.
pub fn expect_success(response: ApiResponse) -> Result<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(error_for(&response))
    }
}

/// Map a non-2xx response to the error taxonomy. The message comes from the
/// `{status: {message}}` envelope when the body has one.
pub fn error_for(response: &ApiResponse) -> DeskError {
    let message = serde_json::from_str::<ErrorEnvelope>(&response.body)
        .map(|e| e.status.message)
        .unwrap_or_else(|_| format!("HTTP {}", response.status));
    match response.status {
        401 => DeskError::Auth(message),
        409 => DeskError::Conflict(message),
        status => DeskError::Api { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_unwraps_data() {
        let response = ApiResponse::new(200, r#"{"data":[1,2,3]}"#);
        let values: Vec<u32> = decode(response).unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn conflict_maps_to_conflict_error() {
        let response = ApiResponse::new(409, r#"{"status":{"message":"stale version"}}"#);
        match decode::<Vec<u32>>(response) {
            Err(DeskError::Conflict(message)) => assert_eq!(message, "stale version"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn error_without_envelope_uses_status_code() {
        let response = ApiResponse::new(502, "<html>bad gateway</html>");
        match expect_success(response) {
            Err(DeskError::Api { status, message }) => {
                assert_eq!(status, 502);
                assert_eq!(message, "HTTP 502");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unauthorized_maps_to_auth() {
        let response = ApiResponse::new(401, "");
        assert!(error_for(&response).is_auth());
    }
}
