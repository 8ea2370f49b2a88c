use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Internal,
    #[serde(other)]
    Unknown,
}

/// Error body the API may attach to a non-success response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default = "unknown_code")]
    pub code: ErrorCode,
    #[serde(alias = "error")]
    pub message: String,
}

fn unknown_code() -> ErrorCode {
    ErrorCode::Unknown
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_error_bodies() {
        let parsed: ApiError =
            serde_json::from_str(r#"{"error":"Invalid token"}"#).expect("json");
        assert_eq!(parsed.code, ErrorCode::Unknown);
        assert_eq!(parsed.message, "Invalid token");

        let parsed: ApiError =
            serde_json::from_str(r#"{"code":"not_found","message":"missing"}"#).expect("json");
        assert_eq!(parsed.code, ErrorCode::NotFound);
        assert_eq!(parsed.message, "missing");
    }
}
