use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, warn};

use crate::error::ServeError;

/// Truncate a string to `max_len` characters, appending `...` if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    match s.char_indices().nth(max_len) {
        Some((end, _)) => {
            let mut out = String::with_capacity(end + 3);
            out.push_str(&s[..end]);
            out.push_str("...");
            out
        }
        None => s.to_string(),
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PayloadLogMode {
    #[default]
    Off,
    Truncated,
    Full,
}

impl PayloadLogMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Some(Self::Off),
            "truncated" => Some(Self::Truncated),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

/// Prepare a prompt or output for logging under `mode`
pub fn prepare_payload_log<T: Serialize>(mode: PayloadLogMode, payload: &T) -> Option<String> {
    match mode {
        PayloadLogMode::Off => None,
        PayloadLogMode::Truncated => Some(match serde_json::to_string(payload) {
            Ok(json) => truncate_str(&json, 2000),
            Err(_) => "<failed to serialize payload>".to_string(),
        }),
        PayloadLogMode::Full => Some(match serde_json::to_string_pretty(payload) {
            Ok(json) => json,
            Err(_) => "<failed to serialize payload>".to_string(),
        }),
    }
}

/// HTTP status for a request-time error
pub fn status_for(err: &ServeError) -> StatusCode {
    match err {
        ServeError::RouteNotFound(_) => StatusCode::NOT_FOUND,
        ServeError::MissingField(_) | ServeError::InvalidInput(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ServeError::ModelInvocation(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Errors are answered with `{"detail": "<message>"}`
impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            error!("Request failed ({}): {}", status.as_u16(), self);
        } else {
            warn!("Request rejected ({}): {}", status.as_u16(), self);
        }

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("abcdefghij", 4), "abcd...");
        assert_eq!(truncate_str("ééééé", 2), "éé...");
        assert_eq!(truncate_str("abcd", 4), "abcd");
    }

    #[test]
    fn test_truncate_str_counts_chars_not_bytes() {
        assert_eq!(truncate_str("ééé", 4), "ééé");
        assert_eq!(truncate_str("ééé", 3), "ééé");
        assert_eq!(truncate_str("日本語テキスト", 3), "日本語...");
    }

    #[test]
    fn test_payload_mode_parse() {
        assert_eq!(PayloadLogMode::parse("Full"), Some(PayloadLogMode::Full));
        assert_eq!(PayloadLogMode::parse("truncated"), Some(PayloadLogMode::Truncated));
        assert_eq!(PayloadLogMode::parse("off"), Some(PayloadLogMode::Off));
        assert_eq!(PayloadLogMode::parse("verbose"), None);
        assert_eq!(PayloadLogMode::default(), PayloadLogMode::Off);
    }

    #[test]
    fn test_prepare_payload_log_follows_mode() {
        let payload = "x".repeat(3000);
        assert_eq!(prepare_payload_log(PayloadLogMode::Off, &payload), None);

        let truncated = prepare_payload_log(PayloadLogMode::Truncated, &payload).unwrap();
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 2003);

        let full = prepare_payload_log(PayloadLogMode::Full, &payload).unwrap();
        assert_eq!(full.len(), 3002);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&ServeError::RouteNotFound("/x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&ServeError::MissingField("topic".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&ServeError::ModelInvocation("timeout".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&ServeError::Other("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
