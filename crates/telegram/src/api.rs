//! Bot API reply parsing.

use std::time::Duration;

use {serde::Deserialize, serde_json::Value};

/// The parts of a Bot API reply that drive delivery decisions.
///
/// Anything that does not parse as a reply object reads as a plain failure
/// with no retry hint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiResponse {
    pub ok: bool,
    pub error_code: Option<u16>,
    pub description: Option<String>,
    /// Server-requested wait before the same request may be sent again.
    pub retry_after: Option<Duration>,
}

impl ApiResponse {
    #[must_use]
    pub fn success() -> Self {
        Self {
            ok: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn rejected(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn rate_limited(wait: Duration) -> Self {
        Self {
            error_code: Some(429),
            retry_after: Some(wait),
            ..Self::default()
        }
    }

    /// Parse a reply body. Never fails.
    pub fn parse(body: &[u8]) -> Self {
        let Ok(raw) = serde_json::from_slice::<RawResponse>(body) else {
            return Self::default();
        };
        let retry_after = raw
            .parameters
            .and_then(|p| p.retry_after)
            .as_ref()
            .and_then(Value::as_f64)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());
        Self {
            ok: raw.ok,
            error_code: raw.error_code,
            description: raw.description,
            retry_after,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    ok: bool,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<Value>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn parses_success() {
        let response = ApiResponse::parse(br#"{"ok":true,"result":[{"message_id":7}]}"#);
        assert_eq!(response, ApiResponse::success());
    }

    #[test]
    fn parses_rate_limit_hint() {
        let body = br#"{
            "ok": false,
            "error_code": 429,
            "description": "Too Many Requests: retry after 5",
            "parameters": { "retry_after": 5 }
        }"#;
        let response = ApiResponse::parse(body);
        assert!(!response.ok);
        assert_eq!(response.error_code, Some(429));
        assert_eq!(response.retry_after, Some(Duration::from_secs(5)));
        assert_eq!(
            response.description.as_deref(),
            Some("Too Many Requests: retry after 5")
        );
    }

    #[test]
    fn fractional_hint_is_kept() {
        let response =
            ApiResponse::parse(br#"{"ok":false,"parameters":{"retry_after":1.5}}"#);
        assert_eq!(response.retry_after, Some(Duration::from_millis(1500)));
    }

    #[rstest]
    #[case::negative(br#"{"ok":false,"parameters":{"retry_after":-3}}"#.as_slice())]
    #[case::string(br#"{"ok":false,"parameters":{"retry_after":"5"}}"#.as_slice())]
    #[case::other_parameters(br#"{"ok":false,"parameters":{"migrate_to_chat_id":-100}}"#.as_slice())]
    #[case::no_parameters(br#"{"ok":false,"error_code":400,"description":"Bad Request"}"#.as_slice())]
    fn rejection_without_usable_hint(#[case] body: &[u8]) {
        let response = ApiResponse::parse(body);
        assert!(!response.ok);
        assert_eq!(response.retry_after, None);
    }

    #[rstest]
    #[case::html(b"<html>502 Bad Gateway</html>".as_slice())]
    #[case::empty(b"".as_slice())]
    #[case::missing_ok(br#"{"result":true}"#.as_slice())]
    #[case::truncated(br#"{"ok":tr"#.as_slice())]
    fn malformed_bodies_read_as_plain_failure(#[case] body: &[u8]) {
        assert_eq!(ApiResponse::parse(body), ApiResponse::default());
    }
}
