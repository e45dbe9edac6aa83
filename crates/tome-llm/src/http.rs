//! Shared HTTP plumbing for the providers.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use tome_core::error::{ErrorCode, TomeError, TomeResult};

/// Join an API path onto a configured base URL, rejecting malformed bases.
pub(crate) fn endpoint(base_url: &str, path: &str) -> TomeResult<String> {
    url::Url::parse(base_url)
        .map_err(|e| TomeError::Configuration(format!("Invalid base URL '{}': {}", base_url, e)))?;
    Ok(format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    ))
}

/// Map a failure to reach the provider onto a retryable error.
pub(crate) fn request_error(provider: &str, e: reqwest::Error) -> TomeError {
    let message = format!("{} request failed: {}", provider, e);
    if e.is_timeout() {
        TomeError::Network {
            message,
            code: ErrorCode::NetTimeout,
            source: Some(Box::new(e)),
        }
    } else if e.is_connect() {
        TomeError::Llm {
            message,
            code: ErrorCode::LlmConnectionFailed,
            source: Some(Box::new(e)),
        }
    } else {
        TomeError::Network {
            message,
            code: ErrorCode::NetConnectionFailed,
            source: Some(Box::new(e)),
        }
    }
}

/// Pull the human-readable message out of a provider error body.
///
/// Handles `{"error": {"message": ..}}` and `{"error": ".."}`, falling back
/// to the raw body.
pub(crate) fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        let error = v.get("error")?;
        error
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| error.as_str())
            .map(str::to_string)
    });
    message.unwrap_or_else(|| body.trim().to_string())
}

pub(crate) fn status_error(provider: &str, status: StatusCode, body: &str) -> TomeError {
    TomeError::from_http_status(
        status.as_u16(),
        &format!("{} API error: {}", provider, error_message(body)),
    )
}

/// POST `body` as JSON and decode a JSON reply.
pub(crate) async fn post_json<B, R>(
    client: &Client,
    url: &str,
    body: &B,
    provider: &str,
) -> TomeResult<R>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| request_error(provider, e))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| request_error(provider, e))?;

    if !status.is_success() {
        tracing::warn!(provider, status = status.as_u16(), "Provider returned an error");
        return Err(status_error(provider, status, &text));
    }

    serde_json::from_str(&text).map_err(|e| TomeError::Llm {
        message: format!("Failed to parse {} response: {}", provider, e),
        code: ErrorCode::LlmInvalidResponse,
        source: Some(Box::new(e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        assert_eq!(
            endpoint("https://api.openai.com/v1/", "/chat/completions").unwrap(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert!(endpoint("not a url", "chat").is_err());
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(r#"{"error": {"message": "Incorrect API key", "type": "invalid_request_error"}}"#),
            "Incorrect API key"
        );
        assert_eq!(error_message(r#"{"error": "model 'x' not found"}"#), "model 'x' not found");
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn test_status_error_classification() {
        let err = status_error("OpenAI", StatusCode::UNAUTHORIZED, r#"{"error": {"message": "bad key"}}"#);
        assert!(matches!(err, TomeError::Authentication { .. }));
        assert!(err.to_string().contains("bad key"));

        assert!(status_error("OpenAI", StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(status_error("OpenAI", StatusCode::BAD_GATEWAY, "").is_transient());
        assert!(!status_error("OpenAI", StatusCode::BAD_REQUEST, "").is_transient());
    }
}
