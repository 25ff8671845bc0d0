//! Error categorization.
//!
//! Maps transport errors and HTTP statuses onto `ErrorType` counters.

use super::types::ErrorType;

/// Categorizes a `reqwest::Error` into an `ErrorType`.
///
/// Status codes are checked first; transport failures fall through to the
/// reqwest error kind.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> ErrorType {
    if let Some(status) = error.status() {
        return categorize_status(status.as_u16());
    }

    if error.is_builder() {
        ErrorType::HttpRequestBuilderError
    } else if error.is_redirect() {
        ErrorType::HttpRequestRedirectError
    } else if error.is_timeout() {
        ErrorType::HttpRequestTimeoutError
    } else if error.is_connect() {
        ErrorType::HttpRequestConnectError
    } else if error.is_body() {
        ErrorType::HttpRequestBodyError
    } else if error.is_decode() {
        ErrorType::HttpRequestDecodeError
    } else {
        ErrorType::HttpRequestOtherError
    }
}

/// Categorizes a bare HTTP status code.
pub fn categorize_status(status: u16) -> ErrorType {
    match status {
        403 => ErrorType::HttpRequestBotDetectionError,
        404 => ErrorType::HttpRequestNotFound,
        crate::config::HTTP_STATUS_TOO_MANY_REQUESTS => ErrorType::HttpRequestTooManyRequests,
        500..=599 => ErrorType::HttpRequestServerError,
        _ => ErrorType::HttpRequestOtherError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_status_codes() {
        assert_eq!(categorize_status(403), ErrorType::HttpRequestBotDetectionError);
        assert_eq!(categorize_status(404), ErrorType::HttpRequestNotFound);
        assert_eq!(categorize_status(429), ErrorType::HttpRequestTooManyRequests);
        assert_eq!(categorize_status(502), ErrorType::HttpRequestServerError);
        assert_eq!(categorize_status(418), ErrorType::HttpRequestOtherError);
    }

    #[tokio::test]
    async fn test_categorize_connect_error() {
        // Nothing listens on port 1 of the loopback interface.
        let client = reqwest::Client::new();
        let err = client
            .get("http://127.0.0.1:1/")
            .send()
            .await
            .expect_err("connection should be refused");
        assert_eq!(
            categorize_reqwest_error(&err),
            ErrorType::HttpRequestConnectError
        );
    }
}
