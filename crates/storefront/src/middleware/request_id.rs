//! Request ID middleware.
//!
//! Every request gets an id, either forwarded by an upstream proxy in
//! `x-request-id` or freshly generated. It is recorded on the tracing span,
//! tagged on the Sentry scope and echoed back in the response.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream id that is accepted as-is.
const MAX_REQUEST_ID_LENGTH: usize = 128;

/// The forwarded request id, if it is short printable ASCII.
fn forwarded_request_id(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    let acceptable = !value.is_empty()
        && value.len() <= MAX_REQUEST_ID_LENGTH
        && value.bytes().all(|b| b.is_ascii_graphic());
    acceptable.then(|| value.to_owned())
}

/// Middleware that ensures every request has a request ID.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = forwarded_request_id(request.headers())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(REQUEST_ID_HEADER, value);
        }
        headers
    }

    #[test]
    fn test_forwarded_id_is_used() {
        assert_eq!(
            forwarded_request_id(&headers("abc-123")).as_deref(),
            Some("abc-123")
        );
    }

    #[test]
    fn test_unusable_ids_are_replaced() {
        assert!(forwarded_request_id(&HeaderMap::new()).is_none());
        assert!(forwarded_request_id(&headers("   ")).is_none());
        assert!(forwarded_request_id(&headers("has space")).is_none());
        assert!(forwarded_request_id(&headers(&"x".repeat(200))).is_none());
    }
}
