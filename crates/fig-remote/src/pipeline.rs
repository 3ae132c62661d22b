//! The resilient request pipeline.
//!
//! Strategy: GET first with the encoded source in the URL path; on any
//! failure other than HTTP 400, one POST fallback sequence carrying the
//! raw source as a plain-text body. Each strategy runs its own retry
//! loop — server errors (5xx) and transport failures retry with
//! exponential backoff, other client errors are terminal. The last
//! observed error is surfaced when attempts are exhausted.
//!
//! The pipeline has no side effects beyond the network call; it never
//! touches the cache.

use std::time::Duration;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;

use crate::encoder::{EncodeError, encode};
use crate::transport::{Method, Transport, TransportError, TransportRequest, TransportResponse};

/// The logical unit of work handed to the pipeline. Immutable once
/// constructed.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Base URL of the rendering service.
    pub server: String,
    /// Service-side diagram type name.
    pub endpoint: String,
    /// Output format segment ("svg", "png").
    pub format: String,
    /// Raw diagram source text.
    pub source: String,
    /// Custom headers merged into every request.
    pub headers: Vec<(String, String)>,
    /// Maximum attempts per strategy (minimum 1).
    pub retry_count: u32,
    /// Base backoff delay; the i-th retry (0-indexed) waits `delay * 2^i`.
    pub retry_delay: Duration,
}

/// Displayable image payload, normalized from the response shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Textual body passed through as-is (SVG markup).
    Text(String),
    /// Binary body re-encoded as a base64 data URI tagged with the
    /// response's declared content type.
    DataUri(String),
}

impl Payload {
    /// The displayable content as a string slice.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Text(s) | Self::DataUri(s) => s,
        }
    }

    /// Consume the payload, yielding the displayable content.
    #[must_use]
    pub fn into_content(self) -> String {
        match self {
            Self::Text(s) | Self::DataUri(s) => s,
        }
    }
}

/// Successful render: payload plus the HTTP status that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub payload: Payload,
    pub status: u16,
}

/// Terminal pipeline failure.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Source could not be encoded; no network call was made.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// Network-level failure after retries were exhausted.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The service answered with a non-2xx status.
    #[error("{message}")]
    Http { status: u16, message: String },
}

impl PipelineError {
    /// HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Encode(_) | Self::Transport(_) => None,
        }
    }
}

/// Outcome of a single attempt, driving the retry state machine:
/// `Attempting(n) -> Success | Retry -> delay -> Attempting(n+1) | Fatal`.
enum AttemptOutcome {
    Success(Rendered),
    Retry(PipelineError),
    Fatal(PipelineError),
}

/// Request pipeline over an injected [`Transport`].
pub struct Pipeline {
    transport: Box<dyn Transport>,
}

impl Pipeline {
    /// Create a pipeline over the given transport.
    #[must_use]
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Execute a render request, producing the normalized result.
    ///
    /// # Errors
    ///
    /// Returns the last observed error once the GET strategy (and, when
    /// fallback applies, the POST strategy) has exhausted its attempts.
    pub fn render(&self, request: &RenderRequest) -> Result<Rendered, PipelineError> {
        let token = encode(&request.source)?;
        let server = request.server.trim_end_matches('/');

        let get = TransportRequest {
            method: Method::Get,
            url: format!(
                "{server}/{}/{}/{token}",
                request.endpoint, request.format
            ),
            headers: request_headers(request, Method::Get),
            body: None,
        };

        match self.run_strategy(&get, request) {
            Ok(rendered) => Ok(rendered),
            // A plain 400 means the payload itself is unacceptable to the
            // short form; surfacing it beats masking it with a POST error.
            Err(error) if error.status() == Some(400) => Err(error),
            Err(error) => {
                tracing::debug!("GET strategy failed ({error}), falling back to POST");
                let post = TransportRequest {
                    method: Method::Post,
                    url: format!("{server}/{}/{}", request.endpoint, request.format),
                    headers: request_headers(request, Method::Post),
                    body: Some(request.source.clone().into_bytes()),
                };
                self.run_strategy(&post, request)
            }
        }
    }

    /// Run one strategy's retry loop.
    fn run_strategy(
        &self,
        transport_request: &TransportRequest,
        request: &RenderRequest,
    ) -> Result<Rendered, PipelineError> {
        let attempts = request.retry_count.max(1);
        let mut attempt: u32 = 0;

        loop {
            match self.attempt(transport_request) {
                AttemptOutcome::Success(rendered) => return Ok(rendered),
                AttemptOutcome::Fatal(error) => return Err(error),
                AttemptOutcome::Retry(error) => {
                    attempt += 1;
                    if attempt >= attempts {
                        return Err(error);
                    }
                    // Saturate: huge configured retry counts must not
                    // overflow the doubling factor or the duration
                    let backoff = request
                        .retry_delay
                        .saturating_mul(2u32.saturating_pow(attempt - 1));
                    tracing::debug!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "retryable failure ({error}), backing off"
                    );
                    std::thread::sleep(backoff);
                }
            }
        }
    }

    /// Execute one attempt and classify its outcome.
    fn attempt(&self, transport_request: &TransportRequest) -> AttemptOutcome {
        match self.transport.execute(transport_request) {
            Ok(response) => classify_response(response),
            Err(error) => AttemptOutcome::Retry(error.into()),
        }
    }
}

/// Headers for one strategy: the Accept pair, a plain-text content type
/// for POST bodies, then any custom headers from configuration.
fn request_headers(request: &RenderRequest, method: Method) -> Vec<(String, String)> {
    let mut headers = vec![(
        "Accept".to_owned(),
        "image/svg+xml, image/png".to_owned(),
    )];
    if method == Method::Post {
        headers.push(("Content-Type".to_owned(), "text/plain".to_owned()));
    }
    headers.extend(request.headers.iter().cloned());
    headers
}

/// Classify a response: 2xx normalizes to success, 5xx retries, other
/// statuses are terminal for the strategy.
fn classify_response(response: TransportResponse) -> AttemptOutcome {
    let status = response.status;
    if (200..300).contains(&status) {
        return AttemptOutcome::Success(normalize_success(response));
    }

    let body = String::from_utf8_lossy(&response.body);
    let body = body.trim();
    let message = if body.is_empty() {
        format!("HTTP error {status}")
    } else {
        body.to_owned()
    };
    let error = PipelineError::Http { status, message };

    if status >= 500 {
        AttemptOutcome::Retry(error)
    } else {
        AttemptOutcome::Fatal(error)
    }
}

/// Normalize a 2xx response to a [`Rendered`] payload.
///
/// Textual content types pass through; everything else becomes a base64
/// data URI tagged with the declared content type. A textual declaration
/// with a non-UTF-8 body is treated as binary rather than corrupted.
fn normalize_success(response: TransportResponse) -> Rendered {
    let status = response.status;
    let content_type = response
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_owned());

    if is_textual(&content_type) {
        match String::from_utf8(response.body) {
            Ok(text) => {
                return Rendered {
                    payload: Payload::Text(text),
                    status,
                };
            }
            Err(error) => {
                return Rendered {
                    payload: Payload::DataUri(data_uri(&content_type, &error.into_bytes())),
                    status,
                };
            }
        }
    }

    Rendered {
        payload: Payload::DataUri(data_uri(&content_type, &response.body)),
        status,
    }
}

fn is_textual(content_type: &str) -> bool {
    content_type.starts_with("text/")
        || content_type.contains("svg")
        || content_type.contains("xml")
        || content_type.contains("json")
}

fn data_uri(content_type: &str, body: &[u8]) -> String {
    // Strip parameters like "; charset=binary" from the media type
    let media_type = content_type.split(';').next().unwrap_or(content_type).trim();
    format!("data:{media_type};base64,{}", BASE64_STANDARD.encode(body))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use pretty_assertions::assert_eq;

    use super::*;

    /// Scripted transport: pops one step per call, records every request.
    struct MockTransport {
        steps: Mutex<Vec<Result<TransportResponse, TransportError>>>,
        calls: Mutex<Vec<TransportRequest>>,
    }

    impl MockTransport {
        fn new(steps: Vec<Result<TransportResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<TransportRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Transport for MockTransport {
        fn execute(
            &self,
            request: &TransportRequest,
        ) -> Result<TransportResponse, TransportError> {
            self.calls.lock().unwrap().push(request.clone());
            let mut steps = self.steps.lock().unwrap();
            assert!(!steps.is_empty(), "mock transport called more times than scripted");
            steps.remove(0)
        }
    }

    fn pipeline(mock: &Arc<MockTransport>) -> Pipeline {
        Pipeline::new(Box::new(Arc::clone(mock)))
    }

    fn ok_svg() -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse {
            status: 200,
            content_type: Some("image/svg+xml".to_owned()),
            body: b"<svg>ok</svg>".to_vec(),
        })
    }

    fn status(code: u16, body: &str) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse {
            status: code,
            content_type: Some("text/plain".to_owned()),
            body: body.as_bytes().to_vec(),
        })
    }

    fn network_error() -> Result<TransportResponse, TransportError> {
        Err(TransportError("connection refused".to_owned()))
    }

    fn request() -> RenderRequest {
        RenderRequest {
            server: "https://render.example.com/".to_owned(),
            endpoint: "plantuml".to_owned(),
            format: "svg".to_owned(),
            source: "A->B".to_owned(),
            headers: Vec::new(),
            retry_count: 3,
            retry_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_get_success_text_payload() {
        let mock = MockTransport::new(vec![ok_svg()]);
        let result = pipeline(&mock).render(&request());
        let rendered = result.unwrap();
        assert_eq!(rendered.status, 200);
        assert_eq!(rendered.payload, Payload::Text("<svg>ok</svg>".to_owned()));

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::Get);
        assert!(calls[0].body.is_none());
    }

    #[test]
    fn test_get_url_embeds_encoded_source() {
        let mock = MockTransport::new(vec![ok_svg()]);
        let req = request();
        pipeline(&mock)
            .render(&req)
            .unwrap();

        let token = encode(&req.source).unwrap();
        let url = &mock.calls()[0].url;
        assert_eq!(
            url,
            &format!("https://render.example.com/plantuml/svg/{token}")
        );
        assert!(!url.contains('+'));
    }

    #[test]
    fn test_accept_and_custom_headers_sent() {
        let mock = MockTransport::new(vec![ok_svg()]);
        let mut req = request();
        req.headers
            .push(("X-Auth".to_owned(), "secret".to_owned()));
        pipeline(&mock).render(&req).unwrap();

        let headers = &mock.calls()[0].headers;
        assert!(headers.contains(&(
            "Accept".to_owned(),
            "image/svg+xml, image/png".to_owned()
        )));
        assert!(headers.contains(&("X-Auth".to_owned(), "secret".to_owned())));
    }

    #[test]
    fn test_binary_payload_becomes_data_uri() {
        let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        let mock = MockTransport::new(vec![Ok(TransportResponse {
            status: 200,
            content_type: Some("image/png".to_owned()),
            body: png.clone(),
        })]);
        let rendered = pipeline(&mock)
            .render(&request())
            .unwrap();

        let expected = format!("data:image/png;base64,{}", BASE64_STANDARD.encode(&png));
        assert_eq!(rendered.payload, Payload::DataUri(expected));
    }

    #[test]
    fn test_content_type_parameters_stripped_from_data_uri() {
        let mock = MockTransport::new(vec![Ok(TransportResponse {
            status: 200,
            content_type: Some("image/png; charset=binary".to_owned()),
            body: vec![1, 2, 3],
        })]);
        let rendered = pipeline(&mock)
            .render(&request())
            .unwrap();
        assert!(rendered.payload.content().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_missing_content_type_treated_as_binary() {
        let mock = MockTransport::new(vec![Ok(TransportResponse {
            status: 200,
            content_type: None,
            body: vec![1, 2, 3],
        })]);
        let rendered = pipeline(&mock)
            .render(&request())
            .unwrap();
        assert!(
            rendered
                .payload
                .content()
                .starts_with("data:application/octet-stream;base64,")
        );
    }

    #[test]
    fn test_retry_exhaustion_bounds_each_strategy() {
        // 503 is retryable and fallback-eligible: 3 GET attempts, then
        // 3 POST attempts, then the last error surfaces
        let steps = (0..6).map(|_| status(503, "overloaded")).collect();
        let mock = MockTransport::new(steps);
        let result = pipeline(&mock).render(&request());

        let error = result.unwrap_err();
        assert_eq!(error.status(), Some(503));
        assert_eq!(error.to_string(), "overloaded");

        let calls = mock.calls();
        assert_eq!(calls.len(), 6);
        assert!(calls[..3].iter().all(|c| c.method == Method::Get));
        assert!(calls[3..].iter().all(|c| c.method == Method::Post));
    }

    #[test]
    fn test_transport_failure_falls_back_to_post() {
        let steps = vec![
            network_error(),
            network_error(),
            network_error(),
            ok_svg(),
        ];
        let mock = MockTransport::new(steps);
        let rendered = pipeline(&mock)
            .render(&request())
            .unwrap();
        assert_eq!(rendered.payload.content(), "<svg>ok</svg>");

        let calls = mock.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[3].method, Method::Post);
        // POST carries the raw, uncompressed source
        assert_eq!(calls[3].body.as_deref(), Some(b"A->B".as_slice()));
        assert_eq!(calls[3].url, "https://render.example.com/plantuml/svg");
        assert!(calls[3].headers.contains(&(
            "Content-Type".to_owned(),
            "text/plain".to_owned()
        )));
    }

    #[test]
    fn test_bad_request_does_not_fall_back() {
        let mock = MockTransport::new(vec![status(400, "bad diagram")]);
        let result = pipeline(&mock).render(&request());

        let error = result.unwrap_err();
        assert_eq!(error.status(), Some(400));
        assert_eq!(error.to_string(), "bad diagram");
        assert_eq!(mock.calls().len(), 1);
    }

    #[test]
    fn test_other_client_errors_terminal_but_fall_back() {
        // A 404 is not retried within a strategy, but it is not a 400,
        // so one POST sequence follows
        let mock = MockTransport::new(vec![status(404, "no such type"), ok_svg()]);
        let rendered = pipeline(&mock)
            .render(&request())
            .unwrap();
        assert_eq!(rendered.payload.content(), "<svg>ok</svg>");

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, Method::Get);
        assert_eq!(calls[1].method, Method::Post);
    }

    #[test]
    fn test_empty_error_body_gets_generic_message() {
        let mut req = request();
        req.retry_count = 1;
        let mock = MockTransport::new(vec![status(500, ""), status(500, "")]);
        let error = pipeline(&mock)
            .render(&req)
            .unwrap_err();
        assert_eq!(error.to_string(), "HTTP error 500");
        assert_eq!(error.status(), Some(500));
    }

    #[test]
    fn test_retry_count_zero_clamped_to_one_attempt() {
        let mut req = request();
        req.retry_count = 0;
        let mock = MockTransport::new(vec![status(503, "x"), status(503, "x")]);
        let _ = pipeline(&mock).render(&req);
        // One GET attempt, one POST attempt
        assert_eq!(mock.calls().len(), 2);
    }

    #[test]
    fn test_large_retry_count_does_not_overflow_backoff() {
        // Past 32 retries the doubling factor exceeds u32; the backoff
        // must saturate instead of panicking
        let mut req = request();
        req.retry_count = 40;
        let steps = (0..80).map(|_| status(503, "overloaded")).collect();
        let mock = MockTransport::new(steps);

        let error = pipeline(&mock).render(&req).unwrap_err();
        assert_eq!(error.status(), Some(503));
        assert_eq!(mock.calls().len(), 80);
    }

    #[test]
    fn test_retry_then_success_within_strategy() {
        let mock = MockTransport::new(vec![status(503, "busy"), ok_svg()]);
        let rendered = pipeline(&mock)
            .render(&request())
            .unwrap();
        assert_eq!(rendered.status, 200);

        // Second attempt was still a GET — no fallback happened
        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.method == Method::Get));
    }

    #[test]
    fn test_payload_into_content() {
        assert_eq!(Payload::Text("a".to_owned()).into_content(), "a");
        assert_eq!(Payload::DataUri("d".to_owned()).into_content(), "d");
    }
}
