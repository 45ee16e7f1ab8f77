//! Outcome classification.
//!
//! Turns the raw result of one exchange call into an [`Outcome`]. Matching is
//! driven by explicit `(pattern, kind)` tables so new exchange wording can be
//! added without touching the decision logic.
//!
//! Precedence, highest first:
//!
//! 1. Anti-bot challenge page: always fatal (`AccessBlocked`)
//! 2. Operation-specific overrides (`Unfilled` / `AlreadyFilled` markers)
//! 3. In-flight faults on placement: ambiguous
//! 4. Recoverable status code or message: retryable
//! 5. Anything else: fatal (`Rejected`)

use std::fmt;

use super::outcome::{FatalReason, OperationKind, Outcome, Payload};

// ============================================================================
// Raw errors
// ============================================================================

/// Raw failure of one exchange call, before classification.
///
/// Exchange clients produce these from transport errors, non-2xx responses
/// and error bodies. `message` carries the error text, `body` the raw
/// response body when there was one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawError {
    /// HTTP status, if a response was received.
    pub status: Option<u16>,
    /// Error text (transport error code or exchange message).
    pub message: String,
    /// Raw response body.
    pub body: Option<String>,
}

impl RawError {
    /// Error with a message only (transport failures, exchange error fields).
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            body: None,
        }
    }

    /// Error from an HTTP response.
    #[must_use]
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            status: Some(status),
            message: summarize_body(&body),
            body: Some(body),
        }
    }

    /// Attach the raw body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    fn haystack(&self) -> String {
        let mut text = self.message.to_lowercase();
        if let Some(body) = &self.body {
            text.push('\n');
            text.push_str(&body.to_lowercase());
        }
        text
    }
}

impl fmt::Display for RawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {status}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for RawError {}

// ============================================================================
// Signature tables
// ============================================================================

/// What a matched signature means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    /// Anti-bot challenge page.
    Challenge,
    /// Transient fault; the request did not take effect.
    Transient,
    /// Transient fault after which the request may still have been accepted.
    InFlight,
}

/// Marker substituted by an operation-specific override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideMarker {
    /// The order is unknown to the exchange.
    Unfilled,
    /// The order can no longer be cancelled.
    AlreadyFilled,
}

/// Transport message for an empty 2xx body.
pub const EMPTY_RESPONSE: &str = "Empty response";
/// Transport message for a response timeout.
pub const SOCKET_TIMEOUT: &str = "ESOCKETTIMEDOUT";
/// Transport message for a connect timeout.
pub const CONNECT_TIMEOUT: &str = "ETIMEDOUT";
/// Transport message for a connection dropped after the request was sent.
pub const SOCKET_HANG_UP: &str = "socket hang up";
/// Transport message for a refused connection.
pub const CONNECTION_REFUSED: &str = "ECONNREFUSED";
/// Transport message for a dropped connection.
pub const CONNECTION_RESET: &str = "ECONNRESET";
/// Transport message for a failed DNS look-up.
pub const HOST_NOT_FOUND: &str = "ENOTFOUND";

/// Case-insensitive message signatures.
pub const MESSAGE_SIGNATURES: &[(&str, SignatureKind)] = &[
    ("Please complete the security check to proceed", SignatureKind::Challenge),
    ("Attention Required! | Cloudflare", SignatureKind::Challenge),
    ("cf-browser-verification", SignatureKind::Challenge),
    ("cf-challenge", SignatureKind::Challenge),
    (SOCKET_TIMEOUT, SignatureKind::InFlight),
    (SOCKET_HANG_UP, SignatureKind::InFlight),
    ("Connection timed out. Please try again.", SignatureKind::InFlight),
    (CONNECT_TIMEOUT, SignatureKind::Transient),
    (CONNECTION_RESET, SignatureKind::Transient),
    (CONNECTION_REFUSED, SignatureKind::Transient),
    (HOST_NOT_FOUND, SignatureKind::Transient),
    ("EAI_AGAIN", SignatureKind::Transient),
    (EMPTY_RESPONSE, SignatureKind::Transient),
    ("Please try again in a few minutes", SignatureKind::Transient),
    ("Nonce must be greater than", SignatureKind::Transient),
    ("nonce too low", SignatureKind::Transient),
    ("Internal error. Please try again.", SignatureKind::Transient),
    ("Service Unavailable", SignatureKind::Transient),
    ("Bad Gateway", SignatureKind::Transient),
    ("Gateway Time-out", SignatureKind::Transient),
    ("Too Many Requests", SignatureKind::Transient),
];

/// HTTP status signatures.
pub const STATUS_SIGNATURES: &[(u16, SignatureKind)] = &[
    (408, SignatureKind::Transient),
    (429, SignatureKind::Transient),
    (500, SignatureKind::Transient),
    (502, SignatureKind::Transient),
    (503, SignatureKind::Transient),
    (504, SignatureKind::InFlight),
    (520, SignatureKind::Transient),
    (522, SignatureKind::Transient),
    (524, SignatureKind::InFlight),
];

/// Operation-specific overrides, checked before the generic tables.
pub const OVERRIDE_SIGNATURES: &[(OperationKind, &str, OverrideMarker)] = &[
    (
        OperationKind::CheckOrder,
        "Order not found, or you are not the person who placed it",
        OverrideMarker::Unfilled,
    ),
    (
        OperationKind::GetOrder,
        "Order not found, or you are not the person who placed it",
        OverrideMarker::Unfilled,
    ),
    (
        OperationKind::CancelOrder,
        "Invalid order number, or you are not the person who placed the order",
        OverrideMarker::AlreadyFilled,
    ),
];

// ============================================================================
// Classifier
// ============================================================================

/// Table-driven outcome classifier.
///
/// Pure: the same input always yields the same outcome.
#[derive(Debug, Clone)]
pub struct OutcomeClassifier {
    messages: Vec<(String, SignatureKind)>,
    statuses: Vec<(u16, SignatureKind)>,
    overrides: Vec<(OperationKind, String, OverrideMarker)>,
}

impl Default for OutcomeClassifier {
    fn default() -> Self {
        Self {
            messages: MESSAGE_SIGNATURES
                .iter()
                .map(|(pattern, kind)| (pattern.to_lowercase(), *kind))
                .collect(),
            statuses: STATUS_SIGNATURES.to_vec(),
            overrides: OVERRIDE_SIGNATURES
                .iter()
                .map(|(op, pattern, marker)| (*op, pattern.to_lowercase(), *marker))
                .collect(),
        }
    }
}

impl OutcomeClassifier {
    /// Classifier with the built-in tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message signature.
    #[must_use]
    pub fn with_message_signature(mut self, pattern: &str, kind: SignatureKind) -> Self {
        self.messages.push((pattern.to_lowercase(), kind));
        self
    }

    /// Add an operation-specific override.
    #[must_use]
    pub fn with_override(
        mut self,
        operation: OperationKind,
        pattern: &str,
        marker: OverrideMarker,
    ) -> Self {
        self.overrides.push((operation, pattern.to_lowercase(), marker));
        self
    }

    /// Classify the result of one call.
    pub fn classify<T>(&self, operation: OperationKind, result: Result<T, RawError>) -> Outcome<T> {
        match result {
            Ok(data) => Outcome::Success(Payload::Data(data)),
            Err(raw) => self.classify_error(operation, &raw),
        }
    }

    /// Classify a raw failure.
    pub fn classify_error<T>(&self, operation: OperationKind, raw: &RawError) -> Outcome<T> {
        let haystack = raw.haystack();
        let reason = raw.to_string();

        let message_kinds = self
            .messages
            .iter()
            .filter(|(pattern, _)| haystack.contains(pattern.as_str()))
            .map(|(_, kind)| *kind);
        let status_kinds = self
            .statuses
            .iter()
            .filter(|(status, _)| raw.status == Some(*status))
            .map(|(_, kind)| *kind);
        let kinds: Vec<SignatureKind> = message_kinds.chain(status_kinds).collect();

        if kinds.contains(&SignatureKind::Challenge) {
            return Outcome::FatalError(FatalReason::AccessBlocked(reason));
        }

        let marker = self
            .overrides
            .iter()
            .find(|(op, pattern, _)| *op == operation && haystack.contains(pattern.as_str()))
            .map(|(_, _, marker)| *marker);
        match marker {
            Some(OverrideMarker::Unfilled) => return Outcome::Success(Payload::Unfilled),
            Some(OverrideMarker::AlreadyFilled) => return Outcome::Success(Payload::AlreadyFilled),
            None => {}
        }

        if operation == OperationKind::PlaceOrder && kinds.contains(&SignatureKind::InFlight) {
            return Outcome::AmbiguousResult(reason);
        }

        if kinds.is_empty() {
            Outcome::FatalError(FatalReason::Rejected(reason))
        } else {
            Outcome::RetryableError(reason)
        }
    }
}

/// Classify with the built-in tables.
pub fn classify<T>(operation: OperationKind, result: Result<T, RawError>) -> Outcome<T> {
    OutcomeClassifier::default().classify(operation, result)
}

// ============================================================================
// Body inspection
// ============================================================================

/// Check a 2xx body for errors hidden in an otherwise successful response.
///
/// Detects an empty body, an HTML page (error or challenge page) where
/// structured data was expected, and a JSON object carrying a non-empty
/// `error` field.
///
/// # Errors
///
/// Returns a [`RawError`] carrying the detected error text and the body.
pub fn inspect_body(body: &str) -> Result<(), RawError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(RawError::message(EMPTY_RESPONSE));
    }

    if looks_like_html(trimmed) {
        return Err(RawError::message(summarize_body(trimmed)).with_body(body));
    }

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(trimmed)
        && let Some(error) = map.get("error")
    {
        let text = match error {
            serde_json::Value::Null | serde_json::Value::Bool(false) => None,
            serde_json::Value::String(s) if s.is_empty() => None,
            serde_json::Value::Array(items) if items.is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(items) => Some(
                items
                    .iter()
                    .map(|item| item.as_str().map_or_else(|| item.to_string(), str::to_string))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            other => Some(other.to_string()),
        };
        if let Some(text) = text {
            return Err(RawError::message(text).with_body(body));
        }
    }

    Ok(())
}

fn looks_like_html(body: &str) -> bool {
    let head: String = body.chars().take(256).collect::<String>().to_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html") || head.contains("<html")
}

/// Short description of a body: the HTML title when present, else the body.
fn summarize_body(body: &str) -> String {
    let lower = body.to_ascii_lowercase();
    if let (Some(start), Some(end)) = (lower.find("<title>"), lower.find("</title>")) {
        let start = start + "<title>".len();
        if start <= end {
            let title = body[start..end].trim();
            if !title.is_empty() {
                return title.to_string();
            }
        }
    }
    if looks_like_html(body.trim()) {
        return "HTML response".to_string();
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return EMPTY_RESPONSE.to_string();
    }
    trimmed.chars().take(200).collect()
}
