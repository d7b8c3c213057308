// SPDX-License-Identifier: MIT OR Apache-2.0
//! Unified error taxonomy with stable error codes for VectorBid.
//!
//! Every `VbError` carries an [`ErrorCode`] (a machine-readable, stable
//! string tag), a human-readable message, an optional cause chain, and
//! arbitrary key-value context. Use the builder returned by
//! [`VbError::new`] to construct errors fluently.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family an [`ErrorCode`] belongs to, matching the HTTP-surfacing
/// policy: `BadInput` → 400, `NotFound` → 404, `ExpressionError` → warning
/// on the affected candidate, `Upstream` → transparent LLM fallback,
/// `Timeout` → 504, `Internal` → 500.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed client request body or unknown enum value.
    BadInput,
    /// Requested rule pack or bid package does not exist.
    NotFound,
    /// Rule-pack DSL expression problem; never aborts the request.
    ExpressionError,
    /// LLM call failure; handled by transparent fallback.
    Upstream,
    /// Per-request or per-call deadline exceeded.
    Timeout,
    /// Catch-all for unexpected invariant violations.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BadInput => "bad_input",
            Self::NotFound => "not_found",
            Self::ExpressionError => "expression_error",
            Self::Upstream => "upstream",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

impl ErrorCategory {
    /// HTTP status code this category is surfaced as, where applicable.
    /// `ExpressionError` and `Upstream` are handled internally and never
    /// escape to the client as a bare status; both map to `None` here.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::BadInput => Some(400),
            Self::NotFound => Some(404),
            Self::ExpressionError | Self::Upstream => None,
            Self::Timeout => Some(504),
            Self::Internal => Some(500),
        }
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serializes to a `SCREAMING_SNAKE_CASE` string guaranteed
/// not to change across patch releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- BadInput --
    /// Request body failed to parse or has missing/invalid fields.
    BadInputMalformedBody,
    /// An enum value in the request is not recognized.
    BadInputUnknownEnumValue,

    // -- NotFound --
    /// No rule pack exists for the requested `(airline, month)`.
    RulePackNotFound,
    /// No bid package exists for the requested lookup key.
    PackageNotFound,

    // -- ExpressionError --
    /// Identifier referenced by an expression is not bound in any declared
    /// namespace.
    ExpressionUndefinedIdentifier,
    /// Expression evaluation divided by zero.
    ExpressionDivisionByZero,
    /// Expression evaluation overflowed.
    ExpressionOverflow,
    /// Expression used a function or syntax form outside the grammar.
    ExpressionInvalidGrammar,

    // -- Upstream --
    /// LLM call failed outright (connection, non-2xx, malformed response).
    LlmCallFailed,
    /// LLM call exceeded its own timeout, distinct from the overall request
    /// deadline.
    LlmTimeout,

    // -- Timeout --
    /// Overall per-request deadline was exceeded.
    DeadlineExceeded,

    // -- Internal --
    /// Ingestion failed to parse the uploaded bytes.
    IngestParseFailed,
    /// Export signing or canonicalization failed.
    ExportFailed,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::BadInputMalformedBody | Self::BadInputUnknownEnumValue => {
                ErrorCategory::BadInput
            }

            Self::RulePackNotFound | Self::PackageNotFound => ErrorCategory::NotFound,

            Self::ExpressionUndefinedIdentifier
            | Self::ExpressionDivisionByZero
            | Self::ExpressionOverflow
            | Self::ExpressionInvalidGrammar => ErrorCategory::ExpressionError,

            Self::LlmCallFailed | Self::LlmTimeout => ErrorCategory::Upstream,

            Self::DeadlineExceeded => ErrorCategory::Timeout,

            Self::IngestParseFailed | Self::ExportFailed | Self::Internal => {
                ErrorCategory::Internal
            }
        }
    }

    /// Stable `&'static str` representation of the code (e.g.
    /// `"RULE_PACK_NOT_FOUND"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadInputMalformedBody => "BAD_INPUT_MALFORMED_BODY",
            Self::BadInputUnknownEnumValue => "BAD_INPUT_UNKNOWN_ENUM_VALUE",
            Self::RulePackNotFound => "RULE_PACK_NOT_FOUND",
            Self::PackageNotFound => "PACKAGE_NOT_FOUND",
            Self::ExpressionUndefinedIdentifier => "EXPRESSION_UNDEFINED_IDENTIFIER",
            Self::ExpressionDivisionByZero => "EXPRESSION_DIVISION_BY_ZERO",
            Self::ExpressionOverflow => "EXPRESSION_OVERFLOW",
            Self::ExpressionInvalidGrammar => "EXPRESSION_INVALID_GRAMMAR",
            Self::LlmCallFailed => "LLM_CALL_FAILED",
            Self::LlmTimeout => "LLM_TIMEOUT",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::IngestParseFailed => "INGEST_PARSE_FAILED",
            Self::ExportFailed => "EXPORT_FAILED",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// VbError
// ---------------------------------------------------------------------------

/// Unified VectorBid error.
///
/// Carries a stable [`ErrorCode`], a human-readable message, an optional
/// source error for cause-chaining, and arbitrary structured context.
///
/// # Builder usage
///
/// ```
/// use vb_error::{VbError, ErrorCode};
///
/// let err = VbError::new(ErrorCode::LlmTimeout, "primary model timed out")
///     .with_context("model", "primary")
///     .with_context("timeout_ms", 8_000);
/// ```
pub struct VbError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description. Never contains PII; see
    /// `vb_core::redact` for the redaction layer logging runs through.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics.
    pub context: BTreeMap<String, serde_json::Value>,
}

impl VbError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if
    /// serialization fails, the entry is silently skipped.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.code.category()`.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

impl fmt::Debug for VbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("VbError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for VbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if !self.context.is_empty() {
            // Deterministic output thanks to BTreeMap.
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for VbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// ---------------------------------------------------------------------------
// Serialization support
// ---------------------------------------------------------------------------

/// Serializable snapshot of a [`VbError`] (without the opaque source),
/// matching the `{error: {code, message, details?}, request_id}` response
/// envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct VbErrorDto {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Structured context, surfaced as `details` in the HTTP envelope.
    pub context: BTreeMap<String, serde_json::Value>,
    /// String representation of the source error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_message: Option<String>,
}

impl From<&VbError> for VbErrorDto {
    fn from(err: &VbError) -> Self {
        Self {
            code: err.code,
            message: err.message.clone(),
            context: err.context.clone(),
            source_message: err.source.as_ref().map(|s| s.to_string()),
        }
    }
}

impl From<VbErrorDto> for VbError {
    fn from(dto: VbErrorDto) -> Self {
        Self {
            code: dto.code,
            message: dto.message,
            source: None,
            context: dto.context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io;

    const ALL_CODES: &[ErrorCode] = &[
        ErrorCode::BadInputMalformedBody,
        ErrorCode::BadInputUnknownEnumValue,
        ErrorCode::RulePackNotFound,
        ErrorCode::PackageNotFound,
        ErrorCode::ExpressionUndefinedIdentifier,
        ErrorCode::ExpressionDivisionByZero,
        ErrorCode::ExpressionOverflow,
        ErrorCode::ExpressionInvalidGrammar,
        ErrorCode::LlmCallFailed,
        ErrorCode::LlmTimeout,
        ErrorCode::DeadlineExceeded,
        ErrorCode::IngestParseFailed,
        ErrorCode::ExportFailed,
        ErrorCode::Internal,
    ];

    #[test]
    fn basic_construction() {
        let err = VbError::new(ErrorCode::Internal, "boom");
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "boom");
        assert!(err.source.is_none());
        assert!(err.context.is_empty());
    }

    #[test]
    fn display_without_context() {
        let err = VbError::new(ErrorCode::RulePackNotFound, "no such rule pack");
        assert_eq!(err.to_string(), "[RULE_PACK_NOT_FOUND] no such rule pack");
    }

    #[test]
    fn display_with_context() {
        let err = VbError::new(ErrorCode::LlmTimeout, "timed out")
            .with_context("timeout_ms", 8_000);
        let s = err.to_string();
        assert!(s.starts_with("[LLM_TIMEOUT] timed out"));
        assert!(s.contains("timeout_ms"));
        assert!(s.contains("8000"));
    }

    #[test]
    fn debug_with_source() {
        let src = io::Error::new(io::ErrorKind::NotFound, "file missing");
        let err = VbError::new(ErrorCode::IngestParseFailed, "parse failed").with_source(src);
        let dbg = format!("{err:?}");
        assert!(dbg.contains("source"));
        assert!(dbg.contains("file missing"));
    }

    #[test]
    fn expression_codes_categorised_as_expression_error() {
        for code in [
            ErrorCode::ExpressionUndefinedIdentifier,
            ErrorCode::ExpressionDivisionByZero,
            ErrorCode::ExpressionOverflow,
            ErrorCode::ExpressionInvalidGrammar,
        ] {
            assert_eq!(code.category(), ErrorCategory::ExpressionError);
        }
    }

    #[test]
    fn llm_codes_categorised_as_upstream() {
        assert_eq!(ErrorCode::LlmCallFailed.category(), ErrorCategory::Upstream);
        assert_eq!(ErrorCode::LlmTimeout.category(), ErrorCategory::Upstream);
    }

    #[test]
    fn http_status_matches_taxonomy() {
        assert_eq!(ErrorCategory::BadInput.http_status(), Some(400));
        assert_eq!(ErrorCategory::NotFound.http_status(), Some(404));
        assert_eq!(ErrorCategory::Timeout.http_status(), Some(504));
        assert_eq!(ErrorCategory::Internal.http_status(), Some(500));
        assert_eq!(ErrorCategory::ExpressionError.http_status(), None);
        assert_eq!(ErrorCategory::Upstream.http_status(), None);
    }

    #[test]
    fn builder_with_context_multiple_keys() {
        let err = VbError::new(ErrorCode::LlmTimeout, "timeout")
            .with_context("model", "primary")
            .with_context("timeout_ms", 8_000)
            .with_context("retries", 1);
        assert_eq!(err.context.len(), 3);
        assert_eq!(err.context["model"], serde_json::json!("primary"));
    }

    #[test]
    fn dto_roundtrip_without_source() {
        let err = VbError::new(ErrorCode::ExpressionOverflow, "overflow")
            .with_context("rule_id", "far117_min_rest");
        let dto: VbErrorDto = (&err).into();
        let json = serde_json::to_string(&dto).unwrap();
        let back: VbErrorDto = serde_json::from_str(&json).unwrap();
        assert_eq!(dto, back);
        assert!(back.source_message.is_none());
    }

    #[test]
    fn std_error_source_chain() {
        let inner = io::Error::new(io::ErrorKind::NotFound, "not found");
        let err = VbError::new(ErrorCode::PackageNotFound, "missing").with_source(inner);
        let src = std::error::Error::source(&err).unwrap();
        assert_eq!(src.to_string(), "not found");
    }

    #[test]
    fn all_codes_have_unique_as_str() {
        let mut seen = HashSet::new();
        for code in ALL_CODES {
            assert!(seen.insert(code.as_str()));
        }
        assert_eq!(seen.len(), ALL_CODES.len());
    }

    #[test]
    fn all_codes_serialize_to_as_str() {
        for code in ALL_CODES {
            let json = serde_json::to_string(code).unwrap();
            let expected = format!(r#""{}""#, code.as_str());
            assert_eq!(json, expected, "mismatch for {code:?}");
        }
    }
}
