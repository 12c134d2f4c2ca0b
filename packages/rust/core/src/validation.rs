//! Cheap checks on an incoming payload, run before anything remote.

use std::fmt;

use onboarding_shared::{ErrorDetail, ValidationLimits};

/// Media types the transformation service can ingest.
pub const SUPPORTED_CONTENT_TYPES: [&str; 2] = ["text/csv", "application/json"];

/// One reason a payload was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Declared content type (as sent, parameters included) is not supported.
    UnsupportedContentType { content_type: String },
    /// Body is larger than the configured limit.
    BodyTooLarge { length: u64, max: u64 },
}

impl Violation {
    /// HTTP status for this violation.
    pub fn status(&self) -> u16 {
        match self {
            Self::UnsupportedContentType { .. } => 415,
            Self::BodyTooLarge { .. } => 400,
        }
    }

    pub fn to_detail(&self) -> ErrorDetail {
        ErrorDetail::new(self.to_string())
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedContentType { content_type } => write!(
                f,
                "Unsupported content type \"{content_type}\". Content-Type header must be one of [{}]",
                SUPPORTED_CONTENT_TYPES.join(", ")
            ),
            Self::BodyTooLarge { length, max } => {
                write!(f, "Content length:{length} is too large. Max allowed is:{max}")
            }
        }
    }
}

/// Strip parameters (`; charset=...`) from a content type.
pub fn media_type(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or_default().trim()
}

/// Check a payload's declared type and size. Content type is checked first.
pub fn validate(
    content_type: Option<&str>,
    body_length: u64,
    limits: &ValidationLimits,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    let content_type = content_type.unwrap_or_default();
    if !SUPPORTED_CONTENT_TYPES.contains(&media_type(content_type)) {
        violations.push(Violation::UnsupportedContentType {
            content_type: content_type.to_string(),
        });
    }

    if body_length > limits.max_post_body_size {
        violations.push(Violation::BodyTooLarge {
            length: body_length,
            max: limits.max_post_body_size,
        });
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: ValidationLimits = ValidationLimits {
        max_post_body_size: 100,
    };

    #[test]
    fn accepts_csv_with_charset() {
        assert!(validate(Some("text/csv; charset=utf-8"), 10, &LIMITS).is_empty());
    }

    #[test]
    fn accepts_json() {
        assert!(validate(Some("application/json"), 100, &LIMITS).is_empty());
    }

    #[test]
    fn rejects_text_plain() {
        let violations = validate(Some("text/plain"), 10, &LIMITS);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].status(), 415);
        assert_eq!(
            violations[0].to_string(),
            "Unsupported content type \"text/plain\". Content-Type header must be one of [text/csv, application/json]"
        );
    }

    #[test]
    fn missing_content_type_is_unsupported() {
        let violations = validate(None, 10, &LIMITS);
        assert_eq!(violations[0].status(), 415);
    }

    #[test]
    fn oversized_body_reports_actual_and_limit() {
        let violations = validate(Some("text/csv"), 101, &LIMITS);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].status(), 400);
        assert_eq!(
            violations[0].to_string(),
            "Content length:101 is too large. Max allowed is:100"
        );
    }

    #[test]
    fn both_violations_reported_type_first() {
        let violations = validate(Some("image/png"), 1_000, &LIMITS);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].status(), 415);
        assert_eq!(violations[1].status(), 400);
    }

    #[test]
    fn media_type_strips_parameters() {
        assert_eq!(media_type("text/csv ; charset=utf-8"), "text/csv");
        assert_eq!(media_type(""), "");
    }
}
