//! Request sanitization and PII masking
//!
//! Sanitization runs before caching and provider dispatch so that neither
//! cache keys nor outbound traffic carry raw PII or literal injection
//! phrases.

use crate::core::models::LlmRequest;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Redaction marker substituted for injection phrases
pub const REDACTION_MARKER: &str = "[REDACTED]";

// Pre-compiled patterns for prompt-injection phrases. Chat-template control
// tokens are included alongside the natural-language phrases.
static INJECTION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(system:|ignore previous|reset context|forget all|you are now|new role:|override|bypass|<\|im_start\|>|<\|im_end\|>|</s>|<s>)",
    )
    .expect("Invalid injection regex")
});

// Pre-compiled regex patterns for PII detection
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[\w.+-]+@[\w.-]+\.\w+\b").expect("Invalid email regex"));
static SSN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("Invalid SSN regex"));
static CREDIT_CARD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d[ -]*?){13,16}\b").expect("Invalid credit card regex"));
static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b").expect("Invalid phone regex"));

/// A PII pattern and its typed redaction label
struct PiiPattern {
    label: &'static str,
    pattern: &'static Regex,
}

/// Outbound sanitizer: injection-phrase neutralization followed by PII masking
pub struct SecurityFilter {
    pii_patterns: Vec<PiiPattern>,
}

impl SecurityFilter {
    /// Create a filter with the stock pattern set
    pub fn new() -> Self {
        Self {
            // Masking order matters: SSN before phone so that the
            // three-two-four shape is labeled as an SSN, not a phone number.
            pii_patterns: vec![
                PiiPattern {
                    label: "email",
                    pattern: &EMAIL_PATTERN,
                },
                PiiPattern {
                    label: "ssn",
                    pattern: &SSN_PATTERN,
                },
                PiiPattern {
                    label: "credit_card",
                    pattern: &CREDIT_CARD_PATTERN,
                },
                PiiPattern {
                    label: "phone",
                    pattern: &PHONE_PATTERN,
                },
            ],
        }
    }

    /// Neutralize injection phrases in a single text
    pub fn sanitize_text(&self, text: &str) -> String {
        INJECTION_PATTERN
            .replace_all(text, REDACTION_MARKER)
            .to_string()
    }

    /// Mask PII in a single text with typed redaction markers
    pub fn mask_pii(&self, text: &str) -> String {
        let mut masked = text.to_string();
        for pii in &self.pii_patterns {
            masked = pii
                .pattern
                .replace_all(&masked, format!("[REDACTED-{}]", pii.label))
                .to_string();
        }
        masked
    }

    /// Apply full sanitization to a request
    ///
    /// Total and idempotent: applying it twice yields the same request.
    pub fn sanitize(&self, mut request: LlmRequest) -> LlmRequest {
        let sanitized = self.mask_pii(&self.sanitize_text(&request.prompt));
        if sanitized != request.prompt {
            debug!(trace_id = %request.trace_id, "Sanitizer rewrote prompt content");
        }
        request.prompt = sanitized;

        if let Some(system) = request.system_prompt.take() {
            request.system_prompt = Some(self.mask_pii(&self.sanitize_text(&system)));
        }
        request
    }
}

impl Default for SecurityFilter {
    fn default() -> Self {
        Self::new()
    }
}
