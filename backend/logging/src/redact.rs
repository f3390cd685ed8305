//! Log Redaction
//!
//! Scrubs API keys and bearer tokens from action payloads prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static API_KEY_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(sk-[a-zA-Z0-9]{32,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)").ok()
});
static SECRET_FIELD_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"("(?i:password|token|secret|api_?key)"\s*:\s*)"[^"]*""#).ok()
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let mut redacted = input.to_string();

    if let Some(re) = API_KEY_RE.as_ref() {
        redacted = re.replace_all(&redacted, "[REDACTED_TOKEN]").to_string();
    }

    // JSON fields whose names mark them as secrets
    if let Some(re) = SECRET_FIELD_RE.as_ref() {
        redacted = re.replace_all(&redacted, r#"$1"[REDACTED]""#).to_string();
    }

    redacted
}
