//! Credential redaction for text that reaches the logs.
//!
//! Classifier transport errors and raw response bodies can echo the request's
//! `Authorization` header or key material back; both pass through
//! [`scrub_secrets`] before they are logged or stored in an error.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static API_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sk-(?:ant-|proj-)?[a-zA-Z0-9\-_]{20,}").expect("static regex"));
static BEARER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[a-zA-Z0-9\-_\.]+").expect("static regex"));
// Captures the key and separator so only the value is replaced.
static KEYED_SECRET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(["']?(?:api_key|apikey|token|secret|password)["']?\s*[:=]\s*)["']?[^"'\s,}]+["']?"#)
        .expect("static regex")
});

/// Redact API keys, bearer tokens and keyed secrets in `message`.
pub fn scrub_secrets(message: &str) -> String {
    let scrubbed = API_KEY_PATTERN.replace_all(message, "[API_KEY_REDACTED]");
    let scrubbed = BEARER_PATTERN.replace_all(&scrubbed, "Bearer [TOKEN_REDACTED]");
    KEYED_SECRET_PATTERN
        .replace_all(&scrubbed, |caps: &Captures| format!("{}[REDACTED]", &caps[1]))
        .into_owned()
}
