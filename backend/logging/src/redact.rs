//! Log Redaction
//!
//! Capability seed paths and passwords grant access to an agent's session at a
//! region; they must never reach a log line intact.

use regex::Regex;
use std::sync::LazyLock;

static CAPS_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/CAPS/[0-9A-Za-z-]{8,}").expect("static regex"));
static CAPS_PASSWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)("?caps_?password"?\s*[:=]\s*"?)[^",\s}]+"#).expect("static regex")
});

/// Redacts capability secrets in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = CAPS_PATH_RE.replace_all(input, "/CAPS/[REDACTED]");
    CAPS_PASSWORD_RE
        .replace_all(&redacted, "${1}[REDACTED]")
        .into_owned()
}
