//! Helpers for cleaning text that crosses the extension and model boundaries.
//!
//! Model replies often arrive wrapped in Markdown code fences, and the
//! extension prepends a `URL: ...` marker line to the captured page text.

use sha2::{Digest, Sha256};

const FENCE: &str = "```";
const URL_MARKER: &str = "URL:";

/// Strips surrounding whitespace and an enclosing fenced-code block.
///
/// - "```json\n{...}\n```" → "{...}"
/// - "```\n{...}\n```" → "{...}"
/// - "{...}" → "{...}" (no change)
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix(FENCE) {
        // Drop an info string such as `json` or `JSON` right after the fence.
        let tag_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        body = &rest[tag_len..];
    }
    if let Some(rest) = body.strip_suffix(FENCE) {
        body = rest;
    }

    body.trim()
}

/// Returns the value of the first `URL:` marker line, if any.
///
/// The extension writes the page address as `URL: https://...` ahead of the
/// captured text; everything up to the end of that line is the URL.
pub fn extract_source_url(text: &str) -> Option<&str> {
    let start = text.find(URL_MARKER)? + URL_MARKER.len();
    let line = &text[start..];
    let line = match line.find('\n') {
        Some(end) => &line[..end],
        None => line,
    };
    let url = line.trim();
    (!url.is_empty()).then_some(url)
}

/// Returns a short deterministic key for a piece of text.
///
/// Used as the natural key for postings captured without any URL so that
/// re-extracting the same text still upserts a single row. The key is
/// stored, so it must stay identical across builds: first 16 hex digits of
/// the SHA-256 of the trimmed text.
pub fn content_key(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.trim().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("text:{}", &digest[..16])
}

/// Masks a secret for log output, keeping only the last four characters.
///
/// - "pplx-abcdef123456" → "****3456"
/// - "abc" → "****"
pub fn redact_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
