//! Filename component sanitizer for rendered documents.

const FALLBACK: &str = "unknown";

/// Reduce `raw` to `[A-Za-z0-9_-]`. Every other character becomes `_`,
/// runs of `_` collapse to one and leading/trailing `_` are trimmed.
/// Never returns an empty string.
pub fn sanitize_filename_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let mapped = if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' };
        if mapped == '_' && out.ends_with('_') {
            continue;
        }
        out.push(mapped);
    }

    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        FALLBACK.to_string()
    } else {
        trimmed.to_string()
    }
}
