//! MQTT topic construction from CoAP request paths
//!
//! The topic base comes from the request's Uri-Path; the suffix is the
//! reporting device's resolved location label, or its normalized
//! identifier when the location is unknown.

/// Path strings that cannot serve as a topic base.
const DEGENERATE_TOKENS: [&str; 4] = ["/", "()", "#", "$"];

/// Derive the topic base from CoAP Uri-Path segments.
///
/// Segments are joined with `/`. An empty result, or one of the degenerate
/// tokens, substitutes the configured default base. This never fails: a
/// request with an unusable path still gets the default base instead of an
/// error (fail-open).
pub fn base_from_segments(segments: &[String], default_base: &str) -> String {
    let joined = segments.join("/");
    if joined.is_empty() || DEGENERATE_TOKENS.contains(&joined.as_str()) {
        default_base.to_string()
    } else {
        joined
    }
}

/// Assemble the final publication topic: `{base}/{suffix}`.
pub fn finalize(base: &str, suffix: &str) -> String {
    format!("{}/{}", base, suffix)
}
