//! Duration parsing for `tally create --duration`
//!
//! Supports human-readable durations like "90m", "24h", "7 days".

/// Parse a human-readable duration to seconds.
///
/// Plain integers are taken as seconds. Everything else goes through the
/// humantime crate (e.g., "1 hour", "7d", "1h 30m").
///
/// # Examples
/// - "3600" → 3600
/// - "24h" → 86400
/// - "7 days" → 604800
pub fn parse_duration_to_secs(input: &str) -> Result<u64, String> {
    let input = input.trim();
    if let Ok(secs) = input.parse::<u64>() {
        return Ok(secs);
    }

    humantime::parse_duration(input)
        .map(|d| d.as_secs())
        .map_err(|e| format!("Invalid duration '{}': {}", input, e))
}
