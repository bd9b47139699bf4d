//! CLI value parsing utilities

use anyhow::{Context, Result};
use std::time::Duration;

/// Parse a duration string (e.g., "250us", "500ms", "60s", "5m", "1h")
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();

    // Two-letter units must be checked before "m" and "s"
    let (num_str, nanos_per_unit) = if let Some(num) = s.strip_suffix("ns") {
        (num, 1u64)
    } else if let Some(num) = s.strip_suffix("us") {
        (num, 1_000)
    } else if let Some(num) = s.strip_suffix("ms") {
        (num, 1_000_000)
    } else if let Some(num) = s.strip_suffix("sec").or_else(|| s.strip_suffix('s')) {
        (num, 1_000_000_000)
    } else if let Some(num) = s.strip_suffix("min").or_else(|| s.strip_suffix('m')) {
        (num, 60_000_000_000)
    } else if let Some(num) = s.strip_suffix("hr").or_else(|| s.strip_suffix('h')) {
        (num, 3_600_000_000_000)
    } else {
        (s.as_str(), 1_000_000_000)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid duration format: {}", s))?;

    let nanos = num
        .checked_mul(nanos_per_unit)
        .with_context(|| format!("Duration out of range: {}", s))?;

    Ok(Duration::from_nanos(nanos))
}

/// Parse a duration string and return whole milliseconds
pub fn parse_duration_ms(s: &str) -> Result<u64> {
    Ok(parse_duration(s)?.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("750ns").unwrap(), Duration::from_nanos(750));
        assert_eq!(parse_duration("120us").unwrap(), Duration::from_micros(120));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("60s").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("10sec").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("2min").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration(" 30 ").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("1S").unwrap(), Duration::from_secs(1));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("99999999999999999h").is_err());
    }

    #[test]
    fn test_parse_duration_ms() {
        assert_eq!(parse_duration_ms("2s").unwrap(), 2000);
        assert_eq!(parse_duration_ms("1500us").unwrap(), 1);
    }
}
