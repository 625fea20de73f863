//! String-to-value unit parsing for CLI flags and TOML fields
//!
//! A trailing-suffix match against the lowercased input, falling through to a bare
//! number when no unit is present.

use anyhow::{Context, Result};

/// Parse a size string ("1024", "4k", "100M", "1GB") into bytes.
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();
    let (num_str, multiplier) = if let Some(rest) = s.strip_suffix("kb").or_else(|| s.strip_suffix('k')) {
        (rest, 1024u64)
    } else if let Some(rest) = s.strip_suffix("mb").or_else(|| s.strip_suffix('m')) {
        (rest, 1024 * 1024)
    } else if let Some(rest) = s.strip_suffix("gb").or_else(|| s.strip_suffix('g')) {
        (rest, 1024 * 1024 * 1024)
    } else {
        (s.as_str(), 1)
    };
    let num: u64 = num_str.trim().parse().with_context(|| format!("invalid size: {s}"))?;
    Ok(num * multiplier)
}

/// Parse a duration string ("30", "30s", "5m", "1h") into seconds.
pub fn parse_duration_secs(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();
    let (num_str, multiplier) = if let Some(rest) = s.strip_suffix("sec").or_else(|| s.strip_suffix('s')) {
        (rest, 1u64)
    } else if let Some(rest) = s.strip_suffix("min").or_else(|| s.strip_suffix('m')) {
        (rest, 60)
    } else if let Some(rest) = s.strip_suffix("hr").or_else(|| s.strip_suffix('h')) {
        (rest, 3600)
    } else {
        (s.as_str(), 1)
    };
    let num: u64 = num_str.trim().parse().with_context(|| format!("invalid duration: {s}"))?;
    Ok(num * multiplier)
}

/// Parse a sub-second time string ("150us", "25ms", "2s") into microseconds.
pub fn parse_time_us(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();
    let (num_str, multiplier) = if let Some(rest) = s.strip_suffix("us") {
        (rest, 1u64)
    } else if let Some(rest) = s.strip_suffix("ms") {
        (rest, 1_000)
    } else if let Some(rest) = s.strip_suffix('s') {
        (rest, 1_000_000)
    } else {
        (s.as_str(), 1)
    };
    let num: u64 = num_str.trim().parse().with_context(|| format!("invalid time: {s}"))?;
    Ok(num * multiplier)
}

/// Parse a percentage string ("5", "5%", "0.05") into a [0, 100] value. Bare
/// fractional values below 1 are treated as already-fractional (`0.05` == `5%`);
/// anything else is read literally as a percent.
pub fn parse_percent(s: &str) -> Result<f64> {
    let s = s.trim();
    let (num_str, is_percent) = if let Some(rest) = s.strip_suffix('%') {
        (rest, true)
    } else {
        (s, false)
    };
    let num: f64 = num_str.trim().parse().with_context(|| format!("invalid percent: {s}"))?;
    if is_percent {
        Ok(num)
    } else if num <= 1.0 {
        Ok(num * 100.0)
    } else {
        Ok(num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_suffixed_sizes() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("4k").unwrap(), 4096);
        assert_eq!(parse_size("4KB").unwrap(), 4096);
        assert_eq!(parse_size("1m").unwrap(), 1024 * 1024);
        assert_eq!(parse_size("1GB").unwrap(), 1024 * 1024 * 1024);
    }

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration_secs("60").unwrap(), 60);
        assert_eq!(parse_duration_secs("60s").unwrap(), 60);
        assert_eq!(parse_duration_secs("5m").unwrap(), 300);
        assert_eq!(parse_duration_secs("2h").unwrap(), 7200);
    }

    #[test]
    fn parses_sub_second_times() {
        assert_eq!(parse_time_us("100us").unwrap(), 100);
        assert_eq!(parse_time_us("1ms").unwrap(), 1000);
        assert_eq!(parse_time_us("1s").unwrap(), 1_000_000);
    }

    #[test]
    fn parses_percents() {
        assert_eq!(parse_percent("5%").unwrap(), 5.0);
        assert_eq!(parse_percent("5").unwrap(), 5.0);
        assert_eq!(parse_percent("0.05").unwrap(), 5.0);
        assert_eq!(parse_percent("95").unwrap(), 95.0);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_size("not-a-size").is_err());
        assert!(parse_duration_secs("huh").is_err());
    }
}
