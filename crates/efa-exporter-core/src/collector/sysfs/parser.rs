//! Parsers for `/sys/class/infiniband` attribute files.
//!
//! These are pure functions that parse the trimmed content of a single sysfs
//! attribute into a typed value. They are designed to be easily testable with
//! string inputs.

/// Substring drivers write into a counter file when the port management
/// agent cannot supply the value.
pub const COUNTER_NOT_AVAILABLE: &str = "N/A (no PMA)";

/// Bytes per second in one `Gb/sec` of link rate.
const BYTES_PER_GBIT: f64 = 125_000_000.0;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parses a `state` or `phys_state` file.
///
/// Format: `"<id>: <NAME>"`, e.g. `"4: ACTIVE"` or `"5: LinkUp"`.
/// Returns `(id, name)`.
pub fn parse_state(content: &str) -> Result<(u32, String), ParseError> {
    let mut parts = content.split(':');
    let (Some(id), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ParseError::new(format!(
            "failed to split {content:?} into 'ID: NAME'"
        )));
    };

    let id = id
        .trim()
        .parse::<u32>()
        .map_err(|e| ParseError::new(format!("invalid state id in {content:?}: {e}")))?;

    Ok((id, name.trim().to_string()))
}

/// Parses a `rate` file into bytes per second.
///
/// Format: `"<value> Gb/sec"` optionally followed by a lane description,
/// e.g. `"100 Gb/sec (4X EDR)"`. Fractional rates such as `"2.5 Gb/sec"` are
/// allowed; the result is truncated to whole bytes.
pub fn parse_rate(content: &str) -> Result<u64, ParseError> {
    let mut fields = content.split_whitespace();
    let (Some(value), Some(unit)) = (fields.next(), fields.next()) else {
        return Err(ParseError::new(format!("failed to split rate {content:?}")));
    };

    if unit != "Gb/sec" {
        return Err(ParseError::new(format!(
            "unit of the rate {content:?} is not Gb/sec"
        )));
    }

    let gbits: f64 = value
        .parse()
        .map_err(|e| ParseError::new(format!("invalid rate value in {content:?}: {e}")))?;
    if !gbits.is_finite() || gbits < 0.0 {
        return Err(ParseError::new(format!("rate {content:?} out of range")));
    }

    Ok((gbits * BYTES_PER_GBIT) as u64)
}

/// Parses an unsigned 64-bit integer, inferring the base from its prefix.
///
/// `0x`/`0X` is hexadecimal, `0o`/`0O` and a bare leading `0` are octal,
/// `0b`/`0B` is binary, anything else is decimal. Signs, underscores and
/// inner whitespace are rejected.
pub fn parse_u64_auto(content: &str) -> Result<u64, ParseError> {
    let (digits, radix) = if let Some(rest) = strip_prefix_ci(content, "0x") {
        (rest, 16)
    } else if let Some(rest) = strip_prefix_ci(content, "0o") {
        (rest, 8)
    } else if let Some(rest) = strip_prefix_ci(content, "0b") {
        (rest, 2)
    } else if content.len() > 1 && content.starts_with('0') {
        (&content[1..], 8)
    } else {
        (content, 10)
    };

    // from_str_radix would accept a leading '+'.
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(ParseError::new(format!("invalid integer {content:?}")));
    }

    u64::from_str_radix(digits, radix)
        .map_err(|e| ParseError::new(format!("invalid integer {content:?}: {e}")))
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

/// Parses a hardware counter file.
///
/// Returns `Ok(None)` when the value does not parse but carries the
/// "not available" marker (`N/A (no PMA)`), so the counter reads as absent
/// rather than zero.
pub fn parse_counter(content: &str) -> Result<Option<u64>, ParseError> {
    match parse_u64_auto(content) {
        Ok(value) => Ok(Some(value)),
        Err(_) if content.contains(COUNTER_NOT_AVAILABLE) => Ok(None),
        Err(e) => Err(e),
    }
}
