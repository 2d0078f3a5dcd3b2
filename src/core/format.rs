//! core::format
//!
//! Value formats and their validation rules.
//!
//! # Rules
//!
//! | Format  | Accepted values |
//! |---------|-----------------|
//! | STRING  | anything |
//! | BOOLEAN | anything (loose parse, never rejects) |
//! | URL     | absolute URL with a scheme |
//! | MAIL    | a single address, optionally with a display name and comments |
//! | DATE    | legacy `YYYY-mm-dd` pattern, see [`check_format`] |
//! | NUMERIC | a decimal or hexadecimal floating-point number |
//!
//! Blank values skip validation for every format.
//!
//! # Example
//!
//! ```
//! use metatier::core::format::{check_format, MetadataFormat};
//!
//! assert!(check_format(MetadataFormat::Numeric, Some("3.14")).is_ok());
//! assert!(check_format(MetadataFormat::Numeric, Some("abc")).is_err());
//! assert!(check_format(MetadataFormat::Numeric, Some("")).is_ok());
//! assert!(check_format(MetadataFormat::Url, Some("not a url")).is_err());
//! ```

use std::str::FromStr;

use chrono::format::{parse_and_remainder, Parsed, StrftimeItems};
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of characters a DATE value is truncated to before storage.
pub const DATE_VALUE_LEN: usize = 10;

/// Legacy `YYYY-mm-dd` pattern in strftime terms. The middle field is
/// minute (`%M`), not month; kept as observed.
const LEGACY_DATE_PATTERN: &str = "%Y-%M-%d";

/// Type suffixes tolerated after a NUMERIC value.
const NUMERIC_SUFFIXES: [char; 4] = ['d', 'D', 'f', 'F'];

/// Declared grammar of a metadata value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetadataFormat {
    #[default]
    String,
    Boolean,
    Url,
    Mail,
    Date,
    Numeric,
}

impl MetadataFormat {
    /// All formats, in declaration order.
    pub const ALL: [MetadataFormat; 6] = [
        MetadataFormat::String,
        MetadataFormat::Boolean,
        MetadataFormat::Url,
        MetadataFormat::Mail,
        MetadataFormat::Date,
        MetadataFormat::Numeric,
    ];

    /// Upper-case tag as used in persisted and wire forms.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataFormat::String => "STRING",
            MetadataFormat::Boolean => "BOOLEAN",
            MetadataFormat::Url => "URL",
            MetadataFormat::Mail => "MAIL",
            MetadataFormat::Date => "DATE",
            MetadataFormat::Numeric => "NUMERIC",
        }
    }
}

impl std::fmt::Display for MetadataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| FormatError {
                format: MetadataFormat::String,
                value: s.to_string(),
                reason: "unknown metadata format".into(),
            })
    }
}

/// A value failed its declared format's grammar.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid {format} value '{value}': {reason}")]
pub struct FormatError {
    /// The declared format.
    pub format: MetadataFormat,
    /// The offending raw value.
    pub value: String,
    /// What the parser rejected.
    pub reason: String,
}

impl FormatError {
    fn new(format: MetadataFormat, value: &str, reason: impl Into<String>) -> Self {
        Self {
            format,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Check that `value` is syntactically valid for `format`.
///
/// Absent and blank values are always valid: validation is skipped, not
/// satisfied by coercion.
///
/// DATE follows the legacy `YYYY-mm-dd` pattern literally: a year of up
/// to four digits, a dash, a *minute* field (0-59), a dash and a
/// day-of-month (1-31). Text after the pattern is ignored, so
/// `2024-05-01T10:00` is accepted. A non-blank DATE value must also have
/// at least [`DATE_VALUE_LEN`] characters so it can be normalized.
///
/// # Errors
///
/// Returns [`FormatError`] carrying the format, the value and the reason.
pub fn check_format(format: MetadataFormat, value: Option<&str>) -> Result<(), FormatError> {
    let value = match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => return Ok(()),
    };

    match format {
        MetadataFormat::String | MetadataFormat::Boolean => Ok(()),
        MetadataFormat::Url => check_url(value),
        MetadataFormat::Mail => check_mail(value),
        MetadataFormat::Date => check_date(value),
        MetadataFormat::Numeric => check_numeric(value),
    }
}

/// Normalize a value for storage.
///
/// DATE values longer than [`DATE_VALUE_LEN`] characters keep only their
/// first [`DATE_VALUE_LEN`] characters. Everything else is unchanged.
///
/// # Example
///
/// ```
/// use metatier::core::format::{normalize_value, MetadataFormat};
///
/// assert_eq!(
///     normalize_value(MetadataFormat::Date, Some("2024-05-01T10:00".into())),
///     Some("2024-05-01".to_string())
/// );
/// assert_eq!(
///     normalize_value(MetadataFormat::String, Some("2024-05-01T10:00".into())),
///     Some("2024-05-01T10:00".to_string())
/// );
/// ```
pub fn normalize_value(format: MetadataFormat, value: Option<String>) -> Option<String> {
    match (format, value) {
        (MetadataFormat::Date, Some(v)) if v.chars().count() > DATE_VALUE_LEN => {
            Some(v.chars().take(DATE_VALUE_LEN).collect())
        }
        (_, value) => value,
    }
}

fn check_url(value: &str) -> Result<(), FormatError> {
    let parsed = url::Url::parse(value)
        .map_err(|e| FormatError::new(MetadataFormat::Url, value, e.to_string()))?;

    if parsed.cannot_be_a_base() && parsed.path().is_empty() {
        return Err(FormatError::new(
            MetadataFormat::Url,
            value,
            "missing authority or path",
        ));
    }
    Ok(())
}

fn check_date(value: &str) -> Result<(), FormatError> {
    let err = |reason: String| FormatError::new(MetadataFormat::Date, value, reason);

    let mut parsed = Parsed::new();
    parse_and_remainder(&mut parsed, value, StrftimeItems::new(LEGACY_DATE_PATTERN))
        .map_err(|e| err(e.to_string()))?;

    match (parsed.minute(), parsed.day()) {
        (Some(minute), Some(day)) if minute <= 59 && (1..=31).contains(&day) => {}
        (minute, day) => {
            return Err(err(format!(
                "minute {:?} or day {:?} out of range",
                minute, day
            )))
        }
    }

    if value.chars().count() < DATE_VALUE_LEN {
        return Err(err(format!(
            "date values need at least {} characters",
            DATE_VALUE_LEN
        )));
    }
    Ok(())
}

/// Decimal or hexadecimal floating point, optionally signed, with an
/// optional type suffix. `NaN` and `Infinity` are spelled exactly.
fn check_numeric(value: &str) -> Result<(), FormatError> {
    let err = |reason: String| FormatError::new(MetadataFormat::Numeric, value, reason);
    let trimmed = value.trim();
    let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    if unsigned == "NaN" || unsigned == "Infinity" {
        return Ok(());
    }

    let number = trimmed.strip_suffix(NUMERIC_SUFFIXES).unwrap_or(trimmed);
    let digits = number.strip_prefix(['+', '-']).unwrap_or(number);

    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        return if is_hex_float(hex) {
            Ok(())
        } else {
            Err(err("invalid hexadecimal floating point".into()))
        };
    }

    if digits.contains(|c: char| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E')) {
        return Err(err("not a decimal number".into()));
    }
    number
        .parse::<f64>()
        .map(|_| ())
        .map_err(|e| err(e.to_string()))
}

/// `hexdigits[.hexdigits]p[sign]digits`, with at least one mantissa digit.
fn is_hex_float(s: &str) -> bool {
    let (mantissa, exponent) = match s.split_once(['p', 'P']) {
        Some(parts) => parts,
        None => return false,
    };
    let exponent = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    !exponent.is_empty()
        && exponent.bytes().all(|b| b.is_ascii_digit())
        && !(int.is_empty() && frac.is_empty())
        && int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_hexdigit())
}

fn is_quoted_string(s: &str) -> bool {
    let inner = match s.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        Some(inner) => inner,
        None => return false,
    };

    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if chars.next().is_none() {
                    return false;
                }
            }
            '"' => return false,
            c if c.is_control() && c != '\t' => return false,
            _ => {}
        }
    }
    true
}

/// Replace RFC 5322 comments with a single space. Comments nest and are
/// only recognized outside quoted strings and domain literals.
fn strip_comments(value: &str) -> Result<String, &'static str> {
    let mut out = String::with_capacity(value.len());
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut in_literal = false;
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if depth > 0 {
            match c {
                '\\' => {
                    chars.next();
                }
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        out.push(' ');
                    }
                }
                _ => {}
            }
            continue;
        }

        match c {
            '\\' if in_quote => {
                out.push(c);
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '"' if !in_literal => {
                in_quote = !in_quote;
                out.push(c);
            }
            '[' if !in_quote => {
                in_literal = true;
                out.push(c);
            }
            ']' if !in_quote => {
                in_literal = false;
                out.push(c);
            }
            '(' if !in_quote && !in_literal => depth = 1,
            ')' if !in_quote && !in_literal => return Err("unbalanced ')'"),
            _ => out.push(c),
        }
    }

    if depth > 0 {
        return Err("unterminated comment");
    }
    if in_quote {
        return Err("unterminated quoted string");
    }
    Ok(out)
}

/// Accepts `addr-spec` or `display-name <addr-spec>`, one address only,
/// with comments anywhere between tokens. The addr-spec itself is checked
/// by `email_address`.
fn check_mail(value: &str) -> Result<(), FormatError> {
    let err = |reason: &str| FormatError::new(MetadataFormat::Mail, value, reason);
    let stripped = strip_comments(value).map_err(err)?;
    let trimmed = stripped.trim();

    let addr = match trimmed.rfind('<') {
        Some(open) => {
            let rest = &trimmed[open + 1..];
            let close = rest.find('>').ok_or_else(|| err("missing '>'"))?;
            if !rest[close + 1..].trim().is_empty() {
                return Err(err("unexpected text after address"));
            }
            let display = trimmed[..open].trim();
            if display.contains([',', ';', '<', '>']) && !is_quoted_string(display) {
                return Err(err("invalid display name"));
            }
            rest[..close].trim()
        }
        None => {
            if trimmed.contains('>') {
                return Err(err("missing '<'"));
            }
            trimmed
        }
    };

    if addr.contains([',', ';']) && !addr.starts_with('"') {
        return Err(err("expected a single address"));
    }
    if addr.chars().any(char::is_whitespace) && !addr.starts_with('"') {
        return Err(err("address contains whitespace"));
    }
    if !addr.contains('@') {
        return Err(err("missing final '@domain'"));
    }

    EmailAddress::from_str(addr)
        .map(|_| ())
        .map_err(|e| err(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(format: MetadataFormat, value: &str) -> bool {
        check_format(format, Some(value)).is_ok()
    }

    #[test]
    fn blank_values_skip_validation() {
        for format in MetadataFormat::ALL {
            assert!(check_format(format, None).is_ok(), "{format} / None");
            assert!(check_format(format, Some("")).is_ok(), "{format} / empty");
            assert!(check_format(format, Some("   ")).is_ok(), "{format} / spaces");
        }
    }

    #[test]
    fn string_and_boolean_accept_anything() {
        assert!(ok(MetadataFormat::String, "anything at all"));
        assert!(ok(MetadataFormat::Boolean, "true"));
        assert!(ok(MetadataFormat::Boolean, "definitely not a bool"));
    }

    mod url {
        use super::*;

        #[test]
        fn accepts_absolute_urls() {
            assert!(ok(MetadataFormat::Url, "https://example.com/path"));
            assert!(ok(MetadataFormat::Url, "http://localhost:8080"));
            assert!(ok(MetadataFormat::Url, "ftp://files.example.com/a.txt"));
            assert!(ok(MetadataFormat::Url, "mailto:team@example.com"));
        }

        #[test]
        fn rejects_malformed() {
            assert!(!ok(MetadataFormat::Url, "not a url"));
            assert!(!ok(MetadataFormat::Url, "/relative/path"));
            assert!(!ok(MetadataFormat::Url, "example.com"));
            assert!(!ok(MetadataFormat::Url, "http://"));
        }
    }

    mod mail {
        use super::*;

        #[test]
        fn accepts_addresses() {
            assert!(ok(MetadataFormat::Mail, "support@example.com"));
            assert!(ok(MetadataFormat::Mail, "first.last+tag@sub.example.org"));
            assert!(ok(MetadataFormat::Mail, "Support Team <support@example.com>"));
            assert!(ok(MetadataFormat::Mail, "\"odd name\"@example.com"));
            assert!(ok(MetadataFormat::Mail, "admin@[192.168.0.1]"));
            assert!(ok(MetadataFormat::Mail, "root@localhost"));
        }

        #[test]
        fn rejects_malformed() {
            assert!(!ok(MetadataFormat::Mail, "plainaddress"));
            assert!(!ok(MetadataFormat::Mail, "@example.com"));
            assert!(!ok(MetadataFormat::Mail, "user@"));
            assert!(!ok(MetadataFormat::Mail, "a..b@example.com"));
            assert!(!ok(MetadataFormat::Mail, "user@exa mple.com"));
            assert!(!ok(MetadataFormat::Mail, "a@example.com, b@example.com"));
            assert!(!ok(MetadataFormat::Mail, "Name <a@example.com"));
        }

        #[test]
        fn comments_are_ignored() {
            assert!(ok(MetadataFormat::Mail, "john@example.com (John)"));
            assert!(ok(MetadataFormat::Mail, "(ops) Ops Team <ops@example.com> (on call)"));
            assert!(ok(MetadataFormat::Mail, "\"(x)\"@example.com"));
            assert!(!ok(MetadataFormat::Mail, "john@example.com (unterminated"));
            assert!(!ok(MetadataFormat::Mail, "john@example.com )"));
            assert!(!ok(MetadataFormat::Mail, "(only a comment)"));
        }
    }

    mod date {
        use super::*;

        #[test]
        fn accepts_legacy_pattern() {
            assert!(ok(MetadataFormat::Date, "2024-05-01"));
            assert!(ok(MetadataFormat::Date, "2024-05-01T10:00"));
            assert!(ok(MetadataFormat::Date, "1999-12-31"));
        }

        #[test]
        fn middle_field_is_minute_not_month() {
            // 45 is a valid minute even though it is not a month.
            assert!(ok(MetadataFormat::Date, "2024-45-01"));
            assert!(!ok(MetadataFormat::Date, "2024-60-01"));
        }

        #[test]
        fn day_range_checked() {
            assert!(!ok(MetadataFormat::Date, "2024-05-00"));
            assert!(!ok(MetadataFormat::Date, "2024-05-32"));
        }

        #[test]
        fn rejects_other_shapes() {
            assert!(!ok(MetadataFormat::Date, "01/05/2024"));
            assert!(!ok(MetadataFormat::Date, "yesterday"));
            assert!(!ok(MetadataFormat::Date, "2024/05/01"));
        }

        #[test]
        fn rejects_values_too_short_to_normalize() {
            assert!(!ok(MetadataFormat::Date, "2024-5-1"));
        }

        #[test]
        fn single_digit_fields_parse_when_long_enough() {
            assert!(ok(MetadataFormat::Date, "2024-5-1 10:00"));
            assert!(!ok(MetadataFormat::Date, "2024-5-"));
        }
    }

    mod numeric {
        use super::*;

        #[test]
        fn accepts_numbers() {
            assert!(ok(MetadataFormat::Numeric, "3.14"));
            assert!(ok(MetadataFormat::Numeric, "-42"));
            assert!(ok(MetadataFormat::Numeric, "1e10"));
            assert!(ok(MetadataFormat::Numeric, " 7 "));
            assert!(ok(MetadataFormat::Numeric, "2.5d"));
            assert!(ok(MetadataFormat::Numeric, "-1.5F"));
        }

        #[test]
        fn accepts_hex_floats() {
            assert!(ok(MetadataFormat::Numeric, "0x1p3"));
            assert!(ok(MetadataFormat::Numeric, "-0X1.8P-2"));
            assert!(ok(MetadataFormat::Numeric, "0x.8p1d"));
            assert!(!ok(MetadataFormat::Numeric, "0x1f"));
            assert!(!ok(MetadataFormat::Numeric, "0xp3"));
            assert!(!ok(MetadataFormat::Numeric, "0x1g3p1"));
        }

        #[test]
        fn special_values_are_spelled_exactly() {
            assert!(ok(MetadataFormat::Numeric, "NaN"));
            assert!(ok(MetadataFormat::Numeric, "-Infinity"));
            assert!(!ok(MetadataFormat::Numeric, "inf"));
            assert!(!ok(MetadataFormat::Numeric, "nan"));
            assert!(!ok(MetadataFormat::Numeric, "Infinityd"));
        }

        #[test]
        fn rejects_non_numbers() {
            let err = check_format(MetadataFormat::Numeric, Some("abc")).unwrap_err();
            assert_eq!(err.format, MetadataFormat::Numeric);
            assert_eq!(err.value, "abc");
            assert!(!ok(MetadataFormat::Numeric, "1,5"));
            assert!(!ok(MetadataFormat::Numeric, "12abc"));
        }
    }

    #[test]
    fn normalize_truncates_dates_only() {
        assert_eq!(
            normalize_value(MetadataFormat::Date, Some("2024-05-01T10:00".into())),
            Some("2024-05-01".into())
        );
        assert_eq!(
            normalize_value(MetadataFormat::Date, Some("2024-05-01".into())),
            Some("2024-05-01".into())
        );
        assert_eq!(normalize_value(MetadataFormat::Date, None), None);
        assert_eq!(
            normalize_value(MetadataFormat::Url, Some("https://example.com/long".into())),
            Some("https://example.com/long".into())
        );
    }

    #[test]
    fn format_from_str_is_case_insensitive() {
        assert_eq!("date".parse::<MetadataFormat>().unwrap(), MetadataFormat::Date);
        assert_eq!("MAIL".parse::<MetadataFormat>().unwrap(), MetadataFormat::Mail);
        assert!("color".parse::<MetadataFormat>().is_err());
    }

    #[test]
    fn format_serde_uses_upper_case_tags() {
        let json = serde_json::to_string(&MetadataFormat::Numeric).unwrap();
        assert_eq!(json, "\"NUMERIC\"");
    }

    #[test]
    fn error_display_mentions_format_and_value() {
        let err = check_format(MetadataFormat::Url, Some("nope")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("URL"));
        assert!(msg.contains("nope"));
    }
}
