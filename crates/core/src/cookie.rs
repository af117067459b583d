//! Cookie header codec: the `name=value; expires=...; path=/;` wire format.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters the legacy `escape()` leaves untouched.
const ESCAPE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'@')
    .remove(b'*')
    .remove(b'_')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'/');

const GMT_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub fn escape(value: &str) -> String {
    utf8_percent_encode(value, ESCAPE_SET).to_string()
}

/// Percent-decodes a cookie value.
///
/// `%XX` runs are read as UTF-8 (invalid bytes become U+FFFD) and legacy
/// `%uXXXX` sequences as UTF-16 code units. Malformed sequences are kept as-is.
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(idx) = rest.find("%u") {
        let (plain, mut tail) = rest.split_at(idx);
        out.push_str(&percent_decode_str(plain).decode_utf8_lossy());

        let mut units = Vec::new();
        while let Some(unit) = utf16_unit(tail) {
            units.push(unit);
            tail = &tail[6..];
        }
        if units.is_empty() {
            out.push_str("%u");
            tail = &tail[2..];
        } else {
            out.extend(char::decode_utf16(units).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)));
        }
        rest = tail;
    }
    out.push_str(&percent_decode_str(rest).decode_utf8_lossy());
    out
}

fn utf16_unit(s: &str) -> Option<u16> {
    let hex = s.strip_prefix("%u")?.get(..4)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(hex, 16).ok()
}

pub fn format_expires(at: DateTime<Utc>) -> String {
    at.format(GMT_FORMAT).to_string()
}

pub fn parse_expires(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Latest instant a four-digit GMT date can express.
pub fn latest_expiry() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|t| t.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Absolute expiry `days` after `now`, capped at [`latest_expiry`]; zero
/// days means a session cookie.
pub fn expiry_after(now: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    if days == 0 {
        return None;
    }
    let latest = latest_expiry();
    let at = now
        .checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(latest);
    Some(at.min(latest))
}

/// Whether `days` from `now` still fits before [`latest_expiry`].
pub fn expiry_in_range(now: DateTime<Utc>, days: u32) -> bool {
    now.checked_add_signed(Duration::days(i64::from(days)))
        .is_some_and(|at| at <= latest_expiry())
}

pub fn serialize_entry(name: &str, value: &str, expires: Option<DateTime<Utc>>) -> String {
    match expires {
        Some(at) => format!("{}={}; expires={}; path=/;", name, escape(value), format_expires(at)),
        None => format!("{}={}; path=/;", name, escape(value)),
    }
}

/// Scans a cookie header for `name` and returns its decoded value.
///
/// Entries are split on `;` and trimmed, so headers with irregular spacing
/// (`a=1;b=2 ;  c=3`) parse the same as browser-formatted ones. The first
/// match wins; `None` means no entry has that name.
pub fn read_entry(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|entry| entry.strip_prefix(name)?.strip_prefix('='))
        .map(unescape)
}

/// Cookie names are tokens: no separators, whitespace or control characters.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_graphic() && !matches!(c, '=' | ';' | ',' | '"' | '\\'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reads_entry_among_others() {
        let header = "foo=bar; _accept_cookies=true; baz=qux";
        assert_eq!(read_entry(header, "_accept_cookies").as_deref(), Some("true"));
        assert_eq!(read_entry(header, "baz").as_deref(), Some("qux"));
    }

    #[test]
    fn empty_header_is_absent() {
        assert_eq!(read_entry("", "_accept_cookies"), None);
    }

    #[test]
    fn tolerates_irregular_spacing() {
        let header = "a=1;_accept_cookies=false ;   b=2";
        assert_eq!(read_entry(header, "_accept_cookies").as_deref(), Some("false"));
        assert_eq!(read_entry("  \t_accept_cookies=true", "_accept_cookies").as_deref(), Some("true"));
    }

    #[test]
    fn name_must_match_whole_key() {
        let header = "x_accept_cookies=true; _accept_cookies_v2=false";
        assert_eq!(read_entry(header, "_accept_cookies"), None);
    }

    #[test]
    fn first_match_wins() {
        let header = "_accept_cookies=false; _accept_cookies=true";
        assert_eq!(read_entry(header, "_accept_cookies").as_deref(), Some("false"));
    }

    #[test]
    fn malformed_headers_do_not_panic() {
        for header in [";;;", "=", "_accept_cookies", "; =x; ;", "_accept_cookies=%zz%"] {
            let _ = read_entry(header, "_accept_cookies");
        }
        assert_eq!(read_entry("_accept_cookies=%zz%", "_accept_cookies").as_deref(), Some("%zz%"));
        assert_eq!(read_entry("_accept_cookies=", "_accept_cookies").as_deref(), Some(""));
    }

    #[test]
    fn escape_matches_legacy_safe_set() {
        assert_eq!(escape("true"), "true");
        assert_eq!(escape("a b;c=d"), "a%20b%3Bc%3Dd");
        assert_eq!(escape("@*_+-./"), "@*_+-./");
        assert_eq!(unescape("a%20b%3Bc%3Dd"), "a b;c=d");
    }

    #[test]
    fn serializes_wire_format() {
        let at = Utc.with_ymd_and_hms(2027, 1, 5, 23, 4, 9).unwrap();
        assert_eq!(
            serialize_entry("_accept_cookies", "false", Some(at)),
            "_accept_cookies=false; expires=Tue, 05 Jan 2027 23:04:09 GMT; path=/;"
        );
        assert_eq!(serialize_entry("n", "v", None), "n=v; path=/;");
    }

    #[test]
    fn expires_parses_back() {
        let at = Utc.with_ymd_and_hms(2027, 10, 19, 8, 30, 0).unwrap();
        assert_eq!(parse_expires(&format_expires(at)), Some(at));
        assert_eq!(parse_expires("not a date"), None);
    }

    #[test]
    fn zero_days_is_a_session_cookie() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        assert_eq!(expiry_after(now, 0), None);
        assert_eq!(expiry_after(now, 1), Some(now + Duration::days(1)));
    }

    #[test]
    fn far_expiry_stays_a_valid_gmt_date() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        for days in [3_000_000, u32::MAX] {
            let at = expiry_after(now, days);
            assert_eq!(at, Some(latest_expiry()));
            let entry = serialize_entry("_accept_cookies", "true", at);
            assert_eq!(
                entry,
                "_accept_cookies=true; expires=Fri, 31 Dec 9999 23:59:59 GMT; path=/;"
            );
            assert_eq!(parse_expires("Fri, 31 Dec 9999 23:59:59 GMT"), at);
        }
    }

    #[test]
    fn expiry_range_check() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        assert!(expiry_in_range(now, 0));
        assert!(expiry_in_range(now, 365));
        assert!(!expiry_in_range(now, 3_000_000));
        assert!(!expiry_in_range(now, u32::MAX));
    }

    #[test]
    fn legacy_unicode_escapes_decode() {
        assert_eq!(unescape("caf%u00E9"), "café");
        assert_eq!(unescape("%uD83D%uDE00!"), "😀!");
        assert_eq!(unescape("%u12"), "%u12");
        assert_eq!(unescape("%uZZZZ%20x"), "%uZZZZ x");
        assert_eq!(unescape("%C3%A9%u00E9"), "éé");
        assert_eq!(unescape("%FF"), "\u{FFFD}");
    }

    #[test]
    fn validates_names() {
        assert!(is_valid_name("_accept_cookies"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("a b"));
        assert!(!is_valid_name("a=b"));
        assert!(!is_valid_name("a;b"));
    }
}
