//! Envelope header decoding.
//!
//! Subjects and display names arrive as raw header bytes, possibly carrying
//! RFC 2047 encoded words (`=?charset?B|Q?payload?=`).

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use chrono::{DateTime, Utc};

/// Decodes a raw header value, expanding RFC 2047 encoded words.
///
/// Whitespace between adjacent encoded words is dropped; other whitespace
/// runs are collapsed to a single space.
#[must_use]
pub fn decode_header(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let mut out = String::with_capacity(text.len());
    let mut previous_encoded = false;

    for (i, token) in text.split_whitespace().enumerate() {
        match decode_encoded_word(token) {
            Some(decoded) => {
                if i > 0 && !previous_encoded {
                    out.push(' ');
                }
                out.push_str(&decoded);
                previous_encoded = true;
            }
            None => {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(token);
                previous_encoded = false;
            }
        }
    }

    out
}

/// Decodes a single `=?charset?encoding?payload?=` token.
fn decode_encoded_word(token: &str) -> Option<String> {
    let inner = token.strip_prefix("=?")?.strip_suffix("?=")?;
    let mut parts = inner.splitn(3, '?');
    let charset = parts.next()?;
    let encoding = parts.next()?;
    let payload = parts.next()?;

    let bytes = match encoding {
        "B" | "b" => STANDARD
            .decode(payload)
            .or_else(|_| STANDARD_NO_PAD.decode(payload))
            .ok()?,
        "Q" | "q" => decode_q(payload)?,
        _ => return None,
    };
    Some(decode_charset(charset, &bytes))
}

/// Quoted-printable variant used in headers: `_` is a space.
fn decode_q(payload: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(payload.len());
    let mut bytes = payload.bytes();
    while let Some(b) = bytes.next() {
        match b {
            b'_' => out.push(b' '),
            b'=' => {
                let hi = char::from(bytes.next()?).to_digit(16)?;
                let lo = char::from(bytes.next()?).to_digit(16)?;
                out.push(u8::try_from(hi * 16 + lo).ok()?);
            }
            other => out.push(other),
        }
    }
    Some(out)
}

fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    // RFC 2231 language suffix: charset*lang
    let charset = charset.split('*').next().unwrap_or(charset);
    if charset.eq_ignore_ascii_case("iso-8859-1")
        || charset.eq_ignore_ascii_case("latin1")
        || charset.eq_ignore_ascii_case("windows-1252")
    {
        bytes.iter().map(|&b| char::from(b)).collect()
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// Formats a sender as `Name <mailbox@host>`, or `mailbox@host` without a name.
#[must_use]
pub fn format_sender(name: Option<&[u8]>, mailbox: Option<&[u8]>, host: Option<&[u8]>) -> String {
    let name = name.map(decode_header).unwrap_or_default();
    let mailbox = mailbox.map(String::from_utf8_lossy).unwrap_or_default();
    let address = match host.map(String::from_utf8_lossy) {
        Some(host) if !host.is_empty() => format!("{mailbox}@{host}"),
        _ => mailbox.into_owned(),
    };

    if name.is_empty() {
        address
    } else {
        format!("{name} <{address}>")
    }
}

/// Truncate text to a maximum length.
#[must_use]
pub fn truncate_text(text: &str, max_len: usize) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control())
        .take(max_len)
        .collect();

    if text.chars().filter(|c| !c.is_control()).count() > max_len {
        format!("{cleaned}...")
    } else {
        cleaned
    }
}

/// Parses an RFC 2822 date header, tolerating a trailing zone comment.
#[must_use]
pub fn parse_date(raw: &[u8]) -> Option<DateTime<Utc>> {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    let text = match text.rfind(" (") {
        Some(idx) if text.ends_with(')') => &text[..idx],
        _ => text,
    };
    DateTime::parse_from_rfc2822(text)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_plain_header_passes_through() {
        assert_eq!(decode_header(b"Weekly   digest"), "Weekly digest");
    }

    #[test]
    fn test_base64_word() {
        assert_eq!(decode_header(b"=?UTF-8?B?SMOpbGxv?="), "H\u{e9}llo");
    }

    #[test]
    fn test_q_word_with_underscores() {
        assert_eq!(decode_header(b"=?utf-8?Q?Caf=C3=A9_au_lait?="), "Caf\u{e9} au lait");
    }

    #[test]
    fn test_adjacent_words_join_without_space() {
        assert_eq!(
            decode_header(b"Re: =?UTF-8?Q?ab?= =?UTF-8?Q?cd?= done"),
            "Re: abcd done"
        );
    }

    #[test]
    fn test_latin1_word() {
        assert_eq!(decode_header(b"=?ISO-8859-1?Q?=E9t=E9?="), "\u{e9}t\u{e9}");
    }

    #[test]
    fn test_malformed_word_is_kept() {
        assert_eq!(decode_header(b"=?UTF-8?X?abc?="), "=?UTF-8?X?abc?=");
        assert_eq!(decode_header(b"=?UTF-8?Q?bad=Z?="), "=?UTF-8?Q?bad=Z?=");
    }

    #[test]
    fn test_format_sender() {
        assert_eq!(
            format_sender(Some(&b"Jane Doe"[..]), Some(&b"jane"[..]), Some(&b"example.com"[..])),
            "Jane Doe <jane@example.com>"
        );
        assert_eq!(
            format_sender(None, Some(&b"jane"[..]), Some(&b"example.com"[..])),
            "jane@example.com"
        );
        assert_eq!(format_sender(Some(&b""[..]), Some(&b"jane"[..]), None), "jane");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 200), "short");
        let long = "x".repeat(250);
        let out = truncate_text(&long, 200);
        assert_eq!(out.len(), 203);
        assert!(out.ends_with("..."));
        assert_eq!(truncate_text("a\r\nb", 10), "ab");
    }

    #[test]
    fn test_parse_date() {
        let date = parse_date(b"Tue, 14 Jan 2025 09:30:00 +0100 (CET)").unwrap();
        assert_eq!(date.year(), 2025);
        assert_eq!(date.hour(), 8);
        assert!(parse_date(b"not a date").is_none());
    }
}
