//! IMAP's modified UTF-7 for mailbox names, see [RFC 3501 section
//! 5.1.3](https://tools.ietf.org/html/rfc3501#section-5.1.3).
//!
//! Printable ASCII stands for itself, except `&`, which is written `&-`. Any other run of
//! characters is written as `&`, its UTF-16BE code units in base64 with `,` instead of `/` and
//! no padding, and `-`.

use std::borrow::Cow;

use base64::alphabet::IMAP_MUTF7;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

const MUTF7: GeneralPurpose = GeneralPurpose::new(
    &IMAP_MUTF7,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

fn is_direct(c: char) -> bool {
    ('\x20'..='\x7e').contains(&c) && c != '&'
}

/// Encode a UTF-8 mailbox name for the wire.
pub fn encode(name: &str) -> Cow<'_, str> {
    if name.chars().all(is_direct) {
        return Cow::Borrowed(name);
    }

    let mut out = String::with_capacity(name.len() + 8);
    let mut pending: Vec<u16> = Vec::new();
    for c in name.chars() {
        if is_direct(c) || c == '&' {
            flush(&mut out, &mut pending);
            if c == '&' {
                out.push_str("&-");
            } else {
                out.push(c);
            }
        } else {
            let mut units = [0u16; 2];
            pending.extend_from_slice(c.encode_utf16(&mut units));
        }
    }
    flush(&mut out, &mut pending);
    Cow::Owned(out)
}

fn flush(out: &mut String, pending: &mut Vec<u16>) {
    if pending.is_empty() {
        return;
    }
    let bytes: Vec<u8> = pending.iter().flat_map(|u| u.to_be_bytes()).collect();
    out.push('&');
    out.push_str(&MUTF7.encode(bytes));
    out.push('-');
    pending.clear();
}

/// Decode a mailbox name received from the server.
///
/// Decoding is lenient: a shifted run that is not valid base64 or not valid UTF-16 is kept as
/// it was received.
pub fn decode(name: &str) -> Cow<'_, str> {
    if !name.contains('&') {
        return Cow::Borrowed(name);
    }

    let mut out = String::with_capacity(name.len());
    let mut rest = name;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let shifted = &rest[start + 1..];
        let end = shifted.find('-').unwrap_or(shifted.len());
        let run = &shifted[..end];
        let consumed = (end + 1).min(shifted.len());

        if run.is_empty() {
            out.push('&');
        } else {
            match decode_run(run) {
                Some(text) => out.push_str(&text),
                None => out.push_str(&rest[start..start + 1 + consumed]),
            }
        }
        rest = &shifted[consumed..];
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_run(run: &str) -> Option<String> {
    let bytes = MUTF7.decode(run).ok()?;
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_unchanged() {
        assert!(matches!(encode("INBOX/Sent"), Cow::Borrowed("INBOX/Sent")));
        assert!(matches!(decode("INBOX/Sent"), Cow::Borrowed("INBOX/Sent")));
    }

    #[test]
    fn ampersand() {
        assert_eq!(encode("Tom & Jerry"), "Tom &- Jerry");
        assert_eq!(decode("Tom &- Jerry"), "Tom & Jerry");
    }

    #[test]
    fn rfc3501_example() {
        let name = "~peter/mail/\u{53f0}\u{5317}/\u{65e5}\u{672c}\u{8a9e}";
        let wire = "~peter/mail/&U,BTFw-/&ZeVnLIqe-";
        assert_eq!(encode(name), wire);
        assert_eq!(decode(wire), name);
    }

    #[test]
    fn umlauts() {
        assert_eq!(encode("Entw\u{fc}rfe"), "Entw&APw-rfe");
        assert_eq!(decode("Entw&APw-rfe"), "Entw\u{fc}rfe");
    }

    #[test]
    fn astral_plane() {
        let name = "mail \u{1f4e7}";
        assert_eq!(decode(&encode(name)), name);
    }

    #[test]
    fn invalid_run_is_kept() {
        assert_eq!(decode("a&!!-b"), "a&!!-b");
        assert_eq!(decode("trailing&"), "trailing&");
    }
}
