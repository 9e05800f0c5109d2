//! Coding cookie detection on the first two lines of a file.
//!
//! A cookie is an in-file declaration such as `# -*- coding: utf-8 -*-` or
//! `<?xml version="1.0" encoding="utf-8"?>`. Only UTF-8 declarations change
//! the result; anything else is treated as 8-bit text.

use crate::encoding::UnicodeMode;

const CODING_COOKIE: &[u8] = b"coding";
const UTF8_NAME: &[u8] = b"utf-8";

/// First line of `bytes`, including its terminator.
///
/// CR, LF and CRLF all end a line; CRLF is consumed as one terminator.
pub fn extract_line(bytes: &[u8]) -> &[u8] {
    let Some(pos) = bytes.iter().position(|&b| b == b'\r' || b == b'\n') else {
        return bytes;
    };
    let end = if bytes[pos] == b'\r' && bytes.get(pos + 1) == Some(&b'\n') {
        pos + 2
    } else {
        pos + 1
    };
    &bytes[..end]
}

/// Encoding declared by a coding cookie on line one or two.
pub fn coding_cookie_value(bytes: &[u8]) -> UnicodeMode {
    let first = extract_line(bytes);
    match cookie_value(first) {
        UnicodeMode::Binary8Bit => cookie_value(extract_line(&bytes[first.len()..])),
        mode => mode,
    }
}

fn is_encoding_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.')
}

fn is_space_char(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn cookie_value(line: &[u8]) -> UnicodeMode {
    let Some(pos) = find(line, CODING_COOKIE) else {
        return UnicodeMode::Binary8Bit;
    };
    let mut rest = &line[pos + CODING_COOKIE.len()..];

    match rest.first() {
        Some(b':' | b'=') => rest = &rest[1..],
        _ => return UnicodeMode::Binary8Bit,
    }
    if let Some(b'"' | b'\'') = rest.first() {
        rest = &rest[1..];
    }
    let spaces = rest.iter().take_while(|&&b| is_space_char(b)).count();
    rest = &rest[spaces..];

    let name_len = rest.iter().take_while(|&&b| is_encoding_char(b)).count();
    if rest[..name_len].eq_ignore_ascii_case(UTF8_NAME) {
        UnicodeMode::Utf8CookieDeclared
    } else {
        UnicodeMode::Binary8Bit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_extract_line_terminators() {
        assert_eq!(extract_line(b"one\ntwo"), b"one\n");
        assert_eq!(extract_line(b"one\r\ntwo"), b"one\r\n");
        assert_eq!(extract_line(b"one\rtwo"), b"one\r");
        assert_eq!(extract_line(b"one"), b"one");
        assert_eq!(extract_line(b""), b"");
        assert_eq!(extract_line(b"\n\nthird"), b"\n");
    }

    #[rstest]
    #[case(b"# -*- coding: UTF-8 -*-\nbody\n", UnicodeMode::Utf8CookieDeclared)]
    #[case(b"#!/usr/bin/python\n# coding=utf-8\n", UnicodeMode::Utf8CookieDeclared)]
    #[case(b"#!/bin/sh\r\n# vim: set coding=\"utf-8\" :\r\n", UnicodeMode::Utf8CookieDeclared)]
    #[case(b"# coding:\t utf-8\n", UnicodeMode::Utf8CookieDeclared)]
    #[case(b"# coding:'utf-8'\n", UnicodeMode::Utf8CookieDeclared)]
    #[case(b"# coding: 'utf-8'\n", UnicodeMode::Binary8Bit)]
    #[case(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n", UnicodeMode::Utf8CookieDeclared)]
    #[case(b"# coding: latin-1\n", UnicodeMode::Binary8Bit)]
    #[case(b"# coding: utf-8-sig\n", UnicodeMode::Binary8Bit)]
    #[case(b"# CODING: utf-8\n", UnicodeMode::Binary8Bit)]
    #[case(b"# coding utf-8\n", UnicodeMode::Binary8Bit)]
    #[case(b"line one\nline two\n# coding: utf-8\n", UnicodeMode::Binary8Bit)]
    #[case(b"", UnicodeMode::Binary8Bit)]
    fn test_coding_cookie_value(#[case] bytes: &[u8], #[case] expected: UnicodeMode) {
        assert_eq!(coding_cookie_value(bytes), expected);
    }

    #[test]
    fn test_truncated_and_binary_input() {
        assert_eq!(coding_cookie_value(b"# coding"), UnicodeMode::Binary8Bit);
        assert_eq!(coding_cookie_value(b"# coding:"), UnicodeMode::Binary8Bit);
        assert_eq!(coding_cookie_value(b"# coding: utf-"), UnicodeMode::Binary8Bit);
        assert_eq!(coding_cookie_value(b"# coding: utf-8"), UnicodeMode::Utf8CookieDeclared);
        let binary: Vec<u8> = (0..=255u8).cycle().take(2048).collect();
        assert_eq!(coding_cookie_value(&binary), UnicodeMode::Binary8Bit);
    }
}
