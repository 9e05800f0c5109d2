//! Block-wise encoding of UTF-8 document text into the on-disk form.

use std::io::{self, Write};

use crate::encoding::UnicodeMode;
use crate::encoding::utf16::{Endian, push_char};
use crate::encoding::utf8::is_trail_byte;
use crate::file::StoreTarget;

/// Writes UTF-8 blocks to a target in a chosen [`UnicodeMode`].
///
/// The byte order mark, when the mode has one, precedes the first block.
/// UTF-16 targets get each character re-encoded; every other mode is
/// written as it is.
pub struct Writer<W: StoreTarget> {
    mode: UnicodeMode,
    target: W,
    first_write: bool,
    /// Start of a character cut off at the end of the previous block.
    pending: Vec<u8>,
    scratch: Vec<u8>,
}

impl<W: StoreTarget> Writer<W> {
    pub fn new(target: W, mode: UnicodeMode) -> Self {
        Self {
            mode,
            target,
            first_write: true,
            pending: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Write one block of UTF-8, returning how many of its bytes were consumed.
    ///
    /// A result shorter than `utf8.len()` or an error means the target
    /// refused the data (for instance a full disk).
    pub fn emit(&mut self, utf8: &[u8]) -> io::Result<usize> {
        if utf8.is_empty() {
            return Ok(0);
        }
        self.write_bom()?;

        let endian = match self.mode {
            UnicodeMode::Utf16BigEndian => Endian::Big,
            UnicodeMode::Utf16LittleEndian => Endian::Little,
            UnicodeMode::Binary8Bit | UnicodeMode::Utf8WithBom | UnicodeMode::Utf8CookieDeclared => {
                self.target.write_all(utf8)?;
                return Ok(utf8.len());
            }
        };

        self.scratch.clear();
        if self.pending.is_empty() {
            Self::encode_utf16(utf8, endian, &mut self.scratch, &mut self.pending);
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(utf8);
            Self::encode_utf16(&joined, endian, &mut self.scratch, &mut self.pending);
        }
        self.target.write_all(&self.scratch)?;
        Ok(utf8.len())
    }

    fn write_bom(&mut self) -> io::Result<()> {
        if self.first_write {
            self.first_write = false;
            if let Some(bom) = self.mode.byte_order_mark() {
                self.target.write_all(bom.bytes())?;
            }
        }
        Ok(())
    }

    /// Re-encode `input` as UTF-16; an incomplete final character goes to `pending`.
    fn encode_utf16(input: &[u8], endian: Endian, out: &mut Vec<u8>, pending: &mut Vec<u8>) {
        out.reserve(input.len() * 2);
        let mut rest = input;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    text.chars().for_each(|ch| push_char(out, ch, endian));
                    return;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    std::str::from_utf8(&rest[..valid])
                        .unwrap_or_default()
                        .chars()
                        .for_each(|ch| push_char(out, ch, endian));
                    let tail = &rest[valid..];
                    match (err.error_len(), tail) {
                        // Lone surrogate in its three-byte form: write the unit back as it was
                        (_, [0xED, lead @ 0xA0..=0xBF, last, ..]) if is_trail_byte(*last) => {
                            let unit = 0xD000 | (u16::from(lead & 0x3F) << 6) | u16::from(last & 0x3F);
                            out.extend_from_slice(&endian.unit_bytes(unit));
                            rest = &tail[3..];
                        }
                        (None, _) | (_, [0xED, 0xA0..=0xBF]) => {
                            pending.extend_from_slice(tail);
                            return;
                        }
                        (Some(invalid), _) => {
                            push_char(out, char::REPLACEMENT_CHARACTER, endian);
                            rest = &tail[invalid..];
                        }
                    }
                }
            }
        }
    }

    /// Flush everything written so far and hand back the target.
    ///
    /// An empty document still receives its byte order mark so the mode
    /// survives a reload; a dangling partial character becomes U+FFFD.
    pub fn finish(mut self) -> io::Result<W> {
        self.write_bom()?;
        if !self.pending.is_empty() {
            self.pending.clear();
            if let Some(endian) = match self.mode {
                UnicodeMode::Utf16BigEndian => Some(Endian::Big),
                UnicodeMode::Utf16LittleEndian => Some(Endian::Little),
                _ => None,
            } {
                let mut out = Vec::with_capacity(2);
                push_char(&mut out, char::REPLACEMENT_CHARACTER, endian);
                self.target.write_all(&out)?;
            }
        }
        self.target.flush()?;
        Ok(self.target)
    }

    /// Finish and close the target, reporting any failure to do so.
    pub fn close(self) -> io::Result<()> {
        self.finish()?.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(mode: UnicodeMode, blocks: &[&[u8]]) -> Vec<u8> {
        let mut writer = Writer::new(Vec::<u8>::new(), mode);
        for block in blocks {
            assert_eq!(writer.emit(block).unwrap(), block.len());
        }
        writer.finish().unwrap()
    }

    #[test]
    fn test_utf16le_with_bom_and_surrogates() {
        let text = "A😀";
        let bytes = encode(UnicodeMode::Utf16LittleEndian, &[text.as_bytes()]);
        assert_eq!(bytes, [0xFF, 0xFE, 0x41, 0x00, 0x3D, 0xD8, 0x00, 0xDE]);
    }

    #[test]
    fn test_utf16be_byte_order() {
        let bytes = encode(UnicodeMode::Utf16BigEndian, &["é".as_bytes()]);
        assert_eq!(bytes, [0xFE, 0xFF, 0x00, 0xE9]);
    }

    #[test]
    fn test_utf8_modes() {
        assert_eq!(
            encode(UnicodeMode::Utf8WithBom, &[b"hi", b"!"]),
            b"\xEF\xBB\xBFhi!"
        );
        assert_eq!(encode(UnicodeMode::Utf8CookieDeclared, &[b"hi"]), b"hi");
        assert_eq!(encode(UnicodeMode::Binary8Bit, &[b"\xE9t\xE9"]), b"\xE9t\xE9");
    }

    #[test]
    fn test_bom_written_once() {
        let bytes = encode(UnicodeMode::Utf16LittleEndian, &[b"a", b"b"]);
        assert_eq!(bytes, [0xFF, 0xFE, b'a', 0, b'b', 0]);
    }

    #[test]
    fn test_character_split_across_blocks() {
        let euro = "€".as_bytes();
        let bytes = encode(UnicodeMode::Utf16BigEndian, &[&euro[..1], &euro[1..]]);
        assert_eq!(bytes, [0xFE, 0xFF, 0x20, 0xAC]);
    }

    #[test]
    fn test_invalid_utf8_becomes_replacement() {
        let bytes = encode(UnicodeMode::Utf16LittleEndian, &[b"a\xFFb"]);
        assert_eq!(bytes, [0xFF, 0xFE, b'a', 0, 0xFD, 0xFF, b'b', 0]);
    }

    #[test]
    fn test_dangling_partial_character_on_finish() {
        let bytes = encode(UnicodeMode::Utf16LittleEndian, &[b"a\xE2\x82"]);
        assert_eq!(bytes, [0xFF, 0xFE, b'a', 0, 0xFD, 0xFF]);
    }

    #[test]
    fn test_empty_document_keeps_bom() {
        assert_eq!(encode(UnicodeMode::Utf16BigEndian, &[]), [0xFE, 0xFF]);
        assert!(encode(UnicodeMode::Utf8CookieDeclared, &[]).is_empty());
    }

    #[test]
    fn test_lone_surrogate_written_back_as_unit() {
        let bytes = encode(UnicodeMode::Utf16LittleEndian, &[b"a\xED\xA0\x80b"]);
        assert_eq!(bytes, [0xFF, 0xFE, b'a', 0, 0x00, 0xD8, b'b', 0]);

        let bytes = encode(UnicodeMode::Utf16BigEndian, &[b"\xED\xBF\xBF"]);
        assert_eq!(bytes, [0xFE, 0xFF, 0xDF, 0xFF]);
    }

    #[test]
    fn test_lone_surrogate_split_across_blocks() {
        let bytes = encode(UnicodeMode::Utf16LittleEndian, &[b"a\xED\xA0", b"\x80b"]);
        assert_eq!(bytes, [0xFF, 0xFE, b'a', 0, 0x00, 0xD8, b'b', 0]);
    }

    struct Refusing;

    impl Write for Refusing {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Ok(0)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl StoreTarget for Refusing {
        fn close(self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_refused_write_is_an_error() {
        let mut writer = Writer::new(Refusing, UnicodeMode::Utf8CookieDeclared);
        let err = writer.emit(b"data").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
    }
}
