//! Conversion between on-disk encodings and in-memory UTF-8, one block at a time.

pub mod read;
pub mod write;

pub use read::Reader;
pub use write::Writer;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::UnicodeMode;

    fn write_then_read(mode: UnicodeMode, text: &str, block: usize) -> (Vec<u8>, UnicodeMode) {
        let mut writer = Writer::new(Vec::<u8>::new(), mode);
        for chunk in text.as_bytes().chunks(block) {
            writer.emit(chunk).unwrap();
        }
        let stored = writer.finish().unwrap();

        let mut reader = Reader::new();
        let mut decoded = Vec::new();
        for chunk in stored.chunks(block) {
            decoded.extend_from_slice(reader.convert(chunk));
        }
        decoded.extend_from_slice(reader.convert(&[]));
        let detected = reader.encoding().map_or(UnicodeMode::Binary8Bit, UnicodeMode::from);
        (decoded, detected)
    }

    #[test]
    fn test_round_trip_for_modes_with_bom() {
        let text = "plain, accented é, CJK 漢字, astral 😀𝄞\u{10FFFF}, end\r\n";
        for mode in [
            UnicodeMode::Utf16BigEndian,
            UnicodeMode::Utf16LittleEndian,
            UnicodeMode::Utf8WithBom,
        ] {
            for block in [3, 5, 7, 64] {
                let (decoded, detected) = write_then_read(mode, text, block);
                assert_eq!(decoded, text.as_bytes(), "{} in blocks of {}", mode, block);
                assert_eq!(detected, mode);
            }
        }
    }
}
