/// Byte order marks recognised at the start of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrderMark {
    Utf16BigEndian,
    Utf16LittleEndian,
    Utf8,
}

const UTF16_BE: [u8; 2] = [0xFE, 0xFF];
const UTF16_LE: [u8; 2] = [0xFF, 0xFE];
const UTF8: [u8; 3] = [0xEF, 0xBB, 0xBF];

impl ByteOrderMark {
    /// The bytes written for this mark
    pub fn bytes(self) -> &'static [u8] {
        match self {
            ByteOrderMark::Utf16BigEndian => &UTF16_BE,
            ByteOrderMark::Utf16LittleEndian => &UTF16_LE,
            ByteOrderMark::Utf8 => &UTF8,
        }
    }

    pub fn len(self) -> usize {
        self.bytes().len()
    }

    /// Detect a byte order mark at the start of `bytes`.
    ///
    /// UTF-16 marks need two bytes and the UTF-8 mark three; a shorter
    /// prefix is never reported.
    pub fn detect(bytes: &[u8]) -> Option<ByteOrderMark> {
        [
            ByteOrderMark::Utf16BigEndian,
            ByteOrderMark::Utf16LittleEndian,
            ByteOrderMark::Utf8,
        ]
        .into_iter()
        .find(|bom| bytes.starts_with(bom.bytes()))
    }
}
