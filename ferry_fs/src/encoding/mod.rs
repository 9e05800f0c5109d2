use std::fmt;

pub mod utf16;
pub mod utf8;

use crate::bom::ByteOrderMark;

/// Encoding of a file as stored on disk.
///
/// Discovered once per load (BOM first, then the coding cookie) and reused
/// when the document is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnicodeMode {
    /// No BOM and no cookie: bytes are kept as they are.
    #[default]
    Binary8Bit,
    Utf16BigEndian,
    Utf16LittleEndian,
    Utf8WithBom,
    /// UTF-8 declared by a `coding: utf-8` comment; written without a BOM.
    Utf8CookieDeclared,
}

impl UnicodeMode {
    /// The mark written at the start of a file stored in this mode
    pub fn byte_order_mark(self) -> Option<ByteOrderMark> {
        match self {
            UnicodeMode::Utf16BigEndian => Some(ByteOrderMark::Utf16BigEndian),
            UnicodeMode::Utf16LittleEndian => Some(ByteOrderMark::Utf16LittleEndian),
            UnicodeMode::Utf8WithBom => Some(ByteOrderMark::Utf8),
            UnicodeMode::Binary8Bit | UnicodeMode::Utf8CookieDeclared => None,
        }
    }

    pub fn is_utf16(self) -> bool {
        matches!(self, UnicodeMode::Utf16BigEndian | UnicodeMode::Utf16LittleEndian)
    }

    /// Whether the in-memory text is known to be UTF-8
    pub fn is_unicode(self) -> bool {
        self != UnicodeMode::Binary8Bit
    }
}

impl From<ByteOrderMark> for UnicodeMode {
    fn from(bom: ByteOrderMark) -> Self {
        match bom {
            ByteOrderMark::Utf16BigEndian => UnicodeMode::Utf16BigEndian,
            ByteOrderMark::Utf16LittleEndian => UnicodeMode::Utf16LittleEndian,
            ByteOrderMark::Utf8 => UnicodeMode::Utf8WithBom,
        }
    }
}

impl fmt::Display for UnicodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnicodeMode::Binary8Bit => write!(f, "8-bit"),
            UnicodeMode::Utf16BigEndian => write!(f, "UTF-16 BE"),
            UnicodeMode::Utf16LittleEndian => write!(f, "UTF-16 LE"),
            UnicodeMode::Utf8WithBom => write!(f, "UTF-8 with BOM"),
            UnicodeMode::Utf8CookieDeclared => write!(f, "UTF-8"),
        }
    }
}

impl std::str::FromStr for UnicodeMode {
    type Err = String;

    /// Accepts the names used on the command line (`8bit`, `utf16be`, `utf16le`, `utf8bom`, `utf8`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "8bit" | "binary" => Ok(UnicodeMode::Binary8Bit),
            "utf16be" | "utf-16be" => Ok(UnicodeMode::Utf16BigEndian),
            "utf16le" | "utf-16le" => Ok(UnicodeMode::Utf16LittleEndian),
            "utf8bom" | "utf-8-bom" => Ok(UnicodeMode::Utf8WithBom),
            "utf8" | "utf-8" | "cookie" => Ok(UnicodeMode::Utf8CookieDeclared),
            other => Err(format!("unknown encoding '{}'", other)),
        }
    }
}
