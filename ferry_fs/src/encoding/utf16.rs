use crate::bom::ByteOrderMark;

pub const SURROGATE_LEAD_FIRST: u16 = 0xD800;
pub const SURROGATE_LEAD_LAST: u16 = 0xDBFF;
pub const SURROGATE_TRAIL_FIRST: u16 = 0xDC00;
pub const SURROGATE_TRAIL_LAST: u16 = 0xDFFF;
pub const SURROGATE_FIRST_VALUE: u32 = 0x10000;

/// Byte order of a UTF-16 stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    pub fn from_bom(bom: ByteOrderMark) -> Option<Endian> {
        match bom {
            ByteOrderMark::Utf16BigEndian => Some(Endian::Big),
            ByteOrderMark::Utf16LittleEndian => Some(Endian::Little),
            ByteOrderMark::Utf8 => None,
        }
    }

    pub fn read_unit(self, pair: [u8; 2]) -> u16 {
        match self {
            Endian::Big => u16::from_be_bytes(pair),
            Endian::Little => u16::from_le_bytes(pair),
        }
    }

    pub fn unit_bytes(self, unit: u16) -> [u8; 2] {
        match self {
            Endian::Big => unit.to_be_bytes(),
            Endian::Little => unit.to_le_bytes(),
        }
    }
}

pub fn is_lead_surrogate(unit: u16) -> bool {
    (SURROGATE_LEAD_FIRST..=SURROGATE_LEAD_LAST).contains(&unit)
}

pub fn is_trail_surrogate(unit: u16) -> bool {
    (SURROGATE_TRAIL_FIRST..=SURROGATE_TRAIL_LAST).contains(&unit)
}

/// Join a surrogate pair into the code point it encodes
pub fn combine_surrogates(lead: u16, trail: u16) -> u32 {
    ((u32::from(lead & 0x3FF) << 10) | u32::from(trail & 0x3FF)) + SURROGATE_FIRST_VALUE
}

/// Append `ch` as one code unit or a surrogate pair
pub fn push_char(out: &mut Vec<u8>, ch: char, endian: Endian) {
    let mut units = [0u16; 2];
    for &unit in ch.encode_utf16(&mut units).iter() {
        out.extend_from_slice(&endian.unit_bytes(unit));
    }
}
