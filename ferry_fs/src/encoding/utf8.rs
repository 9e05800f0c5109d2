/// Number of bytes looked at before a block boundary when searching for the
/// start of a character.
pub const REALIGN_WINDOW: usize = 5;

/// Replacement sequence for U+FFFD.
pub const REPLACEMENT: [u8; 3] = [0xEF, 0xBF, 0xBD];

/// Whether `b` continues a multi-byte UTF-8 sequence (10xxxxxx)
pub fn is_trail_byte(b: u8) -> bool {
    b & 0xC0 == 0x80
}

/// Append `code_point` in UTF-8 form.
///
/// Follows the standard length rules for any value up to 0x10FFFF,
/// including lone surrogates, which become three-byte sequences so that
/// they survive a round trip instead of disappearing.
pub fn push_code_point(out: &mut Vec<u8>, code_point: u32) {
    if code_point < 0x80 {
        out.push(code_point as u8);
    } else if code_point < 0x800 {
        out.push(0xC0 | (code_point >> 6) as u8);
        out.push(0x80 | (code_point & 0x3F) as u8);
    } else if code_point < 0x10000 {
        out.push(0xE0 | (code_point >> 12) as u8);
        out.push(0x80 | ((code_point >> 6) & 0x3F) as u8);
        out.push(0x80 | (code_point & 0x3F) as u8);
    } else {
        out.push(0xF0 | (code_point >> 18) as u8);
        out.push(0x80 | ((code_point >> 12) & 0x3F) as u8);
        out.push(0x80 | ((code_point >> 6) & 0x3F) as u8);
        out.push(0x80 | (code_point & 0x3F) as u8);
    }
}

/// Shorten a block so it does not end inside a multi-byte character.
///
/// `bytes[start..start + len]` is the candidate block. If the byte just past
/// it continues a character, the block is cut back to where that character
/// starts. At most [`REALIGN_WINDOW`] bytes are examined; a longer run of
/// trail bytes is not valid UTF-8 and the block is left as it is.
pub fn realign_block(bytes: &[u8], start: usize, len: usize) -> usize {
    let end = start + len;
    if len == 0 || end >= bytes.len() {
        return len;
    }
    let mut cut = len;
    while cut > 0 && len - cut < REALIGN_WINDOW + 1 && is_trail_byte(bytes[start + cut]) {
        cut -= 1;
    }
    if cut > 0 && len - cut < REALIGN_WINDOW { cut } else { len }
}
