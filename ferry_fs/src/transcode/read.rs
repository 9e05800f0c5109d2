//! Block-wise decoding of file bytes into UTF-8.

use crate::bom::ByteOrderMark;
use crate::encoding::utf16::{
    Endian, combine_surrogates, is_lead_surrogate, is_trail_surrogate,
};
use crate::encoding::utf8::{REPLACEMENT, push_code_point};

/// Converts successive blocks of a file into UTF-8.
///
/// The first block decides the encoding from its byte order mark. UTF-16 is
/// decoded unit by unit; a lead surrogate or an odd byte at the end of a
/// block is held back and joined with the next block, so block boundaries
/// can fall anywhere. Passing an empty block flushes what is held back.
#[derive(Debug)]
pub struct Reader {
    encoding: Option<ByteOrderMark>,
    first_read: bool,
    /// Undecoded tail of the previous block: an odd byte, a lead surrogate,
    /// or a lead surrogate followed by an odd byte.
    carry: Vec<u8>,
    out: Vec<u8>,
}

impl Reader {
    pub fn new() -> Self {
        Self {
            encoding: None,
            first_read: true,
            carry: Vec::with_capacity(3),
            out: Vec::new(),
        }
    }

    /// Mark found at the start of the stream, if any
    pub fn encoding(&self) -> Option<ByteOrderMark> {
        self.encoding
    }

    /// Bytes held back for the next call
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    /// Decode `block`, returning the UTF-8 produced by this call.
    ///
    /// Text without a byte order mark and UTF-8 text are passed through with
    /// only the mark removed.
    pub fn convert<'a>(&'a mut self, block: &'a [u8]) -> &'a [u8] {
        let mut skip = 0;
        if self.first_read && !block.is_empty() {
            self.first_read = false;
            self.encoding = ByteOrderMark::detect(block);
            skip = self.encoding.map_or(0, ByteOrderMark::len);
        }

        let Some(endian) = self.encoding.and_then(Endian::from_bom) else {
            return &block[skip..];
        };

        let body = &block[skip..];
        self.out.clear();
        self.out.reserve(body.len() + body.len() / 2 + 4);

        if self.carry.is_empty() {
            Self::decode_utf16(body, endian, &mut self.carry, &mut self.out);
        } else {
            let mut joined = std::mem::take(&mut self.carry);
            joined.extend_from_slice(body);
            Self::decode_utf16(&joined, endian, &mut self.carry, &mut self.out);
        }

        if body.is_empty() {
            self.flush(endian);
        }
        &self.out
    }

    /// Decode whole units of `input`, leaving an unfinished tail in `carry`.
    fn decode_utf16(input: &[u8], endian: Endian, carry: &mut Vec<u8>, out: &mut Vec<u8>) {
        carry.clear();
        let units = input.chunks_exact(2);
        let odd = units.remainder();
        let mut units = units.map(|pair| endian.read_unit([pair[0], pair[1]])).peekable();

        while let Some(unit) = units.next() {
            if !is_lead_surrogate(unit) {
                push_code_point(out, u32::from(unit));
                continue;
            }
            match units.peek() {
                Some(&trail) if is_trail_surrogate(trail) => {
                    units.next();
                    push_code_point(out, combine_surrogates(unit, trail));
                }
                // Unpaired lead followed by another unit: keep it visible
                Some(_) => push_code_point(out, u32::from(unit)),
                None => carry.extend_from_slice(&endian.unit_bytes(unit)),
            }
        }
        carry.extend_from_slice(odd);
    }

    /// Emit whatever is held back once the stream has ended.
    fn flush(&mut self, endian: Endian) {
        if self.carry.len() >= 2 {
            let unit = endian.read_unit([self.carry[0], self.carry[1]]);
            push_code_point(&mut self.out, u32::from(unit));
        }
        if self.carry.len() % 2 == 1 {
            self.out.extend_from_slice(&REPLACEMENT);
        }
        self.carry.clear();
    }
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}
