//! Huffman coding for the JPEG entropy layer.
//!
//! Decoding walks a packed binary tree built from the DHT code-length
//! histogram; encoding uses the canonical code table derived from the same
//! (bits, values) form. The default tables are the ITU T.81 Annex K set.

use super::bit_reader::BitReader;
use super::bits_of;
use crate::bits::BitWriterMsb;
use crate::error::{Error, Result};

/// Leaf marker in the packed tree: high bit set, symbol in the low byte.
const LEAF: u16 = 0x8000;

/// A canonical Huffman tree in packed-array form.
///
/// Each node is a pair of slots indexed by the next bit; a slot holds 0
/// (invalid code), a leaf, or the index of a child node.
pub struct HuffmanTree {
    nodes: Vec<[u16; 2]>,
}

impl HuffmanTree {
    /// Build from a DHT entry: sixteen code-length counts and the symbol
    /// list in code order.
    pub fn build(counts: &[u8; 16], symbols: &[u8]) -> Result<Self> {
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if total != symbols.len() || total > 256 {
            return Err(Error::MalformedStream(format!(
                "Huffman table with {} codes but {} symbols",
                total,
                symbols.len()
            )));
        }

        let mut tree = HuffmanTree {
            nodes: vec![[0u16; 2]],
        };
        let mut code = 0u32;
        let mut next = symbols.iter();
        for length in 1..=16u32 {
            for _ in 0..counts[length as usize - 1] {
                if code >= 1 << length {
                    return Err(Error::MalformedStream(
                        "overfull Huffman code space".to_string(),
                    ));
                }
                tree.insert(code, length, *next.next().unwrap())?;
                code += 1;
            }
            code <<= 1;
        }
        Ok(tree)
    }

    fn insert(&mut self, code: u32, length: u32, symbol: u8) -> Result<()> {
        let mut node = 0usize;
        for depth in 0..length {
            let bit = ((code >> (length - 1 - depth)) & 1) as usize;
            let slot = self.nodes[node][bit];
            if depth == length - 1 {
                if slot != 0 {
                    return Err(Error::MalformedStream(
                        "duplicate Huffman code".to_string(),
                    ));
                }
                self.nodes[node][bit] = LEAF | symbol as u16;
            } else {
                node = if slot == 0 {
                    self.nodes.push([0u16; 2]);
                    let child = (self.nodes.len() - 1) as u16;
                    self.nodes[node][bit] = child;
                    child as usize
                } else if slot & LEAF != 0 {
                    return Err(Error::MalformedStream(
                        "Huffman code prefix collision".to_string(),
                    ));
                } else {
                    slot as usize
                };
            }
        }
        Ok(())
    }

    /// Decode one symbol: descend left on 0, right on 1 until a leaf.
    pub fn decode(&self, reader: &mut BitReader) -> Result<u8> {
        let mut node = 0usize;
        loop {
            let bit = reader.read_bit()? as usize;
            let slot = self.nodes[node][bit];
            if slot == 0 {
                return Err(Error::MalformedStream("invalid Huffman code".to_string()));
            }
            if slot & LEAF != 0 {
                return Ok((slot & 0xFF) as u8);
            }
            node = slot as usize;
        }
    }
}

/// Canonical code table for the encoder, derived from (bits, values).
pub struct HuffmanEncTable {
    codes: [u16; 256],
    lengths: [u8; 256],
}

impl HuffmanEncTable {
    pub fn from_counts(bits: &[u8; 16], values: &[u8]) -> Self {
        let mut table = HuffmanEncTable {
            codes: [0; 256],
            lengths: [0; 256],
        };
        let mut code = 0u16;
        let mut index = 0usize;
        for (length, &count) in bits.iter().enumerate() {
            for _ in 0..count {
                let symbol = values[index] as usize;
                table.codes[symbol] = code;
                table.lengths[symbol] = length as u8 + 1;
                code += 1;
                index += 1;
            }
            code <<= 1;
        }
        table
    }

    #[inline]
    pub fn emit(&self, writer: &mut BitWriterMsb, symbol: u8) {
        let symbol = symbol as usize;
        debug_assert!(self.lengths[symbol] > 0, "symbol without a code");
        writer.write_bits(self.codes[symbol] as u32, self.lengths[symbol]);
    }
}

// Annex K default tables, as (code-length histogram, symbols).

pub const DC_LUMA_BITS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
pub const DC_LUMA_VALUES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

pub const DC_CHROMA_BITS: [u8; 16] = [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0];
pub const DC_CHROMA_VALUES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

pub const AC_LUMA_BITS: [u8; 16] = [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 0x7D];
pub const AC_LUMA_VALUES: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61,
    0x07, 0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08, 0x23, 0x42, 0xB1, 0xC1, 0x15, 0x52,
    0xD1, 0xF0, 0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x25,
    0x26, 0x27, 0x28, 0x29, 0x2A, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44, 0x45,
    0x46, 0x47, 0x48, 0x49, 0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63, 0x64,
    0x65, 0x66, 0x67, 0x68, 0x69, 0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0x83,
    0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99,
    0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6,
    0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3,
    0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE1, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8,
    0xE9, 0xEA, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA,
];

pub const AC_CHROMA_BITS: [u8; 16] = [0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 0x77];
pub const AC_CHROMA_VALUES: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21, 0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61,
    0x71, 0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91, 0xA1, 0xB1, 0xC1, 0x09, 0x23, 0x33,
    0x52, 0xF0, 0x15, 0x62, 0x72, 0xD1, 0x0A, 0x16, 0x24, 0x34, 0xE1, 0x25, 0xF1, 0x17, 0x18,
    0x19, 0x1A, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44,
    0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63,
    0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A,
    0x82, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97,
    0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4,
    0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA,
    0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7,
    0xE8, 0xE9, 0xEA, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA,
];

/// The four encoder tables.
pub struct HuffmanTables {
    pub dc_luma: HuffmanEncTable,
    pub ac_luma: HuffmanEncTable,
    pub dc_chroma: HuffmanEncTable,
    pub ac_chroma: HuffmanEncTable,
}

impl Default for HuffmanTables {
    fn default() -> Self {
        HuffmanTables {
            dc_luma: HuffmanEncTable::from_counts(&DC_LUMA_BITS, &DC_LUMA_VALUES),
            ac_luma: HuffmanEncTable::from_counts(&AC_LUMA_BITS, &AC_LUMA_VALUES),
            dc_chroma: HuffmanEncTable::from_counts(&DC_CHROMA_BITS, &DC_CHROMA_VALUES),
            ac_chroma: HuffmanEncTable::from_counts(&AC_CHROMA_BITS, &AC_CHROMA_VALUES),
        }
    }
}

/// Entropy-code one quantized block (zig-zag order) against the running DC
/// predictor; returns the block's DC value for the next prediction.
pub fn encode_block(
    writer: &mut BitWriterMsb,
    zz: &[i16; 64],
    prev_dc: i16,
    is_luma: bool,
    tables: &HuffmanTables,
) -> i16 {
    let (dc_table, ac_table) = if is_luma {
        (&tables.dc_luma, &tables.ac_luma)
    } else {
        (&tables.dc_chroma, &tables.ac_chroma)
    };

    let dc = zz[0];
    let diff = dc - prev_dc;
    let ssss = bits_of(diff);
    dc_table.emit(writer, ssss);
    if ssss > 0 {
        writer.write_bits(magnitude_bits(diff, ssss), ssss);
    }

    let mut zero_run = 0usize;
    for &ac in &zz[1..] {
        if ac == 0 {
            zero_run += 1;
            continue;
        }
        while zero_run >= 16 {
            ac_table.emit(writer, 0xF0); // ZRL
            zero_run -= 16;
        }
        let ssss = bits_of(ac);
        ac_table.emit(writer, ((zero_run as u8) << 4) | ssss);
        writer.write_bits(magnitude_bits(ac, ssss), ssss);
        zero_run = 0;
    }
    if zero_run > 0 {
        ac_table.emit(writer, 0x00); // EOB
    }

    dc
}

/// The magnitude-coded low bits of `value`: negatives are offset by one so a
/// leading 0 bit means negative.
#[inline]
fn magnitude_bits(value: i16, ssss: u8) -> u32 {
    let bits = if value < 0 { value - 1 } else { value } as u16;
    (bits & ((1u32 << ssss) - 1) as u16) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables_have_consistent_counts() {
        let total: usize = AC_LUMA_BITS.iter().map(|&c| c as usize).sum();
        assert_eq!(total, AC_LUMA_VALUES.len());
        let total: usize = AC_CHROMA_BITS.iter().map(|&c| c as usize).sum();
        assert_eq!(total, AC_CHROMA_VALUES.len());
    }

    #[test]
    fn tree_decodes_what_table_encodes() {
        let tree = HuffmanTree::build(&AC_LUMA_BITS, &AC_LUMA_VALUES).unwrap();
        let table = HuffmanEncTable::from_counts(&AC_LUMA_BITS, &AC_LUMA_VALUES);

        let mut writer = BitWriterMsb::new();
        let symbols = [0x00u8, 0x01, 0xF0, 0x7A, 0x11, 0xFA];
        for &s in &symbols {
            table.emit(&mut writer, s);
        }
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        for &s in &symbols {
            assert_eq!(tree.decode(&mut reader).unwrap(), s);
        }
    }

    #[test]
    fn dc_luma_shortest_code_is_two_bits() {
        // Annex K: symbol 0 gets code 00 at length 2.
        let table = HuffmanEncTable::from_counts(&DC_LUMA_BITS, &DC_LUMA_VALUES);
        assert_eq!(table.lengths[0], 2);
        assert_eq!(table.codes[0], 0);
    }

    #[test]
    fn overfull_histogram_is_rejected() {
        let mut counts = [0u8; 16];
        counts[0] = 3; // three 1-bit codes cannot exist
        let symbols = [1u8, 2, 3];
        assert!(HuffmanTree::build(&counts, &symbols).is_err());
    }

    #[test]
    fn symbol_count_mismatch_is_rejected() {
        let mut counts = [0u8; 16];
        counts[1] = 2;
        assert!(HuffmanTree::build(&counts, &[7]).is_err());
    }

    #[test]
    fn invalid_code_path_errors() {
        // Single 1-bit code "0"; the path "1..." is unassigned.
        let mut counts = [0u8; 16];
        counts[0] = 1;
        let tree = HuffmanTree::build(&counts, &[0x42]).unwrap();
        let mut reader = BitReader::new(&[0xFF, 0x00]);
        assert!(tree.decode(&mut reader).is_err());
    }

    #[test]
    fn magnitude_bits_follow_t81() {
        // value 5, ssss 3 -> 101; value -5 -> 010
        assert_eq!(magnitude_bits(5, 3), 0b101);
        assert_eq!(magnitude_bits(-5, 3), 0b010);
        assert_eq!(magnitude_bits(1, 1), 1);
        assert_eq!(magnitude_bits(-1, 1), 0);
    }
}
