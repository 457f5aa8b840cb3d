use crate::error::{Error, Result};

/// Huffman table class, as written to the DHT segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodingClass {
    Dc = 0,
    Ac = 1,
}

/// An encoder-side Huffman table: the BITS/HUFFVAL specification written to
/// the DHT segment, plus a symbol-indexed code lookup derived from it.
pub struct HuffmanTable {
    bits: [u8; 16],
    values: Vec<u8>,

    codes: [u16; 256],
    sizes: [u8; 256],
}

impl HuffmanTable {
    pub fn new(bits: [u8; 16], values: Vec<u8>) -> Result<HuffmanTable> {
        // Section C.2, Figures C.1 to C.3
        let mut codes = [0u16; 256];
        let mut sizes = [0u8; 256];

        let mut code = 0u16;
        let mut value_index = 0;

        for (size_minus_one, &count) in bits.iter().enumerate() {
            let size = size_minus_one as u8 + 1;

            for _ in 0..count {
                if code as u32 >= 1u32 << size {
                    return Err(Error::Format("bad huffman code length".to_owned()));
                }

                let symbol = values[value_index] as usize;
                codes[symbol] = code;
                sizes[symbol] = size;

                code += 1;
                value_index += 1;
            }

            code <<= 1;
        }

        Ok(HuffmanTable {
            bits,
            values,
            codes,
            sizes,
        })
    }

    /// The BITS list: number of codes of each length 1 to 16.
    pub fn bits(&self) -> &[u8; 16] {
        &self.bits
    }

    /// The HUFFVAL list: symbol values in order of increasing code length.
    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Returns the code assigned to `symbol` and its length in bits.
    #[inline]
    pub fn code(&self, symbol: u8) -> (u16, u8) {
        let size = self.sizes[symbol as usize];
        debug_assert!(size > 0, "no code assigned to symbol {:#04x}", symbol);
        (self.codes[symbol as usize], size)
    }

    /// Builds an optimal table from observed symbol frequencies, following
    /// the procedure of ISO/IEC 10918-1, Annex K.2.
    pub fn new_optimized(mut frequencies: [u32; 257]) -> HuffmanTable {
        // The reserved symbol 256 is given frequency 1 so that no real symbol
        // is assigned a code of all ones.
        frequencies[256] = 1;

        let mut code_size = [0u32; 257];
        let mut others = [-1i32; 257];

        // Figure K.1: repeatedly merge the two least probable chains. On a
        // tie, the higher symbol index is picked.
        loop {
            let mut v1: i32 = -1;
            let mut least = u32::MAX;
            for (i, &freq) in frequencies.iter().enumerate() {
                if freq > 0 && freq <= least {
                    least = freq;
                    v1 = i as i32;
                }
            }

            let mut v2: i32 = -1;
            let mut least = u32::MAX;
            for (i, &freq) in frequencies.iter().enumerate() {
                if freq > 0 && freq <= least && i as i32 != v1 {
                    least = freq;
                    v2 = i as i32;
                }
            }

            if v2 < 0 {
                break;
            }

            frequencies[v1 as usize] += frequencies[v2 as usize];
            frequencies[v2 as usize] = 0;

            code_size[v1 as usize] += 1;
            while others[v1 as usize] >= 0 {
                v1 = others[v1 as usize];
                code_size[v1 as usize] += 1;
            }

            others[v1 as usize] = v2;

            code_size[v2 as usize] += 1;
            while others[v2 as usize] >= 0 {
                v2 = others[v2 as usize];
                code_size[v2 as usize] += 1;
            }
        }

        // Figure K.2: count codes of each length.
        let mut bit_counts = [0u8; 33];
        for &size in code_size.iter() {
            if size > 0 {
                bit_counts[size.min(32) as usize] += 1;
            }
        }

        // Figure K.3: rebalance code lengths longer than 16 bits by moving
        // pairs of long codes up the tree.
        for i in (17..=32).rev() {
            while bit_counts[i] > 0 {
                let mut j = i - 2;
                while bit_counts[j] == 0 {
                    j -= 1;
                }

                bit_counts[i] -= 2;
                bit_counts[i - 1] += 1;
                bit_counts[j + 1] += 2;
                bit_counts[j] -= 1;
            }
        }

        // Remove the code reserved for symbol 256. If no real symbol was
        // ever recorded, no codes were assigned at all and the table stays
        // empty.
        if code_size[256] > 0 {
            let mut i = 16;
            while bit_counts[i] == 0 {
                i -= 1;
            }
            bit_counts[i] -= 1;
        }

        let mut bits = [0u8; 16];
        bits.copy_from_slice(&bit_counts[1..17]);

        // Figure K.4: sort real symbols by code length, then by value.
        let mut values = Vec::new();
        for size in 1..=32 {
            for symbol in 0u16..256 {
                if code_size[symbol as usize] == size {
                    values.push(symbol as u8);
                }
            }
        }

        debug_assert_eq!(values.len(), bits.iter().map(|&b| b as usize).sum::<usize>());

        // The table was derived from a valid frequency distribution, so
        // rebuilding the codes cannot fail.
        HuffmanTable::new(bits, values).unwrap()
    }

    // Annex K.3, typical tables for 8-bit precision.

    pub fn default_luma_dc() -> HuffmanTable {
        HuffmanTable::new(
            [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        )
        .unwrap()
    }

    pub fn default_chroma_dc() -> HuffmanTable {
        HuffmanTable::new(
            [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0],
            vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        )
        .unwrap()
    }

    pub fn default_luma_ac() -> HuffmanTable {
        HuffmanTable::new(
            [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 0x7D],
            vec![
                0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06, 0x13,
                0x51, 0x61, 0x07, 0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08, 0x23, 0x42,
                0xB1, 0xC1, 0x15, 0x52, 0xD1, 0xF0, 0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A,
                0x16, 0x17, 0x18, 0x19, 0x1A, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x34, 0x35,
                0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4A,
                0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63, 0x64, 0x65, 0x66, 0x67,
                0x68, 0x69, 0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0x83, 0x84,
                0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98,
                0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xB2, 0xB3,
                0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7,
                0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE1,
                0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xF1, 0xF2, 0xF3, 0xF4,
                0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA,
            ],
        )
        .unwrap()
    }

    pub fn default_chroma_ac() -> HuffmanTable {
        HuffmanTable::new(
            [0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 0x77],
            vec![
                0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21, 0x31, 0x06, 0x12, 0x41, 0x51,
                0x07, 0x61, 0x71, 0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91, 0xA1, 0xB1,
                0xC1, 0x09, 0x23, 0x33, 0x52, 0xF0, 0x15, 0x62, 0x72, 0xD1, 0x0A, 0x16, 0x24,
                0x34, 0xE1, 0x25, 0xF1, 0x17, 0x18, 0x19, 0x1A, 0x26, 0x27, 0x28, 0x29, 0x2A,
                0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
                0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63, 0x64, 0x65, 0x66,
                0x67, 0x68, 0x69, 0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0x82,
                0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x92, 0x93, 0x94, 0x95, 0x96,
                0x97, 0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9, 0xAA,
                0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5,
                0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9,
                0xDA, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xF2, 0xF3, 0xF4,
                0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA,
            ],
        )
        .unwrap()
    }
}

/// Symbol frequency accumulator for optimal table construction.
#[derive(Clone)]
pub struct FrequencyTable {
    frequencies: [u32; 257],
}

impl FrequencyTable {
    pub fn new() -> FrequencyTable {
        FrequencyTable {
            frequencies: [0; 257],
        }
    }

    #[inline]
    pub fn record(&mut self, symbol: u8) {
        self.frequencies[symbol as usize] += 1;
    }

    pub fn build(&self) -> HuffmanTable {
        HuffmanTable::new_optimized(self.frequencies)
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        FrequencyTable::new()
    }
}
