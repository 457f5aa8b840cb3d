use crate::error::{Error, Result};
use crate::marker::Marker;
use byteorder::ReadBytesExt;
use std::io::Read;
use std::iter::repeat;

const LUT_BITS: u8 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HuffmanTableClass {
    DC,
    AC,
}

pub struct HuffmanTable {
    values: Vec<u8>,
    value_offset: [i32; 16],
    maxcode: [i32; 16],
    lut: [(u8, u8); 1 << LUT_BITS],
    fast_ac: Option<[i16; 1 << LUT_BITS]>,
}

impl HuffmanTable {
    pub fn new(bits: &[u8; 16], values: &[u8], class: HuffmanTableClass) -> Result<HuffmanTable> {
        let (huffcode, huffsize) = derive_huffman_codes(bits)?;

        // Section F.2.2.3
        // Figure F.15

        // value_offset[i] is set to VALPTR(I) - MINCODE(I).
        let mut value_offset = [0i32; 16];
        let mut maxcode = [-1i32; 16];
        let mut j = 0;

        for i in 0..16 {
            if bits[i] != 0 {
                value_offset[i] = j as i32 - huffcode[j] as i32;
                j += bits[i] as usize;
                maxcode[i] = huffcode[j - 1] as i32;
            }
        }

        // Build a lookup table for faster decoding.
        let mut lut = [(0u8, 0u8); 1 << LUT_BITS];

        for (i, &value) in values
            .iter()
            .enumerate()
            .filter(|&(i, _)| huffsize[i] <= LUT_BITS)
        {
            let bits_remaining = LUT_BITS - huffsize[i];
            let start = (huffcode[i] << bits_remaining) as usize;

            for b in 0..1usize << bits_remaining {
                lut[start + b] = (value, huffsize[i]);
            }
        }

        // Build a lookup table for small AC coefficients which both decodes
        // the Huffman code and sign-extends the following value bits in one
        // step.
        let mut fast_ac = None;

        if class == HuffmanTableClass::AC {
            let mut table = [0i16; 1 << LUT_BITS];

            for (i, &(value, size)) in lut.iter().enumerate() {
                let run_length = value >> 4;
                let magnitude_category = value & 0x0f;

                if magnitude_category > 0 && size + magnitude_category <= LUT_BITS {
                    let unextended_ac_value = (((i << size) & ((1 << LUT_BITS) - 1))
                        >> (LUT_BITS - magnitude_category)) as u16;
                    let ac_value = extend(unextended_ac_value as i32, magnitude_category);

                    if ac_value >= -128 && ac_value <= 127 {
                        table[i] = ((ac_value as i16) << 8)
                            | ((run_length as i16) << 4)
                            | (size + magnitude_category) as i16;
                    }
                }
            }

            fast_ac = Some(table);
        }

        Ok(HuffmanTable {
            values: values.to_vec(),
            value_offset,
            maxcode,
            lut,
            fast_ac,
        })
    }
}

fn derive_huffman_codes(bits: &[u8; 16]) -> Result<(Vec<u16>, Vec<u8>)> {
    // Figure C.1
    let huffsize = bits
        .iter()
        .enumerate()
        .fold(Vec::new(), |mut acc, (i, &value)| {
            acc.extend(repeat((i + 1) as u8).take(value as usize));
            acc
        });

    // Figure C.2
    let mut huffcode = vec![0u16; huffsize.len()];
    let mut code_size = *huffsize.first().unwrap_or(&0);
    let mut code = 0u16;

    for (i, &size) in huffsize.iter().enumerate() {
        while code_size < size {
            code <<= 1;
            code_size += 1;
        }

        if code as u32 >= 1u32 << code_size {
            return Err(Error::Format("bad huffman code length".to_owned()));
        }

        huffcode[i] = code;
        code += 1;
    }

    Ok((huffcode, huffsize))
}

// Section F.2.2.1
// Figure F.12
fn extend(value: i32, count: u8) -> i32 {
    if value < 1 << (count as i32 - 1) {
        value + (-1 << count as i32) + 1
    } else {
        value
    }
}

#[derive(Debug)]
pub struct HuffmanDecoder {
    bits: u32,
    num_bits: u8,
    marker: Option<Marker>,
}

impl HuffmanDecoder {
    pub fn new() -> HuffmanDecoder {
        HuffmanDecoder {
            bits: 0,
            num_bits: 0,
            marker: None,
        }
    }

    /// Takes the marker that terminated the entropy-coded data, if one was
    /// encountered while refilling the bit buffer.
    pub fn take_marker(&mut self) -> Option<Marker> {
        self.marker.take()
    }

    pub fn reset(&mut self) {
        self.bits = 0;
        self.num_bits = 0;
    }

    // Section F.2.2.3
    // Figure F.16
    pub fn decode<R: Read>(&mut self, reader: &mut R, table: &HuffmanTable) -> Result<u8> {
        if self.num_bits < 16 {
            self.read_bits(reader)?;
        }

        let index = (self.bits >> (32 - LUT_BITS)) as usize;
        let (value, size) = table.lut[index];

        if size > 0 {
            self.consume_bits(size);
            return Ok(value);
        }

        let mut code = 0i32;

        for i in 0..16 {
            code |= self.next_bit() as i32;

            if code <= table.maxcode[i] {
                let index = code + table.value_offset[i];
                return Ok(table.values[index as usize]);
            }

            code <<= 1;
        }

        Err(Error::Data("failed to decode huffman code".to_owned()))
    }

    pub fn decode_fast_ac<R: Read>(
        &mut self,
        reader: &mut R,
        table: &HuffmanTable,
    ) -> Result<Option<(i16, u8)>> {
        if let Some(ref fast_ac) = table.fast_ac {
            if self.num_bits < LUT_BITS {
                self.read_bits(reader)?;
            }

            let index = (self.bits >> (32 - LUT_BITS)) as usize;
            let value = fast_ac[index];

            if value != 0 {
                let run = ((value >> 4) & 0x0f) as u8;
                let size = (value & 0x0f) as u8;

                self.consume_bits(size);
                return Ok(Some((value >> 8, run)));
            }
        }

        Ok(None)
    }

    // Section F.2.2.4
    // Figure F.17
    pub fn receive<R: Read>(&mut self, reader: &mut R, count: u8) -> Result<u32> {
        if self.num_bits < count {
            self.read_bits(reader)?;

            if self.num_bits < count {
                return Err(Error::Data(
                    "not enough bits in entropy-coded data".to_owned(),
                ));
            }
        }

        let value = self.bits >> (32 - count);
        self.consume_bits(count);

        Ok(value)
    }

    pub fn receive_extend<R: Read>(&mut self, reader: &mut R, count: u8) -> Result<i32> {
        let value = self.receive(reader, count)? as i32;
        Ok(extend(value, count))
    }

    pub fn get_bit<R: Read>(&mut self, reader: &mut R) -> Result<u8> {
        if self.num_bits == 0 {
            self.read_bits(reader)?;

            if self.num_bits == 0 {
                return Err(Error::Data(
                    "not enough bits in entropy-coded data".to_owned(),
                ));
            }
        }

        Ok(self.next_bit())
    }

    // Section F.2.2.5
    // Figure F.18
    #[inline]
    fn next_bit(&mut self) -> u8 {
        let bit = (self.bits >> 31) as u8;
        self.consume_bits(1);

        bit
    }

    fn read_bits<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        while self.num_bits < 25 {
            // Fill with zero bits once a marker has been reached.
            let byte = match self.marker {
                Some(_) => 0,
                None => reader.read_u8()?,
            };

            if byte == 0xFF {
                let mut next_byte = reader.read_u8()?;

                // Check for byte stuffing.
                if next_byte != 0x00 {
                    // We seem to have reached the end of entropy-coded data and
                    // encountered a marker. Since we can't put data back into
                    // the reader, we have to continue reading to identify the
                    // marker so we can pass it on.

                    // Section B.1.1.2
                    // "Any marker may optionally be preceded by any number of
                    // fill bytes, which are bytes assigned code X'FF'."
                    while next_byte == 0xFF {
                        next_byte = reader.read_u8()?;
                    }

                    if next_byte == 0x00 {
                        return Err(Error::Format(
                            "FF 00 found where marker was expected".to_owned(),
                        ));
                    }

                    self.marker = Marker::from_u8(next_byte);
                    continue;
                }
            }

            self.bits |= (byte as u32) << (24 - self.num_bits);
            self.num_bits += 8;
        }

        Ok(())
    }

    #[inline]
    fn consume_bits(&mut self, count: u8) {
        debug_assert!(self.num_bits >= count);

        self.bits <<= count;
        self.num_bits -= count;
    }
}

#[cfg(test)]
mod tests {
    use super::{extend, HuffmanDecoder, HuffmanTable, HuffmanTableClass};
    use std::io::Cursor;

    #[test]
    fn extend_implements_figure_f12() {
        assert_eq!(extend(0, 1), -1);
        assert_eq!(extend(1, 1), 1);
        assert_eq!(extend(0b011, 3), -4);
        assert_eq!(extend(0b100, 3), 4);
        assert_eq!(extend(0b111, 3), 7);
        assert_eq!(extend(0, 8), -255);
    }

    #[test]
    fn decode_matches_code_assignment() {
        // Codes: 0 -> "0", 1 -> "10", 2 -> "110".
        let mut bits = [0u8; 16];
        bits[0] = 1;
        bits[1] = 1;
        bits[2] = 1;
        let table = HuffmanTable::new(&bits, &[0, 1, 2], HuffmanTableClass::DC).unwrap();

        // "0 10 110" padded with ones.
        let mut reader = Cursor::new(vec![0b0101_1011u8, 0xFF, 0x00, 0xFF, 0x00, 0xFF, 0x00]);
        let mut decoder = HuffmanDecoder::new();

        assert_eq!(decoder.decode(&mut reader, &table).unwrap(), 0);
        assert_eq!(decoder.decode(&mut reader, &table).unwrap(), 1);
        assert_eq!(decoder.decode(&mut reader, &table).unwrap(), 2);
    }

    #[test]
    fn oversubscribed_table_is_rejected() {
        let mut bits = [0u8; 16];
        bits[0] = 3;
        assert!(HuffmanTable::new(&bits, &[0, 1, 2], HuffmanTableClass::DC).is_err());
    }

    #[test]
    fn receive_reads_raw_bits() {
        let mut reader = Cursor::new(vec![0b1011_0001u8, 0xFF, 0x00, 0xFF, 0x00, 0xFF, 0x00]);
        let mut decoder = HuffmanDecoder::new();

        assert_eq!(decoder.receive(&mut reader, 3).unwrap(), 0b101);
        assert_eq!(decoder.receive_extend(&mut reader, 3).unwrap(), // "100"
                   4);
        assert_eq!(decoder.get_bit(&mut reader).unwrap(), 0);
        assert_eq!(decoder.get_bit(&mut reader).unwrap(), 1);
    }
}
