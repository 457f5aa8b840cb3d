use crate::encoder::component::Component;
use crate::encoder::huffman::{CodingClass, HuffmanTable};
use crate::encoder::quantization::QuantizationTable;
use crate::error::Result;
use crate::marker::Marker;
use byteorder::{BigEndian, WriteBytesExt};
use std::io::Write;

/// Writes the marker-segment structure of a JFIF file, together with the
/// entropy-coded bit layer with its 0xFF byte stuffing.
pub struct JfifWriter<W> {
    writer: W,

    bit_buffer: u32,
    bit_count: u8,
}

impl<W: Write> JfifWriter<W> {
    pub fn new(writer: W) -> JfifWriter<W> {
        JfifWriter {
            writer,
            bit_buffer: 0,
            bit_count: 0,
        }
    }

    pub fn write_marker(&mut self, marker: Marker) -> Result<()> {
        debug_assert_eq!(self.bit_count, 0, "marker written into entropy-coded data");

        self.writer.write_u8(0xFF)?;
        self.writer.write_u8(marker.to_u8())?;
        Ok(())
    }

    pub fn write_segment(&mut self, marker: Marker, data: &[u8]) -> Result<()> {
        self.write_marker(marker)?;
        self.writer.write_u16::<BigEndian>(data.len() as u16 + 2)?;
        self.writer.write_all(data)?;
        Ok(())
    }

    /// JFIF APP0 segment, version 1.1, aspect ratio 1:1.
    pub fn write_jfif_header(&mut self) -> Result<()> {
        self.write_segment(
            Marker::APP(0),
            &[
                b'J', b'F', b'I', b'F', 0x00, // identifier
                0x01, 0x01, // version
                0x00, // density unit: none
                0x00, 0x01, 0x00, 0x01, // density 1x1
                0x00, 0x00, // no thumbnail
            ],
        )
    }

    pub fn write_dqt(&mut self, index: u8, table: &QuantizationTable) -> Result<()> {
        let mut data = Vec::with_capacity(65);

        // Precision 0 (8 bit), table entries in zigzag order.
        data.push(index);
        for i in 0..64 {
            data.push(table.get(i));
        }

        self.write_segment(Marker::DQT, &data)
    }

    pub fn write_dht(&mut self, class: CodingClass, index: u8, table: &HuffmanTable) -> Result<()> {
        let mut data = Vec::with_capacity(17 + table.values().len());

        data.push((class as u8) << 4 | index);
        data.extend_from_slice(table.bits());
        data.extend_from_slice(table.values());

        self.write_segment(Marker::DHT, &data)
    }

    pub fn write_dri(&mut self, restart_interval: u16) -> Result<()> {
        self.write_marker(Marker::DRI)?;
        self.writer.write_u16::<BigEndian>(4)?;
        self.writer.write_u16::<BigEndian>(restart_interval)?;
        Ok(())
    }

    /// Section B.2.2. `sof` is 0 for baseline sequential and 2 for
    /// progressive frames.
    pub fn write_frame_header(
        &mut self,
        sof: u8,
        width: u16,
        height: u16,
        components: &[Component],
    ) -> Result<()> {
        self.write_marker(Marker::SOF(sof))?;

        self.writer
            .write_u16::<BigEndian>(8 + 3 * components.len() as u16)?;
        self.writer.write_u8(8)?; // sample precision
        self.writer.write_u16::<BigEndian>(height)?;
        self.writer.write_u16::<BigEndian>(width)?;
        self.writer.write_u8(components.len() as u8)?;

        for component in components {
            self.writer.write_u8(component.id)?;
            self.writer.write_u8(
                component.horizontal_sampling_factor << 4 | component.vertical_sampling_factor,
            )?;
            self.writer.write_u8(component.quantization_table)?;
        }

        Ok(())
    }

    /// Section B.2.3.
    pub fn write_scan_header(
        &mut self,
        components: &[&Component],
        spectral_selection: (u8, u8),
        successive_approximation: (u8, u8),
    ) -> Result<()> {
        self.write_marker(Marker::SOS)?;

        self.writer
            .write_u16::<BigEndian>(6 + 2 * components.len() as u16)?;
        self.writer.write_u8(components.len() as u8)?;

        for component in components {
            self.writer.write_u8(component.id)?;
            self.writer
                .write_u8(component.dc_huffman_table << 4 | component.ac_huffman_table)?;
        }

        self.writer.write_u8(spectral_selection.0)?;
        self.writer.write_u8(spectral_selection.1)?;
        self.writer
            .write_u8(successive_approximation.0 << 4 | successive_approximation.1)?;

        Ok(())
    }

    /// Appends `count` bits to the entropy-coded data, most significant bit
    /// first. `count` must be at most 16.
    #[inline]
    pub fn write_bits(&mut self, bits: u16, count: u8) -> Result<()> {
        debug_assert!(count <= 16);

        self.bit_buffer = (self.bit_buffer << count) | bits as u32;
        self.bit_count += count;

        while self.bit_count >= 8 {
            let byte = (self.bit_buffer >> (self.bit_count - 8)) as u8;
            self.writer.write_u8(byte)?;

            // Section B.1.1.5: a 0xFF data byte is followed by a stuffed zero
            // byte so it cannot be mistaken for a marker.
            if byte == 0xFF {
                self.writer.write_u8(0x00)?;
            }

            self.bit_count -= 8;
        }

        self.bit_buffer &= (1 << self.bit_count) - 1;

        Ok(())
    }

    pub fn write_code(&mut self, table: &HuffmanTable, symbol: u8) -> Result<()> {
        let (code, size) = table.code(symbol);
        self.write_bits(code, size)
    }

    /// Pads the final partial byte with 1-bits and empties the bit buffer.
    pub fn finalize_bit_buffer(&mut self) -> Result<()> {
        if self.bit_count > 0 {
            let padding = 8 - self.bit_count;
            self.write_bits((1 << padding) - 1, padding)?;
        }

        debug_assert_eq!(self.bit_count, 0);
        self.bit_buffer = 0;

        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Returns the magnitude category of `value` and its low-order bits as
/// emitted after the Huffman code (section F.1.2.1, Table F.1).
#[inline]
pub fn magnitude(value: i16) -> (u8, u16) {
    let size = (16 - value.unsigned_abs().leading_zeros()) as u8;

    // Negative values are encoded as value - 1 truncated to `size` bits,
    // which is the one's complement of the absolute value.
    let bits = if value < 0 {
        (value as i32 - 1) as u16 & (((1u32 << size) - 1) as u16)
    } else {
        value as u16
    };

    (size, bits)
}
