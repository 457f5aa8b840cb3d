use crate::encoder::fdct::transform_block;
use crate::encoder::huffman::{FrequencyTable, HuffmanTable};
use crate::encoder::quantization::QuantizationTable;
use crate::encoder::writer::{magnitude, JfifWriter};
use crate::error::Result;
use crate::marker::Marker;
use crate::parser::Dimensions;
use std::io::Write;
use std::mem;

/// A frame component on the encoding side, owning its quantized coefficient
/// blocks.
pub struct Component {
    pub id: u8,

    pub horizontal_sampling_factor: u8,
    pub vertical_sampling_factor: u8,

    pub quantization_table: u8,
    pub dc_huffman_table: u8,
    pub ac_huffman_table: u8,

    /// The dimensions of the component, in samples.
    pub size: Dimensions,
    /// The dimensions of the component, in 8x8 blocks, padded to a whole
    /// number of MCUs.
    pub block_size: Dimensions,

    /// Quantized DCT coefficients in zigzag order, one entry per block of
    /// the padded grid, in block-row-major order.
    pub blocks: Vec<[i16; 64]>,
}

impl Component {
    pub fn new(
        id: u8,
        sampling_factors: (u8, u8),
        quantization_table: u8,
        huffman_tables: u8,
    ) -> Component {
        Component {
            id,
            horizontal_sampling_factor: sampling_factors.0,
            vertical_sampling_factor: sampling_factors.1,
            quantization_table,
            dc_huffman_table: huffman_tables,
            ac_huffman_table: huffman_tables,
            size: Dimensions {
                width: 0,
                height: 0,
            },
            block_size: Dimensions {
                width: 0,
                height: 0,
            },
            blocks: Vec::new(),
        }
    }

    // Section A.1.1
    pub fn update_size(&mut self, image_size: Dimensions, h_max: u8, v_max: u8) {
        let ceil_div = |a: u32, b: u32| ((a + b - 1) / b) as u16;

        self.size = Dimensions {
            width: ceil_div(
                image_size.width as u32 * self.horizontal_sampling_factor as u32,
                h_max as u32,
            ),
            height: ceil_div(
                image_size.height as u32 * self.vertical_sampling_factor as u32,
                v_max as u32,
            ),
        };

        let mcu_cols = ceil_div(image_size.width as u32, h_max as u32 * 8);
        let mcu_rows = ceil_div(image_size.height as u32, v_max as u32 * 8);

        self.block_size = Dimensions {
            width: mcu_cols * self.horizontal_sampling_factor as u16,
            height: mcu_rows * self.vertical_sampling_factor as u16,
        };
    }

    /// Downsamples the full-resolution plane to this component's sampling
    /// grid, then transforms and quantizes every block of the padded grid.
    /// Blocks extending past the component edge replicate the border samples.
    pub fn build_blocks(
        &mut self,
        plane: &[u8],
        image_size: Dimensions,
        h_max: u8,
        v_max: u8,
        table: &QuantizationTable,
    ) {
        let h_scale = (h_max / self.horizontal_sampling_factor) as usize;
        let v_scale = (v_max / self.vertical_sampling_factor) as usize;

        let samples = if h_scale == 1 && v_scale == 1 {
            plane.to_vec()
        } else {
            downsample(plane, image_size, self.size, h_scale, v_scale)
        };

        let width = self.size.width as usize;
        let height = self.size.height as usize;

        self.blocks.clear();
        self.blocks
            .reserve(self.block_size.width as usize * self.block_size.height as usize);

        for block_y in 0..self.block_size.height as usize {
            for block_x in 0..self.block_size.width as usize {
                let mut block = [0.0f32; 64];

                for y in 0..8 {
                    let sample_y = (block_y * 8 + y).min(height - 1);

                    for x in 0..8 {
                        let sample_x = (block_x * 8 + x).min(width - 1);
                        block[y * 8 + x] = samples[sample_y * width + sample_x] as f32 - 128.0;
                    }
                }

                self.blocks.push(transform_block(&block, table));
            }
        }
    }

    #[inline]
    pub fn block(&self, block_x: usize, block_y: usize) -> &[i16; 64] {
        &self.blocks[block_y * self.block_size.width as usize + block_x]
    }
}

/// Averages `h_scale` x `v_scale` windows of the plane, replicating edge
/// samples where a window extends past the image.
fn downsample(
    plane: &[u8],
    image_size: Dimensions,
    output_size: Dimensions,
    h_scale: usize,
    v_scale: usize,
) -> Vec<u8> {
    let input_width = image_size.width as usize;
    let input_height = image_size.height as usize;
    let output_width = output_size.width as usize;
    let output_height = output_size.height as usize;

    let window = (h_scale * v_scale) as u32;
    let mut output = vec![0u8; output_width * output_height];

    for y in 0..output_height {
        for x in 0..output_width {
            let mut sum = 0u32;

            for sy in 0..v_scale {
                let sample_y = (y * v_scale + sy).min(input_height - 1);

                for sx in 0..h_scale {
                    let sample_x = (x * h_scale + sx).min(input_width - 1);
                    sum += plane[sample_y * input_width + sample_x] as u32;
                }
            }

            output[y * output_width + x] = ((sum + window / 2) / window) as u8;
        }
    }

    output
}

/// Destination of one entropy-coding pass.
///
/// A scan is traversed in exactly the same order whether symbol statistics
/// are being gathered or the bitstream is being written; only the sink
/// differs between the two passes.
pub(crate) trait EntropySink {
    fn dc_symbol(&mut self, symbol: u8, component: &Component) -> Result<()>;
    fn ac_symbol(&mut self, symbol: u8, component: &Component) -> Result<()>;
    fn raw_bits(&mut self, bits: u16, count: u8) -> Result<()>;
    /// Called between restart intervals, with the modulo 8 marker index.
    fn restart(&mut self, marker_index: u8) -> Result<()>;
    /// Called after the last MCU of a scan.
    fn finish_scan(&mut self) -> Result<()>;
}

/// Statistics-gathering pass: counts how often each symbol is emitted per
/// table so optimal Huffman tables can be built before the emission pass.
pub(crate) struct FrequencyGather<'a> {
    pub dc: &'a mut [FrequencyTable; 2],
    pub ac: &'a mut [FrequencyTable; 2],
}

impl EntropySink for FrequencyGather<'_> {
    fn dc_symbol(&mut self, symbol: u8, component: &Component) -> Result<()> {
        self.dc[component.dc_huffman_table as usize].record(symbol);
        Ok(())
    }

    fn ac_symbol(&mut self, symbol: u8, component: &Component) -> Result<()> {
        self.ac[component.ac_huffman_table as usize].record(symbol);
        Ok(())
    }

    fn raw_bits(&mut self, _bits: u16, _count: u8) -> Result<()> {
        Ok(())
    }

    fn restart(&mut self, _marker_index: u8) -> Result<()> {
        Ok(())
    }

    fn finish_scan(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Emission pass: Huffman-codes every symbol into the output bitstream.
pub(crate) struct BitstreamEmit<'a, W> {
    pub writer: &'a mut JfifWriter<W>,
    pub dc_tables: &'a [HuffmanTable; 2],
    pub ac_tables: &'a [HuffmanTable; 2],
}

impl<W: Write> EntropySink for BitstreamEmit<'_, W> {
    fn dc_symbol(&mut self, symbol: u8, component: &Component) -> Result<()> {
        self.writer
            .write_code(&self.dc_tables[component.dc_huffman_table as usize], symbol)
    }

    fn ac_symbol(&mut self, symbol: u8, component: &Component) -> Result<()> {
        self.writer
            .write_code(&self.ac_tables[component.ac_huffman_table as usize], symbol)
    }

    fn raw_bits(&mut self, bits: u16, count: u8) -> Result<()> {
        self.writer.write_bits(bits, count)
    }

    fn restart(&mut self, marker_index: u8) -> Result<()> {
        self.writer.finalize_bit_buffer()?;
        self.writer.write_marker(Marker::RST(marker_index))
    }

    fn finish_scan(&mut self) -> Result<()> {
        self.writer.finalize_bit_buffer()
    }
}

// Keep the buffered correction bits bounded; matches the headroom libjpeg
// allows before forcing out an EOB run.
const MAX_CORRECTION_BITS: usize = 937;

/// Per-scan entropy-coding state, reset at restart markers.
pub(crate) struct ScanState {
    pub dc_predictors: [i16; 4],
    /// Number of consecutive all-zero (at this precision) bands, pending an
    /// EOB-run symbol.
    eob_run: u16,
    /// Correction bits owed after the pending EOB-run symbol.
    eob_correction_bits: Vec<u8>,
    /// Correction bits gathered since the last symbol of the current band.
    refinement_bits: Vec<u8>,
}

impl ScanState {
    pub fn new() -> ScanState {
        ScanState {
            dc_predictors: [0; 4],
            eob_run: 0,
            eob_correction_bits: Vec::new(),
            refinement_bits: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        debug_assert!(self.eob_run == 0 && self.eob_correction_bits.is_empty());

        self.dc_predictors = [0; 4];
        self.eob_run = 0;
        self.eob_correction_bits.clear();
        self.refinement_bits.clear();
    }

    /// Emits the pending EOB-run symbol, its extension bits and any owed
    /// correction bits (section G.1.2.2).
    pub fn flush_eob_run<S: EntropySink>(
        &mut self,
        sink: &mut S,
        component: &Component,
    ) -> Result<()> {
        if self.eob_run == 0 {
            return Ok(());
        }

        let nbits = (15 - self.eob_run.leading_zeros()) as u8;

        sink.ac_symbol(nbits << 4, component)?;
        if nbits > 0 {
            sink.raw_bits(self.eob_run & ((1 << nbits) - 1), nbits)?;
        }

        self.eob_run = 0;

        for bit in mem::take(&mut self.eob_correction_bits) {
            sink.raw_bits(bit as u16, 1)?;
        }

        Ok(())
    }

    fn flush_refinement_bits<S: EntropySink>(&mut self, sink: &mut S) -> Result<()> {
        for bit in mem::take(&mut self.refinement_bits) {
            sink.raw_bits(bit as u16, 1)?;
        }
        Ok(())
    }
}

/// Encodes one block of a baseline sequential scan (section F.1.2).
pub(crate) fn encode_block_sequential<S: EntropySink>(
    sink: &mut S,
    block: &[i16; 64],
    component: &Component,
    component_index: usize,
    state: &mut ScanState,
) -> Result<()> {
    // DC difference, section F.1.2.1
    let diff = block[0] - state.dc_predictors[component_index];
    state.dc_predictors[component_index] = block[0];

    let (size, bits) = magnitude(diff);
    sink.dc_symbol(size, component)?;
    sink.raw_bits(bits, size)?;

    // AC run lengths, section F.1.2.2
    let mut run = 0u8;

    for &coefficient in &block[1..] {
        if coefficient == 0 {
            run += 1;
            continue;
        }

        while run > 15 {
            sink.ac_symbol(0xF0, component)?; // ZRL
            run -= 16;
        }

        let (size, bits) = magnitude(coefficient);
        sink.ac_symbol(run << 4 | size, component)?;
        sink.raw_bits(bits, size)?;
        run = 0;
    }

    if run > 0 {
        sink.ac_symbol(0x00, component)?; // EOB
    }

    Ok(())
}

/// First DC scan of a progressive frame (section G.1.2.1). The predictor
/// operates on the point-transformed values.
pub(crate) fn encode_dc_first<S: EntropySink>(
    sink: &mut S,
    block: &[i16; 64],
    component: &Component,
    component_index: usize,
    al: u8,
    state: &mut ScanState,
) -> Result<()> {
    let value = block[0] >> al;
    let diff = value - state.dc_predictors[component_index];
    state.dc_predictors[component_index] = value;

    let (size, bits) = magnitude(diff);
    sink.dc_symbol(size, component)?;
    sink.raw_bits(bits, size)?;

    Ok(())
}

/// DC refinement scan: one raw bit per block.
pub(crate) fn encode_dc_refine<S: EntropySink>(
    sink: &mut S,
    block: &[i16; 64],
    al: u8,
) -> Result<()> {
    sink.raw_bits((block[0] >> al) as u16 & 1, 1)
}

/// First AC scan of a band (section G.1.2.2), with EOB runs spanning blocks.
pub(crate) fn encode_ac_first<S: EntropySink>(
    sink: &mut S,
    block: &[i16; 64],
    component: &Component,
    ss: u8,
    se: u8,
    al: u8,
    state: &mut ScanState,
) -> Result<()> {
    let mut run = 0u8;

    for k in ss as usize..=se as usize {
        let coefficient = block[k];

        // Point transform of the magnitude, preserving the sign.
        let shifted = (coefficient.unsigned_abs() >> al) as i16;

        if shifted == 0 {
            run += 1;
            continue;
        }

        state.flush_eob_run(sink, component)?;

        while run > 15 {
            sink.ac_symbol(0xF0, component)?;
            run -= 16;
        }

        let value = if coefficient < 0 { -shifted } else { shifted };
        let (size, bits) = magnitude(value);

        sink.ac_symbol(run << 4 | size, component)?;
        sink.raw_bits(bits, size)?;
        run = 0;
    }

    if run > 0 {
        state.eob_run += 1;

        if state.eob_run == 0x7FFF {
            state.flush_eob_run(sink, component)?;
        }
    }

    Ok(())
}

/// AC refinement scan (section G.1.2.3). Previously nonzero coefficients
/// contribute one correction bit each; the bits are buffered until the next
/// symbol so they follow it in the bitstream.
pub(crate) fn encode_ac_refine<S: EntropySink>(
    sink: &mut S,
    block: &[i16; 64],
    component: &Component,
    ss: u8,
    se: u8,
    al: u8,
    state: &mut ScanState,
) -> Result<()> {
    let mut shifted = [0u16; 64];
    let mut last_new_index = 0;

    for k in ss as usize..=se as usize {
        shifted[k] = block[k].unsigned_abs() >> al;

        if shifted[k] == 1 {
            last_new_index = k;
        }
    }

    let mut run = 0u8;

    for k in ss as usize..=se as usize {
        let value = shifted[k];

        if value == 0 {
            run += 1;
            continue;
        }

        while run > 15 && k <= last_new_index {
            state.flush_eob_run(sink, component)?;
            sink.ac_symbol(0xF0, component)?;
            run -= 16;
            state.flush_refinement_bits(sink)?;
        }

        if value > 1 {
            // Already nonzero at this precision: owed one correction bit,
            // emitted after the next symbol.
            state.refinement_bits.push((value & 1) as u8);
            continue;
        }

        // Newly nonzero coefficient.
        state.flush_eob_run(sink, component)?;
        sink.ac_symbol(run << 4 | 1, component)?;
        sink.raw_bits(if block[k] < 0 { 0 } else { 1 }, 1)?;
        state.flush_refinement_bits(sink)?;
        run = 0;
    }

    if run > 0 || !state.refinement_bits.is_empty() {
        state.eob_run += 1;
        let bits = mem::take(&mut state.refinement_bits);
        state.eob_correction_bits.extend(bits);

        if state.eob_run == 0x7FFF || state.eob_correction_bits.len() > MAX_CORRECTION_BITS {
            state.flush_eob_run(sink, component)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        downsample, encode_ac_first, encode_block_sequential, Component, EntropySink, ScanState,
    };
    use crate::error::Result;
    use crate::parser::Dimensions;

    #[derive(Default)]
    struct RecordingSink {
        dc_symbols: Vec<u8>,
        ac_symbols: Vec<u8>,
        bits: Vec<(u16, u8)>,
    }

    impl EntropySink for RecordingSink {
        fn dc_symbol(&mut self, symbol: u8, _component: &Component) -> Result<()> {
            self.dc_symbols.push(symbol);
            Ok(())
        }

        fn ac_symbol(&mut self, symbol: u8, _component: &Component) -> Result<()> {
            self.ac_symbols.push(symbol);
            Ok(())
        }

        fn raw_bits(&mut self, bits: u16, count: u8) -> Result<()> {
            self.bits.push((bits, count));
            Ok(())
        }

        fn restart(&mut self, _marker_index: u8) -> Result<()> {
            Ok(())
        }

        fn finish_scan(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn test_component() -> Component {
        let mut component = Component::new(1, (1, 1), 0, 0);
        component.update_size(
            Dimensions {
                width: 8,
                height: 8,
            },
            1,
            1,
        );
        component
    }

    #[test]
    fn sequential_block_emits_runs_and_eob() {
        let component = test_component();
        let mut state = ScanState::new();
        let mut sink = RecordingSink::default();

        let mut block = [0i16; 64];
        block[0] = 6; // DC
        block[1] = -2;
        block[20] = 3; // 18 zeroes before it: ZRL + run of 2

        encode_block_sequential(&mut sink, &block, &component, 0, &mut state).unwrap();

        assert_eq!(sink.dc_symbols, vec![3]); // category of 6
        assert_eq!(sink.ac_symbols, vec![0x02, 0xF0, 0x22, 0x00]);
        assert_eq!(state.dc_predictors[0], 6);

        // The next block's DC is coded as a difference.
        let mut sink = RecordingSink::default();
        let mut block = [0i16; 64];
        block[0] = 4;
        encode_block_sequential(&mut sink, &block, &component, 0, &mut state).unwrap();

        assert_eq!(sink.dc_symbols, vec![2]); // category of -2
        assert_eq!(sink.bits[0], (1, 2)); // -2 encoded as 01
        assert_eq!(sink.ac_symbols, vec![0x00]);
    }

    #[test]
    fn ac_first_accumulates_eob_runs() {
        let component = test_component();
        let mut state = ScanState::new();
        let mut sink = RecordingSink::default();

        let zero_block = [0i16; 64];

        // Five empty bands, then one with a coefficient.
        for _ in 0..5 {
            encode_ac_first(&mut sink, &zero_block, &component, 1, 63, 0, &mut state).unwrap();
        }
        assert!(sink.ac_symbols.is_empty());

        let mut block = [0i16; 64];
        block[1] = 1;
        encode_ac_first(&mut sink, &block, &component, 1, 63, 0, &mut state).unwrap();

        // EOB run of 5: category 2, extension bits 5 - 4 = 1.
        assert_eq!(sink.ac_symbols[0], 0x20);
        assert_eq!(sink.bits[0], (1, 2));
        // Then the coefficient, and the rest of the band becomes a new
        // pending EOB run.
        assert_eq!(sink.ac_symbols[1], 0x01);
    }

    #[test]
    fn ac_first_point_transform_drops_low_bits() {
        let component = test_component();
        let mut state = ScanState::new();
        let mut sink = RecordingSink::default();

        let mut block = [0i16; 64];
        block[1] = 3; // shifted to 1 at al=1
        block[2] = -1; // shifted to zero at al=1

        encode_ac_first(&mut sink, &block, &component, 1, 63, 1, &mut state).unwrap();

        assert_eq!(sink.ac_symbols, vec![0x01]);
        assert_eq!(sink.bits[0], (1, 1));
    }

    #[test]
    fn downsample_averages_windows() {
        // 4x2 plane downsampled 2x2.
        let plane = [10u8, 20, 30, 40, 50, 60, 70, 80];
        let output = downsample(
            &plane,
            Dimensions {
                width: 4,
                height: 2,
            },
            Dimensions {
                width: 2,
                height: 1,
            },
            2,
            2,
        );

        assert_eq!(output, vec![35, 55]);
    }

    #[test]
    fn downsample_replicates_edges() {
        // 3x1 plane downsampled 2x1: the second window reads past the edge.
        let plane = [10u8, 20, 40];
        let output = downsample(
            &plane,
            Dimensions {
                width: 3,
                height: 1,
            },
            Dimensions {
                width: 2,
                height: 1,
            },
            2,
            1,
        );

        assert_eq!(output, vec![15, 40]);
    }
}
