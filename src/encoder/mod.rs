//! JPEG encoding, baseline sequential and progressive.

use std::io::Write;

use tracing::debug;

use crate::color::rgb_to_ycbcr;
use crate::error::{Error, Result};
use crate::marker::Marker;
use crate::parser::Dimensions;

use self::component::{
    encode_ac_first, encode_ac_refine, encode_block_sequential, encode_dc_first, encode_dc_refine,
    BitstreamEmit, Component, EntropySink, FrequencyGather, ScanState,
};
use self::huffman::{CodingClass, FrequencyTable, HuffmanTable};
use self::quantization::{QuantizationTable, DEFAULT_CHROMA_TABLE, DEFAULT_LUMA_TABLE};
use self::writer::JfifWriter;

pub(crate) mod component;
mod fdct;
mod huffman;
mod quantization;
mod writer;

/// The layout of the pixel data passed to [`Encoder::encode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorType {
    /// One luminance sample per pixel.
    Luma,
    /// Three interleaved samples per pixel: red, green, blue.
    Rgb,
    /// Three interleaved samples per pixel, already in the YCbCr space.
    Ycbcr,
}

impl ColorType {
    fn bytes_per_pixel(self) -> usize {
        match self {
            ColorType::Luma => 1,
            ColorType::Rgb | ColorType::Ycbcr => 3,
        }
    }
}

/// One entropy-coded scan of the frame.
struct Scan {
    /// Indices into the frame's component list.
    components: Vec<usize>,
    spectral_selection: (u8, u8),
    successive_approximation: (u8, u8),
}

/// JPEG still image encoder.
///
/// Writes 8-bit baseline sequential frames by default; progressive frames,
/// restart markers and image-specific Huffman tables are opt-in.
///
/// # Examples
///
/// ```no_run
/// # fn main() -> jpeg_codec::Result<()> {
/// let pixels = vec![0u8; 16 * 16 * 3];
/// let mut output = Vec::new();
///
/// let encoder = jpeg_codec::Encoder::new(&mut output, 90);
/// encoder.encode(&pixels, 16, 16, jpeg_codec::ColorType::Rgb)?;
/// # Ok(())
/// # }
/// ```
pub struct Encoder<W: Write> {
    writer: JfifWriter<W>,
    quality: u8,
    sampling_factor: (u8, u8),
    progressive: bool,
    restart_interval: u16,
    optimize_huffman_tables: bool,
    comment: Option<Vec<u8>>,
}

impl<W: Write> Encoder<W> {
    /// Creates a new encoder writing to `writer`. `quality` ranges from 1
    /// (strongest compression) to 100 (weakest); values outside that range
    /// are rejected when encoding.
    pub fn new(writer: W, quality: u8) -> Encoder<W> {
        Encoder {
            writer: JfifWriter::new(writer),
            quality,
            sampling_factor: (2, 2),
            progressive: false,
            restart_interval: 0,
            optimize_huffman_tables: false,
            comment: None,
        }
    }

    /// Embeds `comment` in a COM segment after the JFIF header.
    pub fn set_comment<T: Into<Vec<u8>>>(&mut self, comment: T) {
        self.comment = Some(comment.into());
    }

    /// Sets the luminance sampling factors. The chrominance components are
    /// always sampled at 1x1, so `(2, 2)` (the default) means 4:2:0 chroma
    /// subsampling and `(1, 1)` means none.
    ///
    /// Only `(1, 1)`, `(2, 1)`, `(1, 2)` and `(2, 2)` are accepted, checked
    /// when encoding. Ignored for grayscale images.
    pub fn set_sampling_factor(&mut self, horizontal: u8, vertical: u8) {
        self.sampling_factor = (horizontal, vertical);
    }

    /// Selects progressive (DCT successive approximation) encoding instead
    /// of baseline sequential.
    ///
    /// Progressive frames always use Huffman tables derived from the image,
    /// as if `set_optimized_huffman_tables` had been called.
    pub fn set_progressive(&mut self, progressive: bool) {
        self.progressive = progressive;
    }

    /// Inserts a restart marker every `interval` MCUs. Zero (the default)
    /// disables restart markers.
    pub fn set_restart_interval(&mut self, interval: u16) {
        self.restart_interval = interval;
    }

    /// Derives Huffman tables from the image's own symbol statistics in an
    /// extra pass instead of using the tables of Annex K.
    pub fn set_optimized_huffman_tables(&mut self, optimize: bool) {
        self.optimize_huffman_tables = optimize;
    }

    /// Encodes `data` as a `width` x `height` image and writes the complete
    /// JPEG stream, including its EOI marker.
    pub fn encode(
        mut self,
        data: &[u8],
        width: u16,
        height: u16,
        color_type: ColorType,
    ) -> Result<()> {
        if self.quality == 0 || self.quality > 100 {
            return Err(Error::Parameter(format!(
                "quality {} is outside the range 1..=100",
                self.quality
            )));
        }

        if width == 0 || height == 0 {
            return Err(Error::Parameter("image dimensions must be nonzero".to_owned()));
        }

        if let Some(ref comment) = self.comment {
            // The segment length field must fit the payload.
            if comment.len() > 65533 {
                return Err(Error::Parameter(format!(
                    "comment of {} bytes does not fit a COM segment",
                    comment.len()
                )));
            }
        }

        let expected = width as usize * height as usize * color_type.bytes_per_pixel();
        if data.len() < expected {
            return Err(Error::Parameter(format!(
                "expected {} bytes of pixel data, got {}",
                expected,
                data.len()
            )));
        }

        match self.sampling_factor {
            (1, 1) | (2, 1) | (1, 2) | (2, 2) => {}
            (h, v) => {
                return Err(Error::Parameter(format!(
                    "unsupported sampling factors {}x{}",
                    h, v
                )))
            }
        }

        let image_size = Dimensions { width, height };
        let planes = build_planes(data, image_size, color_type);

        let quantization_tables = [
            QuantizationTable::new_with_quality(&DEFAULT_LUMA_TABLE, self.quality),
            QuantizationTable::new_with_quality(&DEFAULT_CHROMA_TABLE, self.quality),
        ];

        let mut components = match color_type {
            ColorType::Luma => vec![Component::new(1, (1, 1), 0, 0)],
            ColorType::Rgb | ColorType::Ycbcr => vec![
                Component::new(1, self.sampling_factor, 0, 0),
                Component::new(2, (1, 1), 1, 1),
                Component::new(3, (1, 1), 1, 1),
            ],
        };

        let h_max = components
            .iter()
            .map(|c| c.horizontal_sampling_factor)
            .max()
            .unwrap();
        let v_max = components
            .iter()
            .map(|c| c.vertical_sampling_factor)
            .max()
            .unwrap();

        for (component, plane) in components.iter_mut().zip(&planes) {
            component.update_size(image_size, h_max, v_max);
            component.build_blocks(
                plane,
                image_size,
                h_max,
                v_max,
                &quantization_tables[component.quantization_table as usize],
            );
        }

        let scans = if self.progressive {
            progressive_script(components.len())
        } else {
            vec![Scan {
                components: (0..components.len()).collect(),
                spectral_selection: (0, 63),
                successive_approximation: (0, 0),
            }]
        };

        debug!(
            width,
            height,
            progressive = self.progressive,
            scans = scans.len(),
            "encoding frame"
        );

        let grayscale = components.len() == 1;
        // The Annex K tables define no codes for the EOBn symbols (n > 0)
        // that progressive AC scans produce, so progressive frames always
        // derive their tables from the image's statistics.
        let (dc_tables, ac_tables) = if self.optimize_huffman_tables || self.progressive {
            self.gather_huffman_tables(&components, &scans)?
        } else {
            (
                [HuffmanTable::default_luma_dc(), HuffmanTable::default_chroma_dc()],
                [HuffmanTable::default_luma_ac(), HuffmanTable::default_chroma_ac()],
            )
        };

        self.writer.write_marker(Marker::SOI)?;
        self.writer.write_jfif_header()?;

        if let Some(ref comment) = self.comment {
            self.writer.write_segment(Marker::COM, comment)?;
        }

        self.writer.write_dqt(0, &quantization_tables[0])?;
        if !grayscale {
            self.writer.write_dqt(1, &quantization_tables[1])?;
        }

        let sof = if self.progressive { 2 } else { 0 };
        self.writer.write_frame_header(sof, width, height, &components)?;

        self.writer.write_dht(CodingClass::Dc, 0, &dc_tables[0])?;
        self.writer.write_dht(CodingClass::Ac, 0, &ac_tables[0])?;
        if !grayscale {
            self.writer.write_dht(CodingClass::Dc, 1, &dc_tables[1])?;
            self.writer.write_dht(CodingClass::Ac, 1, &ac_tables[1])?;
        }

        if self.restart_interval > 0 {
            self.writer.write_dri(self.restart_interval)?;
        }

        for scan in &scans {
            let scan_components: Vec<&Component> =
                scan.components.iter().map(|&i| &components[i]).collect();

            self.writer.write_scan_header(
                &scan_components,
                scan.spectral_selection,
                scan.successive_approximation,
            )?;

            let mut sink = BitstreamEmit {
                writer: &mut self.writer,
                dc_tables: &dc_tables,
                ac_tables: &ac_tables,
            };
            run_scan(
                &mut sink,
                &components,
                scan,
                self.restart_interval,
                self.progressive,
            )?;
        }

        self.writer.write_marker(Marker::EOI)?;
        self.writer.flush()?;

        Ok(())
    }

    /// The statistics pass: traverses every scan once, counting symbols, and
    /// builds one Huffman table per table slot from the counts.
    fn gather_huffman_tables(
        &self,
        components: &[Component],
        scans: &[Scan],
    ) -> Result<([HuffmanTable; 2], [HuffmanTable; 2])> {
        let mut dc_frequencies = [FrequencyTable::new(), FrequencyTable::new()];
        let mut ac_frequencies = [FrequencyTable::new(), FrequencyTable::new()];

        for scan in scans {
            let mut sink = FrequencyGather {
                dc: &mut dc_frequencies,
                ac: &mut ac_frequencies,
            };
            run_scan(
                &mut sink,
                components,
                scan,
                self.restart_interval,
                self.progressive,
            )?;
        }

        Ok((
            [dc_frequencies[0].build(), dc_frequencies[1].build()],
            [ac_frequencies[0].build(), ac_frequencies[1].build()],
        ))
    }
}

/// Splits the interleaved pixel data into one full-resolution plane per
/// frame component, converting RGB to YCbCr on the way.
fn build_planes(data: &[u8], size: Dimensions, color_type: ColorType) -> Vec<Vec<u8>> {
    let pixel_count = size.width as usize * size.height as usize;

    match color_type {
        ColorType::Luma => vec![data[..pixel_count].to_vec()],
        ColorType::Ycbcr => {
            let mut planes = vec![Vec::with_capacity(pixel_count); 3];

            for pixel in data[..pixel_count * 3].chunks_exact(3) {
                planes[0].push(pixel[0]);
                planes[1].push(pixel[1]);
                planes[2].push(pixel[2]);
            }

            planes
        }
        ColorType::Rgb => {
            let mut planes = vec![Vec::with_capacity(pixel_count); 3];

            for pixel in data[..pixel_count * 3].chunks_exact(3) {
                let (y, cb, cr) = rgb_to_ycbcr(pixel[0], pixel[1], pixel[2]);
                planes[0].push(y);
                planes[1].push(cb);
                planes[2].push(cr);
            }

            planes
        }
    }
}

/// The default progressive scan sequence, modelled on the one libjpeg uses:
/// coarse DC first, the low-frequency luminance band early, then the full
/// chrominance spectra, and refinement scans last.
fn progressive_script(component_count: usize) -> Vec<Scan> {
    let scan = |components: Vec<usize>, spectral: (u8, u8), approximation: (u8, u8)| Scan {
        components,
        spectral_selection: spectral,
        successive_approximation: approximation,
    };

    if component_count == 1 {
        return vec![
            scan(vec![0], (0, 0), (0, 1)),
            scan(vec![0], (1, 5), (0, 2)),
            scan(vec![0], (6, 63), (0, 2)),
            scan(vec![0], (1, 63), (2, 1)),
            scan(vec![0], (0, 0), (1, 0)),
            scan(vec![0], (1, 63), (1, 0)),
        ];
    }

    vec![
        scan(vec![0, 1, 2], (0, 0), (0, 1)),
        scan(vec![0], (1, 5), (0, 2)),
        scan(vec![2], (1, 63), (0, 1)),
        scan(vec![1], (1, 63), (0, 1)),
        scan(vec![0], (6, 63), (0, 2)),
        scan(vec![0], (1, 63), (2, 1)),
        scan(vec![0, 1, 2], (0, 0), (1, 0)),
        scan(vec![2], (1, 63), (1, 0)),
        scan(vec![1], (1, 63), (1, 0)),
        scan(vec![0], (1, 63), (1, 0)),
    ]
}

/// Traverses one scan in coding order, feeding every block to `sink`.
///
/// Both entropy-coding passes use this traversal, so the symbol statistics
/// always match the symbols later written.
fn run_scan<S: EntropySink>(
    sink: &mut S,
    components: &[Component],
    scan: &Scan,
    restart_interval: u16,
    progressive: bool,
) -> Result<()> {
    let mut state = ScanState::new();
    let (ss, se) = scan.spectral_selection;
    let (ah, al) = scan.successive_approximation;
    let is_dc_scan = se == 0;

    if scan.components.len() > 1 {
        // Interleaved order, section A.2.3. Only DC scans and the single
        // sequential scan interleave.
        let first = &components[scan.components[0]];
        let mcu_cols = first.block_size.width as usize / first.horizontal_sampling_factor as usize;
        let mcu_rows = first.block_size.height as usize / first.vertical_sampling_factor as usize;

        let mut mcus_encoded = 0u32;

        for mcu_y in 0..mcu_rows {
            for mcu_x in 0..mcu_cols {
                handle_restart(sink, &mut state, first, restart_interval, &mut mcus_encoded)?;

                for (scan_index, &component_index) in scan.components.iter().enumerate() {
                    let component = &components[component_index];
                    let h = component.horizontal_sampling_factor as usize;
                    let v = component.vertical_sampling_factor as usize;

                    for block_y_offset in 0..v {
                        for block_x_offset in 0..h {
                            let block = component
                                .block(mcu_x * h + block_x_offset, mcu_y * v + block_y_offset);

                            if !progressive {
                                encode_block_sequential(
                                    sink, block, component, scan_index, &mut state,
                                )?;
                            } else if ah == 0 {
                                encode_dc_first(sink, block, component, scan_index, al, &mut state)?;
                            } else {
                                encode_dc_refine(sink, block, al)?;
                            }
                        }
                    }
                }

                mcus_encoded += 1;
            }
        }
    } else {
        // Non-interleaved order, section A.2.2: the grid covers the
        // component's own samples, ignoring MCU padding.
        let component = &components[scan.components[0]];
        let block_cols = (component.size.width as usize + 7) / 8;
        let block_rows = (component.size.height as usize + 7) / 8;

        let mut mcus_encoded = 0u32;

        for block_y in 0..block_rows {
            for block_x in 0..block_cols {
                handle_restart(sink, &mut state, component, restart_interval, &mut mcus_encoded)?;

                let block = component.block(block_x, block_y);

                if !progressive {
                    encode_block_sequential(sink, block, component, 0, &mut state)?;
                } else if is_dc_scan {
                    if ah == 0 {
                        encode_dc_first(sink, block, component, 0, al, &mut state)?;
                    } else {
                        encode_dc_refine(sink, block, al)?;
                    }
                } else if ah == 0 {
                    encode_ac_first(sink, block, component, ss, se, al, &mut state)?;
                } else {
                    encode_ac_refine(sink, block, component, ss, se, al, &mut state)?;
                }

                mcus_encoded += 1;
            }
        }
    }

    state.flush_eob_run(sink, &components[scan.components[0]])?;
    sink.finish_scan()
}

/// Emits a restart marker and resets the entropy-coding state at interval
/// boundaries (section F.1.2.3).
fn handle_restart<S: EntropySink>(
    sink: &mut S,
    state: &mut ScanState,
    component: &Component,
    restart_interval: u16,
    mcus_encoded: &mut u32,
) -> Result<()> {
    if restart_interval == 0 || *mcus_encoded == 0 {
        return Ok(());
    }

    let interval = restart_interval as u32;
    if *mcus_encoded % interval == 0 {
        state.flush_eob_run(sink, component)?;
        sink.restart(((*mcus_encoded / interval - 1) % 8) as u8)?;
        state.reset();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{build_planes, progressive_script, ColorType, Encoder};
    use crate::error::Error;
    use crate::parser::Dimensions;

    #[test]
    fn rejects_out_of_range_quality() {
        for quality in [0, 101, 255] {
            let encoder = Encoder::new(Vec::new(), quality);
            let result = encoder.encode(&[128u8; 8 * 8], 8, 8, ColorType::Luma);
            assert!(matches!(result, Err(Error::Parameter(_))));
        }
    }

    #[test]
    fn rejects_zero_dimensions() {
        let encoder = Encoder::new(Vec::new(), 80);
        let result = encoder.encode(&[0u8; 3], 0, 1, ColorType::Rgb);
        assert!(matches!(result, Err(Error::Parameter(_))));
    }

    #[test]
    fn rejects_short_pixel_data() {
        let encoder = Encoder::new(Vec::new(), 80);
        let result = encoder.encode(&[0u8; 10], 4, 4, ColorType::Luma);
        assert!(matches!(result, Err(Error::Parameter(_))));
    }

    #[test]
    fn rejects_invalid_sampling_factors() {
        let mut encoder = Encoder::new(Vec::new(), 80);
        encoder.set_sampling_factor(3, 1);
        let result = encoder.encode(&[128u8; 8 * 8 * 3], 8, 8, ColorType::Rgb);
        assert!(matches!(result, Err(Error::Parameter(_))));
    }

    #[test]
    fn planes_split_channels() {
        let data = [10u8, 20, 30, 40, 50, 60];
        let planes = build_planes(
            &data,
            Dimensions {
                width: 2,
                height: 1,
            },
            ColorType::Ycbcr,
        );

        assert_eq!(planes[0], vec![10, 40]);
        assert_eq!(planes[1], vec![20, 50]);
        assert_eq!(planes[2], vec![30, 60]);
    }

    #[test]
    fn progressive_script_starts_with_dc() {
        for count in [1, 3] {
            let scans = progressive_script(count);

            assert_eq!(scans[0].spectral_selection, (0, 0));
            assert_eq!(scans[0].successive_approximation.0, 0);
            assert_eq!(scans[0].components.len(), count);

            // AC scans never interleave, and every component's full spectrum
            // reaches approximation zero.
            for scan in &scans[1..] {
                if scan.spectral_selection.0 >= 1 {
                    assert_eq!(scan.components.len(), 1);
                }
            }
            assert!(scans
                .iter()
                .any(|s| s.spectral_selection == (0, 0) && s.successive_approximation == (1, 0)));
            for component in 0..count {
                assert!(scans.iter().any(|s| {
                    s.components.contains(&component)
                        && s.spectral_selection.1 == 63
                        && s.successive_approximation.1 == 0
                }));
            }
        }
    }

    #[test]
    fn sequential_stream_structure() {
        let mut output = Vec::new();

        Encoder::new(&mut output, 80)
            .encode(&[128u8; 16 * 16], 16, 16, ColorType::Luma)
            .unwrap();

        assert_eq!(&output[..2], &[0xFF, 0xD8]); // SOI
        assert_eq!(&output[output.len() - 2..], &[0xFF, 0xD9]); // EOI

        // Exactly one SOF0 and one SOS.
        let count = |marker: u8| {
            output
                .windows(2)
                .filter(|w| w[0] == 0xFF && w[1] == marker)
                .count()
        };
        assert_eq!(count(0xC0), 1);
        assert_eq!(count(0xDA), 1);
    }
}
