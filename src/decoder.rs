use crate::color;
use crate::error::{Error, Result, UnsupportedFeature};
use crate::huffman::{HuffmanDecoder, HuffmanTable};
use crate::idct::dequantize_and_idct_block;
use crate::marker::Marker;
use crate::parser::{
    parse_app, parse_com, parse_dht, parse_dqt, parse_dri, parse_sof, parse_sos,
    AdobeColorTransform, AppData, CodingProcess, Component, Dimensions, EntropyCoding, FrameInfo,
};
use crate::upsampler::Upsampler;
use crate::zigzag::UNZIGZAG;
use byteorder::ReadBytesExt;
use std::cmp;
use std::io::Read;
use std::mem;
use tracing::debug;

pub(crate) const MAX_COMPONENTS: usize = 4;

/// An enumeration over combinations of color channels that a decoded image
/// may have.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Luminance (grayscale), 8 bits per sample
    L8,
    /// RGB, 8 bits per channel
    RGB24,
}

impl PixelFormat {
    /// Returns the number of bytes per pixel.
    pub fn pixel_bytes(&self) -> usize {
        match self {
            PixelFormat::L8 => 1,
            PixelFormat::RGB24 => 3,
        }
    }
}

/// Basic metadata about the image, available once the frame header has been
/// parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u16,
    pub height: u16,
    pub pixel_format: PixelFormat,
}

/// JPEG decoder.
///
/// Reads a marker-delimited stream from the inner reader and produces
/// interleaved 8-bit samples.
pub struct Decoder<R> {
    reader: R,

    frame: Option<FrameInfo>,
    dc_huffman_tables: Vec<Option<HuffmanTable>>,
    ac_huffman_tables: Vec<Option<HuffmanTable>>,
    quantization_tables: [Option<[u16; 64]>; 4],

    restart_interval: u16,
    color_transform: Option<AdobeColorTransform>,
    is_jfif: bool,
    comment: Option<Vec<u8>>,

    // Dequantized-domain DCT coefficients for each frame component, in
    // block-row-major order. Progressive scans accumulate into these across
    // multiple passes.
    coefficients: Vec<Vec<i16>>,
}

impl<R: Read> Decoder<R> {
    /// Creates a new `Decoder` using the reader `reader`.
    pub fn new(reader: R) -> Decoder<R> {
        Decoder {
            reader,
            frame: None,
            dc_huffman_tables: vec![None, None, None, None],
            ac_huffman_tables: vec![None, None, None, None],
            quantization_tables: [None; 4],
            restart_interval: 0,
            color_transform: None,
            is_jfif: false,
            comment: None,
            coefficients: Vec::new(),
        }
    }

    /// Returns metadata about the image.
    ///
    /// The returned value will be `None` until a call to either `read_info` or
    /// `decode` has returned `Ok`.
    pub fn info(&self) -> Option<ImageInfo> {
        match self.frame {
            Some(ref frame) => {
                let pixel_format = match frame.components.len() {
                    1 => PixelFormat::L8,
                    3 => PixelFormat::RGB24,
                    _ => panic!(),
                };

                Some(ImageInfo {
                    width: frame.image_size.width,
                    height: frame.image_size.height,
                    pixel_format,
                })
            }
            None => None,
        }
    }

    /// Returns the payload of the first COM segment in the stream, if any.
    ///
    /// The returned value will be `None` until a call to either `read_info`
    /// or `decode` has returned `Ok`.
    pub fn comment(&self) -> Option<&[u8]> {
        self.comment.as_deref()
    }

    /// Tries to read metadata from the image without decoding it.
    ///
    /// If successful, the metadata can be obtained using the `info` method.
    pub fn read_info(&mut self) -> Result<()> {
        self.decode_internal(true).map(|_| ())
    }

    /// Decodes the image and returns the decoded pixels if successful.
    pub fn decode(&mut self) -> Result<Vec<u8>> {
        self.decode_internal(false)
    }

    fn decode_internal(&mut self, stop_after_metadata: bool) -> Result<Vec<u8>> {
        if stop_after_metadata && self.frame.is_some() {
            // The metadata has already been read.
            return Ok(Vec::new());
        } else if self.frame.is_none()
            && (self.reader.read_u8()? != 0xFF
                || Marker::from_u8(self.reader.read_u8()?) != Some(Marker::SOI))
        {
            return Err(Error::Format(
                "first two bytes are not an SOI marker".to_owned(),
            ));
        }

        let mut previous_marker = Marker::SOI;
        let mut pending_marker = None;
        let mut scans_processed = 0;

        loop {
            let marker = match pending_marker.take() {
                Some(m) => m,
                None => self.read_marker()?,
            };

            match marker {
                // Frame header
                Marker::SOF(..) => {
                    // Section 4.10
                    // "An image contains only one frame in the cases of sequential and
                    //  progressive coding processes; an image contains multiple frames for the
                    //  hierarchical mode."
                    if self.frame.is_some() {
                        return Err(Error::Unsupported(UnsupportedFeature::Hierarchical));
                    }

                    let frame = parse_sof(&mut self.reader, marker)?;

                    if frame.is_differential {
                        return Err(Error::Unsupported(UnsupportedFeature::Hierarchical));
                    }
                    if frame.coding_process == CodingProcess::Lossless {
                        return Err(Error::Unsupported(UnsupportedFeature::Lossless));
                    }
                    if frame.entropy_coding == EntropyCoding::Arithmetic {
                        return Err(Error::Unsupported(
                            UnsupportedFeature::ArithmeticEntropyCoding,
                        ));
                    }
                    if frame.precision != 8 {
                        return Err(Error::Unsupported(UnsupportedFeature::SamplePrecision(
                            frame.precision,
                        )));
                    }
                    if frame.image_size.height == 0 {
                        return Err(Error::Unsupported(UnsupportedFeature::DNL));
                    }
                    let component_count = frame.components.len();
                    if component_count != 1 && component_count != 3 {
                        return Err(Error::Unsupported(UnsupportedFeature::ComponentCount(
                            component_count as u8,
                        )));
                    }

                    self.coefficients = frame
                        .components
                        .iter()
                        .map(|c| {
                            let block_count =
                                c.block_size.width as usize * c.block_size.height as usize;
                            vec![0i16; block_count * 64]
                        })
                        .collect();

                    self.frame = Some(frame);

                    if stop_after_metadata {
                        return Ok(Vec::new());
                    }
                }

                // Scan header
                Marker::SOS => {
                    if self.frame.is_none() {
                        return Err(Error::Format("scan encountered before frame".to_owned()));
                    }

                    let frame = self.frame.clone().unwrap();
                    pending_marker = self.decode_scan(&frame)?;
                    scans_processed += 1;
                }

                // Table-specification and miscellaneous markers
                // Quantization table-specification
                Marker::DQT => {
                    let tables = parse_dqt(&mut self.reader)?;

                    for (i, &table) in tables.iter().enumerate() {
                        if let Some(table) = table {
                            let mut unzigzagged_table = [0u16; 64];

                            for j in 0..64 {
                                unzigzagged_table[UNZIGZAG[j] as usize] = table[j];
                            }

                            self.quantization_tables[i] = Some(unzigzagged_table);
                        }
                    }
                }
                // Huffman table-specification
                Marker::DHT => {
                    let is_baseline = self.frame.as_ref().map(|frame| frame.is_baseline);
                    let (dc_tables, ac_tables) = parse_dht(&mut self.reader, is_baseline)?;

                    let current_dc_tables = mem::replace(&mut self.dc_huffman_tables, vec![]);
                    self.dc_huffman_tables = dc_tables
                        .into_iter()
                        .zip(current_dc_tables)
                        .map(|(a, b)| a.or(b))
                        .collect();

                    let current_ac_tables = mem::replace(&mut self.ac_huffman_tables, vec![]);
                    self.ac_huffman_tables = ac_tables
                        .into_iter()
                        .zip(current_ac_tables)
                        .map(|(a, b)| a.or(b))
                        .collect();
                }
                // Arithmetic conditioning table-specification
                Marker::DAC => {
                    return Err(Error::Unsupported(
                        UnsupportedFeature::ArithmeticEntropyCoding,
                    ))
                }
                // Restart interval definition
                Marker::DRI => self.restart_interval = parse_dri(&mut self.reader)?,
                // Comment
                Marker::COM => {
                    let comment = parse_com(&mut self.reader)?;

                    if self.comment.is_none() {
                        self.comment = Some(comment);
                    }
                }
                // Application data
                Marker::APP(..) => {
                    if let Some(data) = parse_app(&mut self.reader, marker)? {
                        match data {
                            AppData::Adobe(color_transform) => {
                                self.color_transform = Some(color_transform)
                            }
                            AppData::Jfif => {
                                // From the JFIF spec:
                                // "The APP0 marker is used to identify a JPEG FIF file.
                                //     The JPEG FIF APP0 marker is mandatory right after the SOI marker."
                                // Some JPEGs in the wild do not follow this though, so we allow
                                // JFIF headers anywhere APP0 markers are allowed.
                                self.is_jfif = true;
                            }
                        }
                    }
                }

                // Define number of lines
                Marker::DNL => {
                    // Section B.2.1
                    // "If a DNL segment (see B.2.5) is present, it shall immediately follow the first scan."
                    if previous_marker != Marker::SOS || scans_processed != 1 {
                        return Err(Error::Format(
                            "DNL is only allowed immediately after the first scan".to_owned(),
                        ));
                    }

                    return Err(Error::Unsupported(UnsupportedFeature::DNL));
                }

                // Hierarchical mode markers
                Marker::DHP | Marker::EXP => {
                    return Err(Error::Unsupported(UnsupportedFeature::Hierarchical))
                }

                // End of image
                Marker::EOI => break,

                _ => {
                    return Err(Error::Format(format!(
                        "{:?} marker found where not allowed",
                        marker
                    )))
                }
            }

            previous_marker = marker;
        }

        if scans_processed == 0 {
            return Err(Error::Format("no data found".to_owned()));
        }

        let frame = self.frame.as_ref().unwrap();

        // All scans have been decoded; reconstruct each component's samples
        // from its coefficients. Bands never touched by any scan stay zero,
        // which reconstructs as a flat mid-gray contribution.
        let mut component_data = Vec::with_capacity(frame.components.len());

        for (i, component) in frame.components.iter().enumerate() {
            let quantization_table = match self.quantization_tables
                [component.quantization_table_index]
            {
                Some(ref table) => table,
                None => return Err(Error::Format("use of unset quantization table".to_owned())),
            };

            component_data.push(samples_from_coefficients(
                component,
                &self.coefficients[i],
                quantization_table,
            ));
        }

        let image = compute_image(
            &frame.components,
            &component_data,
            frame.image_size,
            self.is_jfif,
            self.color_transform,
        );

        self.coefficients = Vec::new();

        image
    }

    fn read_marker(&mut self) -> Result<Marker> {
        if self.reader.read_u8()? != 0xFF {
            return Err(Error::Format(
                "did not find marker where expected".to_owned(),
            ));
        }

        let mut byte = self.reader.read_u8()?;

        // Section B.1.1.2
        // "Any marker may optionally be preceded by any number of fill bytes,
        //  which are bytes assigned code X'FF'."
        while byte == 0xFF {
            byte = self.reader.read_u8()?;
        }

        match Marker::from_u8(byte) {
            Some(marker) => Ok(marker),
            None => Err(Error::Format(
                "FF 00 found where marker was expected".to_owned(),
            )),
        }
    }

    fn decode_scan(&mut self, frame: &FrameInfo) -> Result<Option<Marker>> {
        let scan = parse_sos(&mut self.reader, frame)?;

        assert!(scan.component_indices.len() <= MAX_COMPONENTS);

        debug!(
            components = scan.component_indices.len(),
            ss = scan.spectral_selection_start,
            se = scan.spectral_selection_end,
            ah = scan.successive_approximation_high,
            al = scan.successive_approximation_low,
            "decoding scan"
        );

        let components: Vec<Component> = scan
            .component_indices
            .iter()
            .map(|&i| frame.components[i].clone())
            .collect();

        // Verify that all required quantization tables have been set.
        if components
            .iter()
            .any(|c| self.quantization_tables[c.quantization_table_index].is_none())
        {
            return Err(Error::Format("use of unset quantization table".to_owned()));
        }

        // Verify that all required huffman tables have been set.
        if scan.spectral_selection_start == 0
            && scan.successive_approximation_high == 0
            && scan
                .dc_table_indices
                .iter()
                .any(|&i| self.dc_huffman_tables[i].is_none())
        {
            return Err(Error::Format(
                "scan makes use of unset dc huffman table".to_owned(),
            ));
        }
        if scan.spectral_selection_end > 0
            && scan
                .ac_table_indices
                .iter()
                .any(|&i| self.ac_huffman_tables[i].is_none())
        {
            return Err(Error::Format(
                "scan makes use of unset ac huffman table".to_owned(),
            ));
        }

        let blocks_per_mcu: Vec<u16> = components
            .iter()
            .map(|c| c.horizontal_sampling_factor as u16 * c.vertical_sampling_factor as u16)
            .collect();
        let is_interleaved = components.len() > 1;
        let mut huffman = HuffmanDecoder::new();
        let mut dc_predictors = [0i16; MAX_COMPONENTS];
        let mut restarts_left = self.restart_interval;
        let mut expected_rst_num = 0;
        let mut eob_run = 0;

        // In a non-interleaved scan the data order is the top-down block order
        // of the single component, with the block count derived from the
        // component size rather than the padded block grid (section A.2.2).
        let mcu_size = if is_interleaved {
            frame.mcu_size
        } else {
            Dimensions {
                width: (components[0].size.width + 7) / 8,
                height: (components[0].size.height + 7) / 8,
            }
        };

        for mcu_y in 0..mcu_size.height {
            for mcu_x in 0..mcu_size.width {
                for (i, component) in components.iter().enumerate() {
                    for j in 0..if is_interleaved { blocks_per_mcu[i] } else { 1 } {
                        let (block_x, block_y);

                        if is_interleaved {
                            // Section A.2.3
                            block_x = mcu_x * component.horizontal_sampling_factor as u16
                                + j % component.horizontal_sampling_factor as u16;
                            block_y = mcu_y * component.vertical_sampling_factor as u16
                                + j / component.horizontal_sampling_factor as u16;
                        } else {
                            // Section A.2.2
                            block_x = mcu_x;
                            block_y = mcu_y;
                        }

                        let block_index = block_y as usize * component.block_size.width as usize
                            + block_x as usize;
                        let coefficient_range =
                            block_index * 64..block_index * 64 + 64;
                        let mut coefficients = [0i16; 64];
                        coefficients.copy_from_slice(
                            &self.coefficients[scan.component_indices[i]]
                                [coefficient_range.clone()],
                        );

                        if scan.successive_approximation_high == 0 {
                            let dc_diff = self.decode_block(
                                &mut coefficients,
                                &mut huffman,
                                &scan,
                                i,
                                &mut eob_run,
                                dc_predictors[i],
                            )?;
                            dc_predictors[i] = dc_predictors[i].wrapping_add(dc_diff);
                        } else {
                            self.decode_block_successive_approximation(
                                &mut coefficients,
                                &mut huffman,
                                &scan,
                                i,
                                &mut eob_run,
                            )?;
                        }

                        self.coefficients[scan.component_indices[i]][coefficient_range]
                            .copy_from_slice(&coefficients);
                    }
                }

                if self.restart_interval > 0 {
                    let is_last_mcu =
                        mcu_x == mcu_size.width - 1 && mcu_y == mcu_size.height - 1;
                    restarts_left -= 1;

                    if restarts_left == 0 && !is_last_mcu {
                        match huffman.take_marker() {
                            Some(Marker::RST(n)) => {
                                if n != expected_rst_num {
                                    return Err(Error::Data(format!(
                                        "found RST{} marker where RST{} was expected",
                                        n, expected_rst_num
                                    )));
                                }

                                expected_rst_num = (expected_rst_num + 1) % 8;
                            }
                            Some(marker) => {
                                return Err(Error::Data(format!(
                                    "found marker {:?} inside scan where RST{} was expected",
                                    marker, expected_rst_num
                                )))
                            }
                            None => {
                                return Err(Error::Data(format!(
                                    "RST{} marker not found where expected",
                                    expected_rst_num
                                )))
                            }
                        }

                        huffman.reset();
                        // Section F.2.1.3.1
                        dc_predictors = [0i16; MAX_COMPONENTS];
                        // Section G.1.2.2
                        eob_run = 0;

                        restarts_left = self.restart_interval;
                    }
                }
            }
        }

        Ok(huffman.take_marker())
    }

    fn decode_block(
        &mut self,
        coefficients: &mut [i16; 64],
        huffman: &mut HuffmanDecoder,
        scan: &crate::parser::ScanInfo,
        component_index: usize,
        eob_run: &mut u16,
        dc_predictor: i16,
    ) -> Result<i16> {
        let mut dc_diff = 0;

        if scan.spectral_selection_start == 0 {
            // Section F.2.2.1
            let dc_table = self.dc_huffman_tables[scan.dc_table_indices[component_index]]
                .as_ref()
                .unwrap();
            let value = huffman.decode(&mut self.reader, dc_table)?;
            let diff = match value {
                0 => 0,
                1..=11 => huffman.receive_extend(&mut self.reader, value)? as i16,
                _ => {
                    return Err(Error::Data(
                        "invalid DC difference magnitude category".to_owned(),
                    ))
                }
            };

            coefficients[0] = dc_predictor
                .wrapping_add(diff)
                .wrapping_shl(scan.successive_approximation_low as u32);
            dc_diff = diff;
        }

        let mut index = cmp::max(scan.spectral_selection_start, 1);

        if index <= scan.spectral_selection_end && *eob_run > 0 {
            *eob_run -= 1;
            return Ok(dc_diff);
        }

        if index <= scan.spectral_selection_end {
            let ac_table = self.ac_huffman_tables[scan.ac_table_indices[component_index]]
                .as_ref()
                .unwrap();

            // Section F.1.2.2.1
            while index <= scan.spectral_selection_end {
                if let Some((value, run)) = huffman.decode_fast_ac(&mut self.reader, ac_table)? {
                    index += run;

                    if index > scan.spectral_selection_end {
                        break;
                    }

                    coefficients[UNZIGZAG[index as usize] as usize] =
                        value.wrapping_shl(scan.successive_approximation_low as u32);
                    index += 1;
                } else {
                    let byte = huffman.decode(&mut self.reader, ac_table)?;
                    let r = byte >> 4;
                    let s = byte & 0x0f;

                    if s == 0 {
                        match r {
                            15 => index += 16, // Run length of 16 zero coefficients.
                            _ => {
                                *eob_run = (1 << r) - 1;

                                if r > 0 {
                                    *eob_run += huffman.receive(&mut self.reader, r)? as u16;
                                }

                                break;
                            }
                        }
                    } else {
                        index += r;

                        if index > scan.spectral_selection_end {
                            break;
                        }

                        coefficients[UNZIGZAG[index as usize] as usize] =
                            (huffman.receive_extend(&mut self.reader, s)?
                                << scan.successive_approximation_low) as i16;
                        index += 1;
                    }
                }
            }
        }

        Ok(dc_diff)
    }

    fn decode_block_successive_approximation(
        &mut self,
        coefficients: &mut [i16; 64],
        huffman: &mut HuffmanDecoder,
        scan: &crate::parser::ScanInfo,
        component_index: usize,
        eob_run: &mut u16,
    ) -> Result<()> {
        let bit = 1 << scan.successive_approximation_low;

        if scan.spectral_selection_start == 0 {
            // Section G.1.2.1

            if huffman.get_bit(&mut self.reader)? == 1 {
                coefficients[0] |= bit;
            }
        } else {
            // Section G.1.2.3

            if *eob_run > 0 {
                *eob_run -= 1;
                self.refine_non_zeroes(
                    coefficients,
                    huffman,
                    scan.spectral_selection_start,
                    scan.spectral_selection_end,
                    64,
                    bit,
                )?;
                return Ok(());
            }

            let mut index = scan.spectral_selection_start;

            while index <= scan.spectral_selection_end {
                let ac_table = self.ac_huffman_tables[scan.ac_table_indices[component_index]]
                    .as_ref()
                    .unwrap();
                let byte = huffman.decode(&mut self.reader, ac_table)?;
                let r = byte >> 4;
                let s = byte & 0x0f;

                let mut zero_run_length = r;
                let mut value = 0;

                match s {
                    0 => {
                        match r {
                            15 => {
                                // Run length of 16 zero coefficients.
                                // We don't need to do anything special here, zero_run_length is 15
                                // and then value (which is zero) gets written, resulting in 16
                                // zero coefficients.
                            }
                            _ => {
                                *eob_run = (1 << r) - 1;

                                if r > 0 {
                                    *eob_run += huffman.receive(&mut self.reader, r)? as u16;
                                }

                                // Force end of block.
                                zero_run_length = 64;
                            }
                        }
                    }
                    1 => {
                        if huffman.get_bit(&mut self.reader)? == 1 {
                            value = bit;
                        } else {
                            value = -bit;
                        }
                    }
                    _ => {
                        return Err(Error::Data(
                            "unexpected huffman code in refinement scan".to_owned(),
                        ))
                    }
                }

                index = self.refine_non_zeroes(
                    coefficients,
                    huffman,
                    index,
                    scan.spectral_selection_end,
                    zero_run_length,
                    bit,
                )?;

                if value != 0 {
                    coefficients[UNZIGZAG[index as usize] as usize] = value;
                }

                index += 1;
            }
        }

        Ok(())
    }

    fn refine_non_zeroes(
        &mut self,
        coefficients: &mut [i16; 64],
        huffman: &mut HuffmanDecoder,
        start: u8,
        end: u8,
        zrl: u8,
        bit: i16,
    ) -> Result<u8> {
        let mut zero_run_length = zrl;

        for i in start..=end {
            let index = UNZIGZAG[i as usize] as usize;

            if coefficients[index] == 0 {
                if zero_run_length == 0 {
                    return Ok(i);
                }

                zero_run_length -= 1;
            } else if huffman.get_bit(&mut self.reader)? == 1 && coefficients[index] & bit == 0 {
                if coefficients[index] > 0 {
                    coefficients[index] += bit;
                } else {
                    coefficients[index] -= bit;
                }
            }
        }

        Ok(end)
    }
}

fn samples_from_coefficients(
    component: &Component,
    coefficients: &[i16],
    quantization_table: &[u16; 64],
) -> Vec<u8> {
    let block_count = component.block_size.width as usize * component.block_size.height as usize;
    let line_stride = component.block_size.width as usize * 8;

    debug_assert_eq!(coefficients.len(), block_count * 64);

    let mut buffer = vec![0u8; block_count * 64];

    for i in 0..block_count {
        let x = (i % component.block_size.width as usize) * 8;
        let y = (i / component.block_size.width as usize) * 8;

        let mut block = [0i16; 64];
        block.copy_from_slice(&coefficients[i * 64..(i + 1) * 64]);

        dequantize_and_idct_block(
            &block,
            quantization_table,
            line_stride,
            &mut buffer[y * line_stride + x..],
        );
    }

    buffer
}

fn compute_image(
    components: &[Component],
    data: &[Vec<u8>],
    output_size: Dimensions,
    is_jfif: bool,
    color_transform: Option<AdobeColorTransform>,
) -> Result<Vec<u8>> {
    if data.iter().any(|data| data.is_empty()) {
        return Err(Error::Format("not all components have data".to_owned()));
    }

    if components.len() == 1 {
        let component = &components[0];

        if component.size.width % 8 == 0 && component.size.height % 8 == 0 {
            return Ok(data[0].clone());
        }

        let mut buffer =
            vec![0u8; component.size.width as usize * component.size.height as usize];
        let line_stride = component.block_size.width as usize * 8;

        for y in 0..component.size.height as usize {
            let row = &data[0][y * line_stride..][..component.size.width as usize];
            buffer[y * component.size.width as usize..][..component.size.width as usize]
                .copy_from_slice(row);
        }

        Ok(buffer)
    } else {
        let color_convert_func = choose_color_convert_func(components, is_jfif, color_transform);
        let upsampler = Upsampler::new(components)?;
        let line_size = output_size.width as usize * components.len();
        let mut image = vec![0u8; line_size * output_size.height as usize];

        for (row, line) in image.chunks_mut(line_size).enumerate() {
            upsampler.upsample_and_interleave_row(data, row, output_size.width as usize, line);
            color_convert_func(line, output_size.width as usize);
        }

        Ok(image)
    }
}

fn choose_color_convert_func(
    components: &[Component],
    is_jfif: bool,
    color_transform: Option<AdobeColorTransform>,
) -> fn(&mut [u8], usize) {
    // JFIF files are always YCbCr.
    if is_jfif {
        return color::color_convert_line_ycbcr;
    }

    // http://www.sno.phy.queensu.ca/~phil/exiftool/TagNames/JPEG.html#Adobe
    // Unknown means the data is RGB, so we don't need to perform any color
    // conversion on it.
    if color_transform == Some(AdobeColorTransform::Unknown) {
        return color::color_convert_line_null;
    }

    // Component identifiers spelling out "RGB" also mark untransformed data.
    if color_transform.is_none()
        && components.iter().map(|c| c.identifier).eq([b'R', b'G', b'B'])
    {
        return color::color_convert_line_null;
    }

    color::color_convert_line_ycbcr
}
