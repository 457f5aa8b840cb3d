use std::io::Cursor;

use jpeg_codec::{ColorType, Decoder, Encoder, PixelFormat};

fn decode(data: &[u8]) -> (Vec<u8>, jpeg_codec::ImageInfo) {
    let mut decoder = Decoder::new(Cursor::new(data));
    let pixels = decoder.decode().expect("failed to decode");
    let info = decoder.info().unwrap();
    (pixels, info)
}

fn assert_close(actual: &[u8], expected: &[u8], tolerance: i16) {
    assert_eq!(actual.len(), expected.len());

    for (i, (&a, &e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a as i16 - e as i16).abs() <= tolerance,
            "sample {} differs: {} vs {} (tolerance {})",
            i,
            a,
            e,
            tolerance
        );
    }
}

/// Grayscale image built from flat 8x8 blocks, which only the DC
/// coefficients have to carry.
fn blocky_gray(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height);

    for y in 0..height {
        for x in 0..width {
            data.push(if (x / 8 + y / 8) % 2 == 0 { 64 } else { 192 });
        }
    }

    data
}

#[test]
fn gray_uniform_is_lossless() {
    let pixels = vec![128u8; 16 * 16];
    let mut output = Vec::new();

    Encoder::new(&mut output, 90)
        .encode(&pixels, 16, 16, ColorType::Luma)
        .unwrap();

    let (decoded, info) = decode(&output);
    assert_eq!(info.width, 16);
    assert_eq!(info.height, 16);
    assert_eq!(info.pixel_format, PixelFormat::L8);
    assert_eq!(decoded, pixels);
}

#[test]
fn gray_blocky_roundtrip() {
    let pixels = blocky_gray(32, 32);
    let mut output = Vec::new();

    Encoder::new(&mut output, 90)
        .encode(&pixels, 32, 32, ColorType::Luma)
        .unwrap();

    let (decoded, _) = decode(&output);
    assert_close(&decoded, &pixels, 2);
}

#[test]
fn rgb_uniform_roundtrip() {
    let mut pixels = Vec::with_capacity(32 * 32 * 3);
    for _ in 0..32 * 32 {
        pixels.extend_from_slice(&[200, 100, 50]);
    }

    let mut output = Vec::new();
    Encoder::new(&mut output, 90)
        .encode(&pixels, 32, 32, ColorType::Rgb)
        .unwrap();

    let (decoded, info) = decode(&output);
    assert_eq!(info.pixel_format, PixelFormat::RGB24);
    assert_close(&decoded, &pixels, 4);
}

#[test]
fn rgb_odd_dimensions() {
    let mut pixels = Vec::with_capacity(17 * 13 * 3);
    for _ in 0..17 * 13 {
        pixels.extend_from_slice(&[60, 120, 180]);
    }

    let mut output = Vec::new();
    Encoder::new(&mut output, 85)
        .encode(&pixels, 17, 13, ColorType::Rgb)
        .unwrap();

    let (decoded, info) = decode(&output);
    assert_eq!(info.width, 17);
    assert_eq!(info.height, 13);
    assert_eq!(decoded.len(), 17 * 13 * 3);
    assert_close(&decoded, &pixels, 4);
}

#[test]
fn rgb_without_subsampling() {
    let mut pixels = Vec::with_capacity(16 * 16 * 3);
    for i in 0..16 * 16 {
        let v = if (i / 16 / 8 + i % 16 / 8) % 2 == 0 { 80 } else { 170 };
        pixels.extend_from_slice(&[v, v, v]);
    }

    let mut output = Vec::new();
    let mut encoder = Encoder::new(&mut output, 95);
    encoder.set_sampling_factor(1, 1);
    encoder.encode(&pixels, 16, 16, ColorType::Rgb).unwrap();

    let (decoded, _) = decode(&output);
    assert_close(&decoded, &pixels, 3);
}

// Every coefficient bit emitted across the progressive scan sequence is
// eventually refined down to approximation zero, so the decoded image must
// match the sequential rendition of the same frame exactly.
#[test]
fn progressive_gray_matches_sequential() {
    let pixels = blocky_gray(24, 24);

    let mut sequential = Vec::new();
    Encoder::new(&mut sequential, 80)
        .encode(&pixels, 24, 24, ColorType::Luma)
        .unwrap();

    let mut progressive = Vec::new();
    let mut encoder = Encoder::new(&mut progressive, 80);
    encoder.set_progressive(true);
    encoder.encode(&pixels, 24, 24, ColorType::Luma).unwrap();

    // SOF2 in the progressive stream, SOF0 in the sequential one.
    assert!(progressive.windows(2).any(|w| w == [0xFF, 0xC2]));
    assert!(sequential.windows(2).any(|w| w == [0xFF, 0xC0]));

    assert_eq!(decode(&progressive).0, decode(&sequential).0);
}

#[test]
fn progressive_rgb_matches_sequential() {
    let mut pixels = Vec::with_capacity(32 * 16 * 3);
    for y in 0..16 {
        for x in 0..32 {
            let v = if (x / 8 + y / 8) % 2 == 0 { 40 } else { 210 };
            pixels.extend_from_slice(&[v, 128, 90]);
        }
    }

    let mut sequential = Vec::new();
    Encoder::new(&mut sequential, 75)
        .encode(&pixels, 32, 16, ColorType::Rgb)
        .unwrap();

    let mut progressive = Vec::new();
    let mut encoder = Encoder::new(&mut progressive, 75);
    encoder.set_progressive(true);
    encoder.encode(&pixels, 32, 16, ColorType::Rgb).unwrap();

    assert_eq!(decode(&progressive).0, decode(&sequential).0);
}

#[test]
fn restart_markers_are_written_and_decoded() {
    let pixels = blocky_gray(32, 32);

    let mut plain = Vec::new();
    Encoder::new(&mut plain, 90)
        .encode(&pixels, 32, 32, ColorType::Luma)
        .unwrap();

    let mut with_restarts = Vec::new();
    let mut encoder = Encoder::new(&mut with_restarts, 90);
    encoder.set_restart_interval(4);
    encoder.encode(&pixels, 32, 32, ColorType::Luma).unwrap();

    // 16 MCUs at an interval of 4 puts markers after MCUs 4, 8 and 12,
    // cycling from RST0.
    let restarts: Vec<u8> = with_restarts
        .windows(2)
        .filter(|w| w[0] == 0xFF && (0xD0..=0xD7).contains(&w[1]))
        .map(|w| w[1])
        .collect();
    assert_eq!(restarts, vec![0xD0, 0xD1, 0xD2]);

    assert_eq!(decode(&with_restarts).0, decode(&plain).0);
}

#[test]
fn progressive_with_restart_markers() {
    let pixels = blocky_gray(32, 32);

    let mut plain = Vec::new();
    let mut encoder = Encoder::new(&mut plain, 80);
    encoder.set_progressive(true);
    encoder.encode(&pixels, 32, 32, ColorType::Luma).unwrap();

    let mut with_restarts = Vec::new();
    let mut encoder = Encoder::new(&mut with_restarts, 80);
    encoder.set_progressive(true);
    encoder.set_restart_interval(3);
    encoder.encode(&pixels, 32, 32, ColorType::Luma).unwrap();

    assert_eq!(decode(&with_restarts).0, decode(&plain).0);
}

#[test]
fn optimized_tables_decode_identically() {
    let pixels = blocky_gray(40, 24);

    let mut default_tables = Vec::new();
    Encoder::new(&mut default_tables, 85)
        .encode(&pixels, 40, 24, ColorType::Luma)
        .unwrap();

    let mut optimized = Vec::new();
    let mut encoder = Encoder::new(&mut optimized, 85);
    encoder.set_optimized_huffman_tables(true);
    encoder.encode(&pixels, 40, 24, ColorType::Luma).unwrap();

    // Same coefficients, different entropy coding.
    assert_eq!(decode(&optimized).0, decode(&default_tables).0);
}

#[test]
fn optimized_tables_progressive_rgb() {
    let mut pixels = Vec::with_capacity(24 * 24 * 3);
    for y in 0..24u8 {
        for x in 0..24u8 {
            let v = if (x / 8 + y / 8) % 2 == 0 { 30 } else { 220 };
            pixels.extend_from_slice(&[v, 140, 100]);
        }
    }

    let mut default_tables = Vec::new();
    let mut encoder = Encoder::new(&mut default_tables, 80);
    encoder.set_progressive(true);
    encoder.encode(&pixels, 24, 24, ColorType::Rgb).unwrap();

    let mut optimized = Vec::new();
    let mut encoder = Encoder::new(&mut optimized, 80);
    encoder.set_progressive(true);
    encoder.set_optimized_huffman_tables(true);
    encoder.encode(&pixels, 24, 24, ColorType::Rgb).unwrap();

    assert_eq!(decode(&optimized).0, decode(&default_tables).0);
}

// The fixed tables of Annex K define no codes for multi-block EOB runs, so
// progressive frames must derive their Huffman tables from the image even
// when optimized tables were not requested. A flat 64x64 image turns every
// AC scan into a single 64-block EOB run.
#[test]
fn progressive_defaults_handle_long_eob_runs() {
    let pixels = vec![128u8; 64 * 64];

    let mut output = Vec::new();
    let mut encoder = Encoder::new(&mut output, 90);
    encoder.set_progressive(true);
    encoder.encode(&pixels, 64, 64, ColorType::Luma).unwrap();

    let (decoded, info) = decode(&output);
    assert_eq!(info.pixel_format, PixelFormat::L8);
    assert_eq!(decoded, pixels);
}

#[test]
fn comment_segment_is_embedded() {
    let pixels = vec![128u8; 16 * 16];
    let mut output = Vec::new();

    let mut encoder = Encoder::new(&mut output, 90);
    encoder.set_comment("created for testing");
    encoder.encode(&pixels, 16, 16, ColorType::Luma).unwrap();

    let com = output
        .windows(2)
        .position(|w| w == [0xFF, 0xFE])
        .expect("no COM segment");
    let length = u16::from_be_bytes([output[com + 2], output[com + 3]]) as usize;
    assert_eq!(&output[com + 4..com + 2 + length], b"created for testing");

    // The comment does not disturb decoding and is surfaced by the decoder.
    let mut decoder = Decoder::new(Cursor::new(&output));
    assert_eq!(decoder.decode().unwrap(), pixels);
    assert_eq!(decoder.comment(), Some(&b"created for testing"[..]));
}

#[test]
fn ycbcr_input_skips_color_conversion() {
    // Flat YCbCr gray: Y=128, Cb=Cr=128 decodes to RGB (128, 128, 128).
    let mut pixels = Vec::with_capacity(16 * 16 * 3);
    for _ in 0..16 * 16 {
        pixels.extend_from_slice(&[128, 128, 128]);
    }

    let mut output = Vec::new();
    Encoder::new(&mut output, 90)
        .encode(&pixels, 16, 16, ColorType::Ycbcr)
        .unwrap();

    let (decoded, _) = decode(&output);
    assert_close(&decoded, &pixels, 2);
}
