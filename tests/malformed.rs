use std::io::Cursor;

use jpeg_codec::{ColorType, Decoder, Encoder, Error, UnsupportedFeature};

fn valid_gray_stream() -> Vec<u8> {
    let mut output = Vec::new();
    Encoder::new(&mut output, 85)
        .encode(&[128u8; 16 * 16], 16, 16, ColorType::Luma)
        .unwrap();
    output
}

fn find_marker(data: &[u8], marker: u8) -> usize {
    data.windows(2)
        .position(|w| w[0] == 0xFF && w[1] == marker)
        .unwrap()
}

#[test]
fn empty_input() {
    let result = Decoder::new(Cursor::new(&[][..])).decode();
    assert!(matches!(result, Err(Error::Data(_))));
}

#[test]
fn missing_soi() {
    let result = Decoder::new(Cursor::new(&[0x00, 0x01, 0x02, 0x03][..])).decode();
    assert!(matches!(result, Err(Error::Format(_))));
}

#[test]
fn truncated_in_headers() {
    let stream = valid_gray_stream();
    let sos = find_marker(&stream, 0xDA);

    let result = Decoder::new(Cursor::new(&stream[..sos + 4])).decode();
    assert!(matches!(result, Err(Error::Data(_))));
}

#[test]
fn truncated_entropy_data() {
    let stream = valid_gray_stream();
    let sos = find_marker(&stream, 0xDA);

    // Cut a few bytes into the entropy-coded data, before the EOI. The
    // entropy-coded tail of a flat image is short, so stay inside it.
    let cut = (sos + 16).min(stream.len() - 4);
    let result = Decoder::new(Cursor::new(&stream[..cut])).decode();
    assert!(matches!(result, Err(Error::Data(_))));
}

#[test]
fn missing_eoi() {
    let stream = valid_gray_stream();

    let result = Decoder::new(Cursor::new(&stream[..stream.len() - 2])).decode();
    assert!(matches!(result, Err(Error::Data(_))));
}

#[test]
fn zero_quantization_table_entry() {
    let mut stream = valid_gray_stream();
    let dqt = find_marker(&stream, 0xDB);

    // Marker, length, Pq/Tq byte, then the 64 zigzagged entries.
    stream[dqt + 5] = 0;

    let result = Decoder::new(Cursor::new(&stream)).decode();
    assert!(matches!(result, Err(Error::Format(_))));
}

#[test]
fn invalid_quantization_table_index() {
    let mut stream = valid_gray_stream();
    let dqt = find_marker(&stream, 0xDB);

    stream[dqt + 4] = 0x04; // Pq = 0, Tq = 4
    let result = Decoder::new(Cursor::new(&stream)).decode();
    assert!(matches!(result, Err(Error::Format(_))));
}

#[test]
fn sixteen_bit_quantization_table() {
    let stream = valid_gray_stream();
    let dqt = find_marker(&stream, 0xDB);
    let length = u16::from_be_bytes([stream[dqt + 2], stream[dqt + 3]]) as usize;

    // Replace the 8-bit table with a 16-bit one (Pq = 1).
    let mut spliced = stream[..dqt].to_vec();
    spliced.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x83, 0x10]);
    spliced.extend(std::iter::repeat(0x01).take(128));
    spliced.extend_from_slice(&stream[dqt + 2 + length..]);

    let result = Decoder::new(Cursor::new(&spliced)).decode();
    assert!(matches!(
        result,
        Err(Error::Unsupported(UnsupportedFeature::QuantizationPrecision(1)))
    ));
}

#[test]
fn invalid_huffman_table_index() {
    let mut stream = valid_gray_stream();
    let dht = find_marker(&stream, 0xC4);

    // Marker, length, then the Tc/Th byte.
    stream[dht + 4] = 0x04; // Tc = 0, Th = 4

    let result = Decoder::new(Cursor::new(&stream)).decode();
    assert!(matches!(result, Err(Error::Format(_))));
}

#[test]
fn sos_before_sof() {
    let stream = valid_gray_stream();
    let sof = find_marker(&stream, 0xC0);
    let sos = find_marker(&stream, 0xDA);

    // Splice the headers so the scan appears before any frame header.
    let mut spliced = stream[..sof].to_vec();
    spliced.extend_from_slice(&stream[sos..]);

    let result = Decoder::new(Cursor::new(&spliced)).decode();
    assert!(matches!(result, Err(Error::Format(_))));
}

#[test]
fn scan_references_missing_huffman_table() {
    let mut stream = valid_gray_stream();
    let sos = find_marker(&stream, 0xDA);

    // Marker, length, component count, component id, then the Td/Ta byte.
    stream[sos + 6] = 0x11;

    let result = Decoder::new(Cursor::new(&stream)).decode();
    assert!(matches!(result, Err(Error::Format(_))));
}

#[test]
fn info_unavailable_before_decoding() {
    let stream = valid_gray_stream();
    let decoder = Decoder::new(Cursor::new(&stream));
    assert!(decoder.info().is_none());
}

#[test]
fn read_info_parses_headers_only() {
    let stream = valid_gray_stream();
    let mut decoder = Decoder::new(Cursor::new(&stream));

    decoder.read_info().unwrap();
    let info = decoder.info().unwrap();
    assert_eq!(info.width, 16);
    assert_eq!(info.height, 16);
}
