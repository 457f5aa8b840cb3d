//! A pure-Rust JPEG codec: baseline sequential and progressive DCT modes
//! of ISO/IEC 10918-1, decoding and encoding.
//!
//! # Examples
//!
//! ```no_run
//! let file = std::fs::File::open("image.jpg").expect("failed to open file");
//! let mut decoder = jpeg_codec::Decoder::new(std::io::BufReader::new(file));
//! let pixels = decoder.decode().expect("failed to decode image");
//! let info = decoder.info().unwrap();
//! ```
//!
//! ```no_run
//! let pixels = vec![128u8; 3 * 16 * 16];
//! let mut out = Vec::new();
//! let encoder = jpeg_codec::Encoder::new(&mut out, 90);
//! encoder
//!     .encode(&pixels, 16, 16, jpeg_codec::ColorType::Rgb)
//!     .expect("failed to encode image");
//! ```

pub use crate::decoder::{Decoder, ImageInfo, PixelFormat};
pub use crate::encoder::{ColorType, Encoder};
pub use crate::error::{Error, Result, UnsupportedFeature};

mod color;
mod decoder;
mod encoder;
mod error;
mod huffman;
mod idct;
mod marker;
mod parser;
mod upsampler;
mod zigzag;
