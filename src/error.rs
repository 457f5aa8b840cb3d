use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IoError;
use std::io::ErrorKind;

pub type Result<T> = std::result::Result<T, Error>;

/// An enumeration over JPEG features (currently) unsupported by this library.
///
/// Support for features listed here may be included in future versions of this library.
#[derive(Debug, PartialEq, Eq)]
pub enum UnsupportedFeature {
    /// Hierarchical JPEG.
    Hierarchical,
    /// Lossless JPEG.
    Lossless,
    /// JPEG using arithmetic entropy coding instead of Huffman coding.
    ArithmeticEntropyCoding,
    /// Sample precision in bits. 8 bit sample precision is what is currently supported.
    SamplePrecision(u8),
    /// Quantization table precision in bits. Only 8 bit tables are supported.
    QuantizationPrecision(u8),
    /// Number of components in an image. 1 and 3 components are currently supported.
    ComponentCount(u8),
    /// An image can specify a zero height in the frame header and use the DNL (Define Number of
    /// Lines) marker at the end of the first scan to define the number of lines in the frame.
    DNL,
    /// A subsampling ratio not representable as an integer.
    SubsamplingRatio,
}

/// Errors that can occur while decoding or encoding a JPEG image.
#[derive(Debug)]
pub enum Error {
    /// The marker structure of the image is invalid. The string contains detailed information
    /// about the error.
    Format(String),
    /// The entropy-coded segment data is corrupt.
    Data(String),
    /// The image makes use of a JPEG feature not (currently) supported by this library.
    Unsupported(UnsupportedFeature),
    /// An encoding parameter is outside its legal range. Reported before any output is written.
    Parameter(String),
    /// An I/O error occurred while decoding or encoding the image.
    Io(IoError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Format(ref desc) => write!(f, "invalid JPEG format: {}", desc),
            Error::Data(ref desc) => write!(f, "corrupt JPEG data: {}", desc),
            Error::Unsupported(ref feat) => write!(f, "unsupported JPEG feature: {:?}", feat),
            Error::Parameter(ref desc) => write!(f, "invalid encoding parameter: {}", desc),
            Error::Io(ref err) => err.fmt(f),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Error {
        // A stream that ends in the middle of the image is bad input, not an
        // environment failure.
        if err.kind() == ErrorKind::UnexpectedEof {
            Error::Data("unexpected end of stream".to_owned())
        } else {
            Error::Io(err)
        }
    }
}
