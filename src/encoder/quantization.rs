use crate::zigzag::UNZIGZAG;

/// Luminance quantization table from ISO/IEC 10918-1, Annex K.1, in zigzag
/// order.
#[rustfmt::skip]
pub const DEFAULT_LUMA_TABLE: [u8; 64] = [
    16, 11, 12, 14, 12, 10, 16, 14,
    13, 14, 18, 17, 16, 19, 24, 40,
    26, 24, 22, 22, 24, 49, 35, 37,
    29, 40, 58, 51, 61, 60, 57, 51,
    56, 55, 64, 72, 92, 78, 64, 68,
    87, 69, 55, 56, 80, 109, 81, 87,
    95, 98, 103, 104, 103, 62, 77, 113,
    121, 112, 100, 120, 92, 101, 103, 99,
];

/// Chrominance quantization table from ISO/IEC 10918-1, Annex K.1, in zigzag
/// order.
#[rustfmt::skip]
pub const DEFAULT_CHROMA_TABLE: [u8; 64] = [
    17, 18, 18, 24, 21, 24, 47, 26,
    26, 47, 99, 66, 56, 66, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
];

// The forward DCT leaves each coefficient scaled by 8 and by the AAN scale
// factor of its row and column, so the quantization divisors absorb all
// three factors.
const AAN_SCALE_FACTORS: [f32; 8] = [
    1.0,
    1.387039845,
    1.306562965,
    1.175875602,
    1.0,
    0.785694958,
    0.541196100,
    0.275899379,
];

/// A quantization table scaled to a quality setting, with the forward DCT
/// scale factors folded into the divisors.
pub struct QuantizationTable {
    // Zigzag order, as written to the DQT segment.
    table: [u8; 64],
    // Natural order, matching the DCT output layout.
    divisors: [f32; 64],
}

impl QuantizationTable {
    /// Builds a table from a base table (zigzag order) and a quality setting
    /// between 1 and 100.
    pub fn new_with_quality(base: &[u8; 64], quality: u8) -> QuantizationTable {
        let quality = quality.max(1).min(100);

        // Doubles the table values for every 6 quality steps below 50 and
        // halves them for every 6 steps above.
        let scale = (2.0f32).powf(6.0 * (50 - quality as i32) as f32 / 50.0);

        let mut table = [0u8; 64];

        for (entry, &base_value) in table.iter_mut().zip(base.iter()) {
            let scaled = (base_value as f32 * scale).round();
            *entry = scaled.max(1.0).min(255.0) as u8;
        }

        let mut divisors = [0.0f32; 64];

        for i in 0..64 {
            let natural = UNZIGZAG[i] as usize;
            let row = natural / 8;
            let col = natural % 8;
            divisors[natural] =
                table[i] as f32 * AAN_SCALE_FACTORS[row] * AAN_SCALE_FACTORS[col] * 8.0;
        }

        QuantizationTable { table, divisors }
    }

    /// Returns the table entry at zigzag position `index`, as written to the
    /// DQT segment.
    #[inline]
    pub fn get(&self, index: usize) -> u8 {
        self.table[index]
    }

    /// Returns the quantization divisor for the coefficient at natural
    /// position `index`.
    #[inline]
    pub fn divisor(&self, index: usize) -> f32 {
        self.divisors[index]
    }
}
