use crate::encoder::quantization::QuantizationTable;
use crate::zigzag::ZIGZAG;

/// In-place forward DCT, based on the float AAN algorithm from jfdctflt.c
/// (Arai, Agui, Nakajima 1988).
///
/// The output is scaled: coefficient (u, v) is larger than the mathematical
/// DCT value by a factor of 8 * scale(u) * scale(v). The quantization
/// divisors compensate for this.
pub fn forward_dct(block: &mut [f32; 64]) {
    // rows
    for i in 0..8 {
        let row = i * 8;

        let tmp0 = block[row] + block[row + 7];
        let tmp7 = block[row] - block[row + 7];
        let tmp1 = block[row + 1] + block[row + 6];
        let tmp6 = block[row + 1] - block[row + 6];
        let tmp2 = block[row + 2] + block[row + 5];
        let tmp5 = block[row + 2] - block[row + 5];
        let tmp3 = block[row + 3] + block[row + 4];
        let tmp4 = block[row + 3] - block[row + 4];

        // Even part
        let tmp10 = tmp0 + tmp3;
        let tmp13 = tmp0 - tmp3;
        let tmp11 = tmp1 + tmp2;
        let tmp12 = tmp1 - tmp2;

        block[row] = tmp10 + tmp11;
        block[row + 4] = tmp10 - tmp11;

        let z1 = (tmp12 + tmp13) * 0.707106781;
        block[row + 2] = tmp13 + z1;
        block[row + 6] = tmp13 - z1;

        // Odd part
        let tmp10 = tmp4 + tmp5;
        let tmp11 = tmp5 + tmp6;
        let tmp12 = tmp6 + tmp7;

        let z5 = (tmp10 - tmp12) * 0.382683433;
        let z2 = 0.541196100 * tmp10 + z5;
        let z4 = 1.306562965 * tmp12 + z5;
        let z3 = tmp11 * 0.707106781;

        let z11 = tmp7 + z3;
        let z13 = tmp7 - z3;

        block[row + 5] = z13 + z2;
        block[row + 3] = z13 - z2;
        block[row + 1] = z11 + z4;
        block[row + 7] = z11 - z4;
    }

    // columns
    for i in 0..8 {
        let tmp0 = block[i] + block[i + 56];
        let tmp7 = block[i] - block[i + 56];
        let tmp1 = block[i + 8] + block[i + 48];
        let tmp6 = block[i + 8] - block[i + 48];
        let tmp2 = block[i + 16] + block[i + 40];
        let tmp5 = block[i + 16] - block[i + 40];
        let tmp3 = block[i + 24] + block[i + 32];
        let tmp4 = block[i + 24] - block[i + 32];

        // Even part
        let tmp10 = tmp0 + tmp3;
        let tmp13 = tmp0 - tmp3;
        let tmp11 = tmp1 + tmp2;
        let tmp12 = tmp1 - tmp2;

        block[i] = tmp10 + tmp11;
        block[i + 32] = tmp10 - tmp11;

        let z1 = (tmp12 + tmp13) * 0.707106781;
        block[i + 16] = tmp13 + z1;
        block[i + 48] = tmp13 - z1;

        // Odd part
        let tmp10 = tmp4 + tmp5;
        let tmp11 = tmp5 + tmp6;
        let tmp12 = tmp6 + tmp7;

        let z5 = (tmp10 - tmp12) * 0.382683433;
        let z2 = 0.541196100 * tmp10 + z5;
        let z4 = 1.306562965 * tmp12 + z5;
        let z3 = tmp11 * 0.707106781;

        let z11 = tmp7 + z3;
        let z13 = tmp7 - z3;

        block[i + 40] = z13 + z2;
        block[i + 24] = z13 - z2;
        block[i + 8] = z11 + z4;
        block[i + 56] = z11 - z4;
    }
}

/// Transforms one block of level-shifted samples into quantized coefficients
/// in zigzag order, rounding half away from zero.
pub fn transform_block(samples: &[f32; 64], table: &QuantizationTable) -> [i16; 64] {
    let mut block = *samples;
    forward_dct(&mut block);

    let mut quantized = [0i16; 64];

    for i in 0..64 {
        let value = block[i] / table.divisor(i);
        let rounded = if value >= 0.0 {
            (value + 0.5) as i32
        } else {
            (value - 0.5) as i32
        };

        quantized[ZIGZAG[i] as usize] = rounded as i16;
    }

    quantized
}

#[cfg(test)]
mod tests {
    use super::{forward_dct, transform_block};
    use crate::encoder::quantization::{QuantizationTable, DEFAULT_LUMA_TABLE};
    use crate::idct::dequantize_and_idct_block;
    use crate::zigzag::UNZIGZAG;

    #[test]
    fn flat_block_transforms_to_dc_only() {
        // Level-shifted value 12 in every sample.
        let mut block = [12.0f32; 64];
        forward_dct(&mut block);

        // The DC coefficient carries the 8x scale; everything else is zero.
        assert!((block[0] - 64.0 * 12.0).abs() < 1e-3);
        for &coefficient in &block[1..] {
            assert!(coefficient.abs() < 1e-3);
        }
    }

    #[test]
    fn quantized_flat_block() {
        let table = QuantizationTable::new_with_quality(&DEFAULT_LUMA_TABLE, 50);
        let quantized = transform_block(&[12.0f32; 64], &table);

        // 64 * 12 / (16 * 8) = 6
        assert_eq!(quantized[0], 6);
        assert_eq!(&quantized[1..], &[0i16; 63][..]);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        let table = QuantizationTable::new_with_quality(&DEFAULT_LUMA_TABLE, 50);
        // DC divisor is 128; 64 samples of value 1.0 give a scaled DC of 64,
        // exactly half a quantization step.
        let quantized = transform_block(&[1.0f32; 64], &table);
        assert_eq!(quantized[0], 1);

        let quantized = transform_block(&[-1.0f32; 64], &table);
        assert_eq!(quantized[0], -1);
    }

    #[test]
    fn round_trips_through_the_inverse_transform() {
        let table = QuantizationTable::new_with_quality(&DEFAULT_LUMA_TABLE, 100);

        // A smooth gradient survives a quality 100 round trip almost exactly.
        let mut samples = [0u8; 64];
        for y in 0..8 {
            for x in 0..8 {
                samples[y * 8 + x] = (100 + 3 * x + 5 * y) as u8;
            }
        }

        let mut shifted = [0.0f32; 64];
        for i in 0..64 {
            shifted[i] = samples[i] as f32 - 128.0;
        }

        let quantized = transform_block(&shifted, &table);

        // Undo the zigzag and build the dequantization table the decoder
        // would have parsed.
        let mut natural_coefficients = [0i16; 64];
        let mut natural_quant = [0u16; 64];
        for i in 0..64 {
            natural_coefficients[UNZIGZAG[i] as usize] = quantized[i];
            natural_quant[UNZIGZAG[i] as usize] = table.get(i) as u16;
        }

        let mut output = [0u8; 64];
        dequantize_and_idct_block(&natural_coefficients, &natural_quant, 8, &mut output);

        for i in 0..64 {
            assert!(
                (output[i] as i16 - samples[i] as i16).abs() <= 2,
                "sample {} diverged: {} vs {}",
                i,
                output[i],
                samples[i]
            );
        }
    }
}
