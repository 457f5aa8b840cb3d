//! Fixed-point color space conversions between RGB and the JFIF flavor of
//! YCbCr (ITU-R BT.601 coefficients, full range).

/// Converts one pixel from YCbCr to RGB. Coefficients are scaled by 2^16
/// and rounded.
pub fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> (u8, u8, u8) {
    let y = (y as i32) << 16;
    let cb = cb as i32 - 128;
    let cr = cr as i32 - 128;

    let r = y + 91881 * cr;
    let g = y - 22554 * cb - 46802 * cr;
    let b = y + 116130 * cb;

    (
        clamp16(r + (1 << 15)),
        clamp16(g + (1 << 15)),
        clamp16(b + (1 << 15)),
    )
}

/// Converts one pixel from RGB to YCbCr.
pub fn rgb_to_ycbcr(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let r = r as i32;
    let g = g as i32;
    let b = b as i32;

    let y = 19595 * r + 38470 * g + 7471 * b;
    let cb = -11059 * r - 21709 * g + 32768 * b + (128 << 16);
    let cr = 32768 * r - 27439 * g - 5329 * b + (128 << 16);

    (
        clamp16(y + (1 << 15)),
        clamp16(cb + (1 << 15)),
        clamp16(cr + (1 << 15)),
    )
}

#[inline]
fn clamp16(value: i32) -> u8 {
    (value >> 16).max(0).min(255) as u8
}

pub fn color_convert_line_ycbcr(data: &mut [u8], width: usize) {
    for i in 0..width {
        let (r, g, b) = ycbcr_to_rgb(data[i * 3], data[i * 3 + 1], data[i * 3 + 2]);

        data[i * 3] = r;
        data[i * 3 + 1] = g;
        data[i * 3 + 2] = b;
    }
}

pub fn color_convert_line_null(_data: &mut [u8], _width: usize) {}
