/// Zigzag ordering, Figure A.6. `UNZIGZAG[i]` is the natural (row-major)
/// index of the i-th coefficient in scan order.
pub const UNZIGZAG: [u8; 64] = [
     0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// Inverse of [`UNZIGZAG`]: `ZIGZAG[n]` is the scan-order position of the
/// coefficient at natural index n.
pub const ZIGZAG: [u8; 64] = [
     0,  1,  5,  6, 14, 15, 27, 28,
     2,  4,  7, 13, 16, 26, 29, 42,
     3,  8, 12, 17, 25, 30, 41, 43,
     9, 11, 18, 24, 31, 40, 44, 53,
    10, 19, 23, 32, 39, 45, 52, 54,
    20, 22, 33, 38, 46, 51, 55, 60,
    21, 34, 37, 47, 50, 56, 59, 61,
    35, 36, 48, 49, 57, 58, 62, 63,
];

#[cfg(test)]
mod tests {
    use super::{UNZIGZAG, ZIGZAG};

    #[test]
    fn tables_are_inverse_permutations() {
        for i in 0..64 {
            assert_eq!(ZIGZAG[UNZIGZAG[i] as usize], i as u8);
            assert_eq!(UNZIGZAG[ZIGZAG[i] as usize], i as u8);
        }
    }

    #[test]
    fn scan_order_walks_antidiagonals() {
        // Successive scan positions stay on the same antidiagonal or move
        // to the next one.
        for i in 1..64 {
            let prev = UNZIGZAG[i - 1] as usize;
            let cur = UNZIGZAG[i] as usize;
            let prev_diag = prev / 8 + prev % 8;
            let cur_diag = cur / 8 + cur % 8;
            assert!(cur_diag == prev_diag || cur_diag == prev_diag + 1);
        }
    }
}
