
/// Helper functions for bit operations
pub mod bits {
    /// Calculates the number of bits a rust type requires
    pub const fn bit_size<T>() -> u32 {
        (std::mem::size_of::<T>() * 8) as u32
    }

    /// Calculates the minimum number of bits required to index `n` slots
    pub fn min_bits(n: u32) -> u32 {
        if n <= 1 {
            return 0;
        }
        bit_size::<u32>() - (n - 1).leading_zeros()
    }

    /// Checks if a number is a power of 2
    pub fn is_pow2(n: u32) -> bool {
        n.count_ones() == 1
    }

    /// Mask covering the low `n` bits
    pub const fn low_mask(n: u32) -> u32 {
        if n >= bit_size::<u32>() {
            u32::MAX
        } else {
            (1 << n) - 1
        }
    }

    /// Splits a u32 into (high, low) at bit index `n`. For `n >= 32` everything is low.
    pub fn split_at(x: u32, n: u32) -> (u32, u32) {
        let mask = low_mask(n);
        let right = x & mask;
        let left = (x & !mask).checked_shr(n).unwrap_or(0);
        (left, right)
    }

    /// Inverse of [`split_at`]
    pub fn join_at(left: u32, right: u32, n: u32) -> u32 {
        left.checked_shl(n).unwrap_or(0) | (right & low_mask(n))
    }

}
