//! 64-bit byte order helpers for frame length fields

/// Reverse the byte order of `value`
#[inline]
pub const fn swap64(value: u64) -> u64 {
    value.swap_bytes()
}

/// Host order to network (big-endian) order
#[inline]
pub const fn to_network64(value: u64) -> u64 {
    value.to_be()
}

/// Network (big-endian) order to host order
#[inline]
pub const fn from_network64(value: u64) -> u64 {
    u64::from_be(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap64() {
        assert_eq!(swap64(0x0102_0304_0506_0708), 0x0807_0605_0403_0201);
        assert_eq!(swap64(0), 0);
        assert_eq!(swap64(u64::MAX), u64::MAX);
        assert_eq!(swap64(0xff), 0xff00_0000_0000_0000);
    }

    #[test]
    fn test_network_order_bytes() {
        let wire = to_network64(0x0102_0304_0506_0708).to_ne_bytes();
        assert_eq!(wire, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(from_network64(u64::from_ne_bytes(wire)), 0x0102_0304_0506_0708);
    }
}
