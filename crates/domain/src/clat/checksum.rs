//! Internet checksum arithmetic over big-endian 16-bit words.

/// Unfolded ones'-complement sum. An odd trailing byte is padded with zero.
pub fn sum16(bytes: &[u8]) -> u32 {
    bytes
        .chunks(2)
        .map(|w| u32::from(u16::from_be_bytes([w[0], w.get(1).copied().unwrap_or(0)])))
        .fold(0u32, u32::wrapping_add)
}

/// Sum of the bitwise negation of every word: subtracting `bytes` from a
/// running checksum.
pub fn sum16_negated(bytes: &[u8]) -> u32 {
    bytes
        .chunks(2)
        .map(|w| u32::from(!u16::from_be_bytes([w[0], w.get(1).copied().unwrap_or(0)])))
        .fold(0u32, u32::wrapping_add)
}

/// Collapse a 32-bit sum into 16 bits with end-around carry.
pub fn fold(sum: u32) -> u16 {
    let sum = (sum & 0xFFFF) + (sum >> 16);
    let sum = (sum & 0xFFFF) + (sum >> 16);
    sum as u16
}

/// 32-bit ones'-complement addition (`csum_add`).
pub fn csum_add(csum: u32, addend: u32) -> u32 {
    let (res, carry) = csum.overflowing_add(addend);
    res.wrapping_add(u32::from(carry))
}

/// Checksum field value for an IPv4 header whose checksum field is zero.
pub fn ipv4_header_checksum(header: &[u8]) -> u16 {
    !fold(sum16(header))
}

/// A received IPv4 header verifies when its folded sum is `0xFFFF`.
pub fn ipv4_header_valid(header: &[u8]) -> bool {
    fold(sum16(header)) == 0xFFFF
}
