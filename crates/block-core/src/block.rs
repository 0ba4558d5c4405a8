//! Block representation helpers.

/// Largest block handled by the workspace, in bytes.
pub const MAX_BLOCK_SIZE: usize = 16;

/// XORs `rhs` into `dst` over their common length.
#[inline]
pub fn xor_in_place(dst: &mut [u8], rhs: &[u8]) {
    for (d, r) in dst.iter_mut().zip(rhs.iter()) {
        *d ^= *r;
    }
}

/// Adds one to `block` read as a little-endian integer, wrapping at its width.
#[inline]
pub fn increment_le(block: &mut [u8]) {
    for byte in block.iter_mut() {
        let (next, carry) = byte.overflowing_add(1);
        *byte = next;
        if !carry {
            break;
        }
    }
}
