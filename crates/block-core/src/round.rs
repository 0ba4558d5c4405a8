//! RC6 round transformations.

/// `log2` of the word size, the fixed rotation inside the quadratic function.
const LG_W: u32 = 5;

/// `f(x) = (x * (2x + 1)) <<< lg w`, modulo 2^32.
#[inline]
pub(crate) fn quadratic(x: u32) -> u32 {
    x.wrapping_mul(x.wrapping_mul(2).wrapping_add(1))
        .rotate_left(LG_W)
}

/// One forward round over `(A, B, C, D)`, followed by the register rotation.
///
/// Rotation amounts come from the state; `rotate_left` reduces them modulo 32.
#[inline]
pub(crate) fn forward_round(state: &mut [u32; 4], k_even: u32, k_odd: u32) {
    let [a, b, c, d] = *state;
    let t = quadratic(b);
    let u = quadratic(d);
    let a = (a ^ t).rotate_left(u).wrapping_add(k_even);
    let c = (c ^ u).rotate_left(t).wrapping_add(k_odd);
    *state = [b, c, d, a];
}

/// Undoes [`forward_round`] with the same round-key pair.
#[inline]
pub(crate) fn inverse_round(state: &mut [u32; 4], k_even: u32, k_odd: u32) {
    let [b, c, d, a] = *state;
    let u = quadratic(d);
    let t = quadratic(b);
    let c = c.wrapping_sub(k_odd).rotate_right(t) ^ u;
    let a = a.wrapping_sub(k_even).rotate_right(u) ^ t;
    *state = [a, b, c, d];
}

/// Reads a block as four little-endian words.
#[inline]
pub(crate) fn load_words(block: &[u8]) -> [u32; 4] {
    core::array::from_fn(|i| {
        let o = i * 4;
        u32::from_le_bytes([block[o], block[o + 1], block[o + 2], block[o + 3]])
    })
}

/// Writes four words back as little-endian bytes.
#[inline]
pub(crate) fn store_words(words: &[u32; 4], block: &mut [u8]) {
    for (chunk, word) in block.chunks_exact_mut(4).zip(words.iter()) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
}
