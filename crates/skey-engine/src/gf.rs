//! Galois-field arithmetic for MGM and CMAC.
//!
//! Elements are blocks read as little-endian integers, bit `i` being the
//! coefficient of `x^i`. GF(2^128) reduces by `x^128 + x^7 + x^2 + x + 1`,
//! GF(2^64) by `x^64 + x^4 + x^3 + x + 1`. Both multiplications run in a fixed
//! number of steps with masks in place of branches.

use block_core::BlockWidth;

const REDUCTION_128: u128 = 0x87;
const REDUCTION_64: u64 = 0x1b;

#[inline]
fn double_128(v: u128) -> u128 {
    let carry = v >> 127;
    (v << 1) ^ (REDUCTION_128 & carry.wrapping_neg())
}

#[inline]
fn double_64(v: u64) -> u64 {
    let carry = v >> 63;
    (v << 1) ^ (REDUCTION_64 & carry.wrapping_neg())
}

/// Multiplies two elements of GF(2^128).
pub fn mul_128(a: u128, b: u128) -> u128 {
    let mut acc = 0u128;
    let mut x = a;
    for i in 0..128 {
        acc ^= x & ((b >> i) & 1).wrapping_neg();
        x = double_128(x);
    }
    acc
}

/// Multiplies two elements of GF(2^64).
pub fn mul_64(a: u64, b: u64) -> u64 {
    let mut acc = 0u64;
    let mut x = a;
    for i in 0..64 {
        acc ^= x & ((b >> i) & 1).wrapping_neg();
        x = double_64(x);
    }
    acc
}

fn load_128(bytes: &[u8]) -> u128 {
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&bytes[..16]);
    u128::from_le_bytes(buf)
}

fn load_64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

/// Multiplies `block` by `x` in place (one-bit left shift with reduction).
pub fn double(width: BlockWidth, block: &mut [u8]) {
    match width {
        BlockWidth::Bits128 => {
            let v = double_128(load_128(block));
            block[..16].copy_from_slice(&v.to_le_bytes());
        }
        BlockWidth::Bits64 => {
            let v = double_64(load_64(block));
            block[..8].copy_from_slice(&v.to_le_bytes());
        }
    }
}

/// Computes `acc ^= a * b`.
pub fn mul_acc(width: BlockWidth, acc: &mut [u8], a: &[u8], b: &[u8]) {
    match width {
        BlockWidth::Bits128 => {
            let v = load_128(acc) ^ mul_128(load_128(a), load_128(b));
            acc[..16].copy_from_slice(&v.to_le_bytes());
        }
        BlockWidth::Bits64 => {
            let v = load_64(acc) ^ mul_64(load_64(a), load_64(b));
            acc[..8].copy_from_slice(&v.to_le_bytes());
        }
    }
}
