//! Block primitive contract and the RC6 reference cipher.
//!
//! This crate provides:
//! - The [`BlockPrimitive`] trait every cipher plugs into (sizes, key
//!   schedule, single-block transforms).
//! - RC6-32/20/32: 128-bit block, 256-bit key, 20 rounds.
//! - Block helpers shared by the chaining modes.
//!
//! Blocks are little-endian throughout: RC6 reads a block as four
//! little-endian 32-bit words.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod block;
mod cipher;
mod key;
mod primitive;
mod round;

pub use crate::block::{increment_le, xor_in_place, MAX_BLOCK_SIZE};
pub use crate::cipher::Rc6;
pub use crate::key::Rc6Schedule;
pub use crate::primitive::{BlockPrimitive, BlockWidth};
