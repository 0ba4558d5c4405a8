//! The contract shared by every block primitive.

use core::fmt;

/// Block widths the chaining modes and field arithmetic know how to drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockWidth {
    /// 64-bit blocks.
    Bits64,
    /// 128-bit blocks.
    Bits128,
}

impl BlockWidth {
    /// Maps a block size in bytes onto a supported width.
    pub const fn from_bytes(size: usize) -> Option<Self> {
        match size {
            8 => Some(Self::Bits64),
            16 => Some(Self::Bits128),
            _ => None,
        }
    }

    /// Block size in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            Self::Bits64 => 8,
            Self::Bits128 => 16,
        }
    }

    /// Half a block, in bytes.
    pub const fn half(self) -> usize {
        self.bytes() / 2
    }
}

/// A fixed-size block cipher: key schedule plus single-block transforms.
///
/// Implementations hold no per-key state. Round keys live in storage owned by
/// the caller, sized by [`round_key_words`](Self::round_key_words), so one
/// descriptor can be shared by any number of key contexts.
pub trait BlockPrimitive: fmt::Debug + Send + Sync {
    /// Algorithm name.
    fn name(&self) -> &'static str;

    /// Block size in bytes.
    fn block_size(&self) -> usize;

    /// Key size in bytes.
    fn key_size(&self) -> usize;

    /// Number of 32-bit words of round-key material.
    fn round_key_words(&self) -> usize;

    /// Number of block operations one key may perform before it must be replaced.
    fn max_blocks(&self) -> u64;

    /// Expands `key` (exactly [`key_size`](Self::key_size) bytes) into `round_keys`.
    fn schedule(&self, key: &[u8], round_keys: &mut [u32]);

    /// Encrypts one block in place.
    fn encrypt(&self, round_keys: &[u32], block: &mut [u8]);

    /// Decrypts one block in place.
    fn decrypt(&self, round_keys: &[u32], block: &mut [u8]);
}
