//! ECB, CBC, CFB, OFB and CTR over a [`SecretKey`].
//!
//! Each call is self-contained: chaining state lives only for the call and is
//! seeded from the IV passed in. Output is returned as a fresh buffer, so a
//! failing call leaves nothing half-written.
//!
//! CBC, CFB and OFB take an IV of one or more whole blocks. With `z` IV blocks
//! the mode keeps `z` independent chaining states and block `i` uses state
//! `i mod z`; `z = 1` is the textbook mode. CTR takes half a block of IV,
//! placed in the upper half of the counter with the lower half zeroed.
//!
//! Stream modes (CFB, OFB, CTR) accept any non-empty length; a trailing
//! partial block uses the most significant (trailing) bytes of its keystream
//! block.

use block_core::{increment_le, xor_in_place, MAX_BLOCK_SIZE};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{try_copy, IvLength, Reported, Result, SkeyError};
use crate::skey::SecretKey;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encrypt,
    Decrypt,
}

/// XORs a keystream block into a data chunk of up to one block.
#[inline]
fn apply_keystream(chunk: &mut [u8], keystream: &[u8]) {
    let offset = keystream.len() - chunk.len();
    xor_in_place(chunk, &keystream[offset..]);
}

impl SecretKey {
    /// Electronic codebook encryption. `input` must be whole blocks.
    pub fn encrypt_ecb(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        self.ecb(input, Direction::Encrypt).reported("SecretKey::encrypt_ecb")
    }

    /// Electronic codebook decryption. `input` must be whole blocks.
    pub fn decrypt_ecb(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        self.ecb(input, Direction::Decrypt).reported("SecretKey::decrypt_ecb")
    }

    /// Cipher block chaining encryption.
    pub fn encrypt_cbc(&mut self, input: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
        self.cbc(input, iv, Direction::Encrypt).reported("SecretKey::encrypt_cbc")
    }

    /// Cipher block chaining decryption.
    pub fn decrypt_cbc(&mut self, input: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
        self.cbc(input, iv, Direction::Decrypt).reported("SecretKey::decrypt_cbc")
    }

    /// Cipher feedback encryption.
    pub fn encrypt_cfb(&mut self, input: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
        self.cfb(input, iv, Direction::Encrypt).reported("SecretKey::encrypt_cfb")
    }

    /// Cipher feedback decryption.
    pub fn decrypt_cfb(&mut self, input: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
        self.cfb(input, iv, Direction::Decrypt).reported("SecretKey::decrypt_cfb")
    }

    /// Output feedback; the same call encrypts and decrypts.
    pub fn ofb(&mut self, input: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
        self.ofb_inner(input, iv).reported("SecretKey::ofb")
    }

    /// Counter mode; the same call encrypts and decrypts.
    pub fn ctr(&mut self, input: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
        self.ctr_inner(input, iv).reported("SecretKey::ctr")
    }

    fn ecb(&mut self, input: &[u8], direction: Direction) -> Result<Vec<u8>> {
        let bs = self.block_size();
        let blocks = self.aligned_blocks(input)?;
        let mut out = try_copy(input)?;
        let cipher = self.begin(blocks)?;
        for chunk in out.chunks_exact_mut(bs) {
            match direction {
                Direction::Encrypt => cipher.encrypt(chunk),
                Direction::Decrypt => cipher.decrypt(chunk),
            }
        }
        Ok(out)
    }

    fn cbc(&mut self, input: &[u8], iv: &[u8], direction: Direction) -> Result<Vec<u8>> {
        let bs = self.block_size();
        let blocks = self.aligned_blocks(input)?;
        let mut register = self.register(iv)?;
        let slots = register.len() / bs;
        let mut out = try_copy(input)?;
        let cipher = self.begin(blocks)?;

        let mut saved = [0u8; MAX_BLOCK_SIZE];
        for (i, chunk) in out.chunks_exact_mut(bs).enumerate() {
            let slot = &mut register[(i % slots) * bs..][..bs];
            match direction {
                Direction::Encrypt => {
                    xor_in_place(chunk, slot);
                    cipher.encrypt(chunk);
                    slot.copy_from_slice(chunk);
                }
                Direction::Decrypt => {
                    saved[..bs].copy_from_slice(chunk);
                    cipher.decrypt(chunk);
                    xor_in_place(chunk, slot);
                    slot.copy_from_slice(&saved[..bs]);
                }
            }
        }
        saved.zeroize();
        Ok(out)
    }

    fn cfb(&mut self, input: &[u8], iv: &[u8], direction: Direction) -> Result<Vec<u8>> {
        let bs = self.block_size();
        let blocks = self.stream_blocks(input)?;
        let mut register = self.register(iv)?;
        let slots = register.len() / bs;
        let mut out = try_copy(input)?;
        let cipher = self.begin(blocks)?;

        let mut keystream = [0u8; MAX_BLOCK_SIZE];
        for (i, chunk) in out.chunks_mut(bs).enumerate() {
            let slot = &mut register[(i % slots) * bs..][..bs];
            keystream[..bs].copy_from_slice(slot);
            cipher.encrypt(&mut keystream[..bs]);
            if chunk.len() == bs && direction == Direction::Decrypt {
                slot.copy_from_slice(chunk);
            }
            apply_keystream(chunk, &keystream[..bs]);
            if chunk.len() == bs && direction == Direction::Encrypt {
                slot.copy_from_slice(chunk);
            }
        }
        keystream.zeroize();
        Ok(out)
    }

    fn ofb_inner(&mut self, input: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
        let bs = self.block_size();
        let blocks = self.stream_blocks(input)?;
        let mut register = self.register(iv)?;
        let slots = register.len() / bs;
        let mut out = try_copy(input)?;
        let cipher = self.begin(blocks)?;

        for (i, chunk) in out.chunks_mut(bs).enumerate() {
            let slot = &mut register[(i % slots) * bs..][..bs];
            cipher.encrypt(slot);
            apply_keystream(chunk, slot);
        }
        Ok(out)
    }

    fn ctr_inner(&mut self, input: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
        let bs = self.block_size();
        let half = self.width().half();
        if iv.len() != half {
            return Err(SkeyError::InvalidIvLength {
                expected: IvLength::Exactly(half),
                actual: iv.len(),
            });
        }
        let blocks = self.stream_blocks(input)?;
        let mut out = try_copy(input)?;
        let cipher = self.begin(blocks)?;

        let mut counter = [0u8; MAX_BLOCK_SIZE];
        counter[half..bs].copy_from_slice(iv);
        let mut keystream = [0u8; MAX_BLOCK_SIZE];
        for chunk in out.chunks_mut(bs) {
            keystream[..bs].copy_from_slice(&counter[..bs]);
            cipher.encrypt(&mut keystream[..bs]);
            apply_keystream(chunk, &keystream[..bs]);
            increment_le(&mut counter[..bs]);
        }
        counter.zeroize();
        keystream.zeroize();
        Ok(out)
    }

    /// Block count for ECB/CBC input, which must be whole blocks.
    fn aligned_blocks(&self, input: &[u8]) -> Result<u64> {
        if input.is_empty() {
            return Err(SkeyError::InvalidArgument { reason: "input is empty" });
        }
        let bs = self.block_size();
        if input.len() % bs != 0 {
            return Err(SkeyError::InvalidDataLength {
                block_size: bs,
                actual: input.len(),
            });
        }
        Ok((input.len() / bs) as u64)
    }

    /// Block count for stream-mode input of any non-empty length.
    fn stream_blocks(&self, input: &[u8]) -> Result<u64> {
        if input.is_empty() {
            return Err(SkeyError::InvalidArgument { reason: "input is empty" });
        }
        Ok(input.len().div_ceil(self.block_size()) as u64)
    }

    /// Copies a whole-block IV into a scratch register.
    fn register(&self, iv: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let bs = self.block_size();
        if iv.is_empty() || iv.len() % bs != 0 {
            return Err(SkeyError::InvalidIvLength {
                expected: IvLength::MultipleOf(bs),
                actual: iv.len(),
            });
        }
        Ok(Zeroizing::new(try_copy(iv)?))
    }
}
