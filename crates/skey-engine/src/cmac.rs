//! Block-cipher MAC with field-doubled subkeys (OMAC1 construction).
//!
//! `K1 = 2·E(0)`, `K2 = 2·K1` in the block's Galois field. The last block is
//! XORed with `K1` when complete, or padded and XORed with `K2` otherwise.
//! Padding places the final bytes in the most significant end of the block,
//! a `0x80` byte just below them and zeros beneath. Tags are truncated to
//! their most significant (trailing) bytes.

use block_core::{xor_in_place, MAX_BLOCK_SIZE};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::{Reported, Result, SkeyError};
use crate::gf;
use crate::skey::SecretKey;

impl SecretKey {
    /// Computes a `tag_len`-byte MAC over `message`. Empty messages are valid.
    pub fn cmac(&mut self, message: &[u8], tag_len: usize) -> Result<Vec<u8>> {
        self.cmac_inner(message, tag_len).reported("SecretKey::cmac")
    }

    /// Recomputes the MAC and compares it with `tag` in constant time.
    pub fn verify_cmac(&mut self, message: &[u8], tag: &[u8]) -> Result<()> {
        let result = self.cmac_inner(message, tag.len()).and_then(|expected| {
            if bool::from(expected.ct_eq(tag)) {
                Ok(())
            } else {
                Err(SkeyError::AuthenticationFailed)
            }
        });
        result.reported("SecretKey::verify_cmac")
    }

    fn cmac_inner(&mut self, message: &[u8], tag_len: usize) -> Result<Vec<u8>> {
        let bs = self.block_size();
        if tag_len == 0 || tag_len > bs {
            return Err(SkeyError::InvalidTagLength { max: bs, actual: tag_len });
        }
        let blocks = message.len().div_ceil(bs).max(1);
        let cipher = self.begin(blocks as u64 + 1)?;
        let width = cipher.width();

        let mut k1 = [0u8; MAX_BLOCK_SIZE];
        cipher.encrypt(&mut k1[..bs]);
        gf::double(width, &mut k1[..bs]);
        let mut k2 = k1;
        gf::double(width, &mut k2[..bs]);

        let (head, last) = message.split_at((blocks - 1) * bs);
        let mut state = [0u8; MAX_BLOCK_SIZE];
        for chunk in head.chunks_exact(bs) {
            xor_in_place(&mut state[..bs], chunk);
            cipher.encrypt(&mut state[..bs]);
        }

        if last.len() == bs {
            xor_in_place(&mut state[..bs], last);
            xor_in_place(&mut state[..bs], &k1[..bs]);
        } else {
            let offset = bs - last.len();
            let mut padded = [0u8; MAX_BLOCK_SIZE];
            padded[offset..bs].copy_from_slice(last);
            padded[offset - 1] = 0x80;
            xor_in_place(&mut state[..bs], &padded[..bs]);
            xor_in_place(&mut state[..bs], &k2[..bs]);
            padded.zeroize();
        }
        cipher.encrypt(&mut state[..bs]);

        let tag = state[bs - tag_len..bs].to_vec();
        k1.zeroize();
        k2.zeroize();
        state.zeroize();
        Ok(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Algorithm, KeyConfig};
    use block_core::Rc6Schedule;

    fn keyed() -> SecretKey {
        let config = KeyConfig::default()
            .with_seed(3)
            .with_rc6_schedule(Rc6Schedule::Keyed);
        let mut skey = SecretKey::create(Algorithm::Rc6, &config).unwrap();
        skey.set_key(&[0x5cu8; 32]).unwrap();
        skey
    }

    #[test]
    fn empty_message_is_one_padded_block() {
        let mut skey = keyed();
        let tag = skey.cmac(&[], 16).unwrap();

        let mut k = skey.encrypt_block(&[0u8; 16]).unwrap();
        gf::double(skey.width(), &mut k);
        gf::double(skey.width(), &mut k);
        k[15] ^= 0x80;
        assert_eq!(tag, skey.encrypt_block(&k).unwrap());
    }

    #[test]
    fn single_full_block_uses_first_subkey() {
        let mut skey = keyed();
        let message = [0x42u8; 16];
        let tag = skey.cmac(&message, 16).unwrap();

        let mut k = skey.encrypt_block(&[0u8; 16]).unwrap();
        gf::double(skey.width(), &mut k);
        xor_in_place(&mut k, &message);
        assert_eq!(tag, skey.encrypt_block(&k).unwrap());
    }

    #[test]
    fn truncation_keeps_trailing_bytes() {
        let mut skey = keyed();
        let message = b"attack at dawn, bring snacks";
        let full = skey.cmac(message, 16).unwrap();
        for len in 1..=16 {
            assert_eq!(skey.cmac(message, len).unwrap()[..], full[16 - len..]);
        }
    }

    #[test]
    fn padding_distinguishes_partial_from_full_block() {
        let mut skey = keyed();
        let mut padded = [0u8; 16];
        padded[15] = 0xaa;
        padded[14] = 0x80;
        assert_ne!(skey.cmac(&[0xaa], 16).unwrap(), skey.cmac(&padded, 16).unwrap());
    }

    #[test]
    fn verify_accepts_and_rejects() {
        let mut skey = keyed();
        let tag = skey.cmac(b"message", 8).unwrap();
        assert!(skey.verify_cmac(b"message", &tag).is_ok());
        assert_eq!(skey.verify_cmac(b"messagf", &tag), Err(SkeyError::AuthenticationFailed));
    }

    #[test]
    fn tag_length_is_bounded() {
        let mut skey = keyed();
        assert_eq!(
            skey.cmac(b"x", 0),
            Err(SkeyError::InvalidTagLength { max: 16, actual: 0 })
        );
        assert_eq!(
            skey.cmac(b"x", 17),
            Err(SkeyError::InvalidTagLength { max: 16, actual: 17 })
        );
    }

    #[test]
    fn charges_one_block_per_message_block_plus_subkey() {
        let mut skey = keyed();
        let before = skey.resource();
        skey.cmac(&[0u8; 33], 4).unwrap();
        assert_eq!(before - skey.resource(), 4);
    }
}
