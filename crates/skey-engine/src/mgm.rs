//! Multilinear Galois Mode: counter-mode encryption plus a field-multiplication MAC.
//!
//! From one nonce (top bit zero) two counters are derived: `Y1 = E(nonce)`
//! with the top bit cleared drives the keystream, `Z1 = E'(nonce | top bit)`
//! drives the authentication masks. `Y` advances in the low half of the block,
//! `Z` in the high half. Every associated-data block, then every ciphertext
//! block, is multiplied by `H_i = E'(Z_i)` and summed; a final block holding
//! the bit lengths (associated data high, ciphertext low) is folded in the
//! same way and the sum is encrypted to form the tag.
//!
//! `E` is the encryption key and `E'` the authentication key; passing no
//! authentication key uses the encryption key for both. Partial blocks are
//! zero-padded on their least significant side, and the tag is truncated to
//! its most significant bytes.

use block_core::{increment_le, xor_in_place, BlockWidth, MAX_BLOCK_SIZE};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::{try_copy, IvLength, Reported, Result, SkeyError};
use crate::gf;
use crate::skey::{BlockCipher, SecretKey};

/// Ciphertext and tag produced by [`encrypt`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sealed {
    /// Encrypted payload, same length as the plaintext.
    pub ciphertext: Vec<u8>,
    /// Authentication tag.
    pub tag: Vec<u8>,
}

/// Encrypts `plaintext` and authenticates it together with `associated_data`.
pub fn encrypt(
    key: &mut SecretKey,
    auth_key: Option<&mut SecretKey>,
    nonce: &[u8],
    associated_data: &[u8],
    plaintext: &[u8],
    tag_len: usize,
) -> Result<Sealed> {
    seal_inner(key, auth_key, nonce, associated_data, plaintext, tag_len).reported("mgm::encrypt")
}

/// Verifies `tag` over `associated_data` and `ciphertext`, then decrypts.
///
/// On a tag mismatch the decrypted buffer is wiped and only
/// [`SkeyError::AuthenticationFailed`] is returned. Decryption runs either
/// way, so success and failure take the same time.
pub fn decrypt(
    key: &mut SecretKey,
    auth_key: Option<&mut SecretKey>,
    nonce: &[u8],
    associated_data: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>> {
    open_inner(key, auth_key, nonce, associated_data, ciphertext, tag).reported("mgm::decrypt")
}

fn seal_inner(
    key: &mut SecretKey,
    auth_key: Option<&mut SecretKey>,
    nonce: &[u8],
    associated_data: &[u8],
    plaintext: &[u8],
    tag_len: usize,
) -> Result<Sealed> {
    let plan = Plan::new(key.width(), nonce, associated_data, plaintext, tag_len)?;
    let mut ciphertext = try_copy(plaintext)?;
    let tag = with_ciphers(key, auth_key, &plan, |enc, auth| {
        keystream(enc, nonce, &mut ciphertext);
        authenticate(auth, nonce, associated_data, &ciphertext, tag_len)
    })?;
    Ok(Sealed { ciphertext, tag })
}

fn open_inner(
    key: &mut SecretKey,
    auth_key: Option<&mut SecretKey>,
    nonce: &[u8],
    associated_data: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>> {
    let plan = Plan::new(key.width(), nonce, associated_data, ciphertext, tag.len())?;
    let mut plaintext = try_copy(ciphertext)?;
    let matches = with_ciphers(key, auth_key, &plan, |enc, auth| {
        let mut expected = authenticate(auth, nonce, associated_data, ciphertext, tag.len());
        keystream(enc, nonce, &mut plaintext);
        let matches = bool::from(expected.ct_eq(tag));
        expected.zeroize();
        matches
    })?;
    if !matches {
        plaintext.zeroize();
        return Err(SkeyError::AuthenticationFailed);
    }
    Ok(plaintext)
}

/// Validated sizes and block counts for one MGM call.
struct Plan {
    enc_blocks: u64,
    auth_blocks: u64,
}

impl Plan {
    fn new(
        width: BlockWidth,
        nonce: &[u8],
        associated_data: &[u8],
        text: &[u8],
        tag_len: usize,
    ) -> Result<Self> {
        let bs = width.bytes();
        if tag_len == 0 || tag_len > bs {
            return Err(SkeyError::InvalidTagLength { max: bs, actual: tag_len });
        }
        if nonce.len() != bs {
            return Err(SkeyError::InvalidIvLength {
                expected: IvLength::Exactly(bs),
                actual: nonce.len(),
            });
        }
        if nonce[bs - 1] & 0x80 != 0 {
            return Err(SkeyError::InvalidArgument {
                reason: "nonce top bit must be zero",
            });
        }

        // Bit lengths must fit in half a block.
        let max_bytes = ((1u128 << (4 * bs)) / 8 - 1) as u64;
        if associated_data.len() as u64 > max_bytes {
            return Err(SkeyError::AssociatedDataTooLarge {
                max_bytes,
                actual: associated_data.len() as u64,
            });
        }
        if text.len() as u64 > max_bytes {
            return Err(SkeyError::PlaintextTooLarge {
                max_bytes,
                actual: text.len() as u64,
            });
        }

        let h = associated_data.len().div_ceil(bs) as u64;
        let q = text.len().div_ceil(bs) as u64;
        Ok(Self {
            // Y1, then one keystream block per text block.
            enc_blocks: 1 + q,
            // Z1, one mask per data block, the length block's mask, the final encryption.
            auth_blocks: h + q + 3,
        })
    }
}

/// Charges both keys up front and runs `f` with their transforms.
fn with_ciphers<T>(
    key: &mut SecretKey,
    auth_key: Option<&mut SecretKey>,
    plan: &Plan,
    f: impl FnOnce(&BlockCipher<'_>, &BlockCipher<'_>) -> T,
) -> Result<T> {
    match auth_key {
        None => {
            let cipher = key.begin(plan.enc_blocks + plan.auth_blocks)?;
            Ok(f(&cipher, &cipher))
        }
        Some(auth_key) => {
            if auth_key.width() != key.width() {
                return Err(SkeyError::InvalidArgument {
                    reason: "encryption and authentication keys differ in block size",
                });
            }
            key.ready(plan.enc_blocks)?;
            auth_key.ready(plan.auth_blocks)?;
            let enc = key.begin(plan.enc_blocks)?;
            let auth = auth_key.begin(plan.auth_blocks)?;
            Ok(f(&enc, &auth))
        }
    }
}

fn keystream(enc: &BlockCipher<'_>, nonce: &[u8], data: &mut [u8]) {
    let width = enc.width();
    let (bs, half) = (width.bytes(), width.half());

    let mut y = [0u8; MAX_BLOCK_SIZE];
    y[..bs].copy_from_slice(nonce);
    y[bs - 1] &= 0x7f;
    enc.encrypt(&mut y[..bs]);

    let mut ks = [0u8; MAX_BLOCK_SIZE];
    for chunk in data.chunks_mut(bs) {
        ks[..bs].copy_from_slice(&y[..bs]);
        enc.encrypt(&mut ks[..bs]);
        xor_in_place(chunk, &ks[bs - chunk.len()..bs]);
        increment_le(&mut y[..half]);
    }
    y.zeroize();
    ks.zeroize();
}

fn authenticate(
    auth: &BlockCipher<'_>,
    nonce: &[u8],
    associated_data: &[u8],
    ciphertext: &[u8],
    tag_len: usize,
) -> Vec<u8> {
    let width = auth.width();
    let (bs, half) = (width.bytes(), width.half());

    let mut z = [0u8; MAX_BLOCK_SIZE];
    z[..bs].copy_from_slice(nonce);
    z[bs - 1] |= 0x80;
    auth.encrypt(&mut z[..bs]);

    let mut acc = [0u8; MAX_BLOCK_SIZE];
    let mut mask = [0u8; MAX_BLOCK_SIZE];
    let mut block = [0u8; MAX_BLOCK_SIZE];
    let mut fold = |block: &[u8], acc: &mut [u8]| {
        mask[..bs].copy_from_slice(&z[..bs]);
        auth.encrypt(&mut mask[..bs]);
        increment_le(&mut z[half..bs]);
        gf::mul_acc(width, &mut acc[..bs], &mask[..bs], block);
    };

    // Associated data strictly before ciphertext.
    for chunk in associated_data.chunks(bs).chain(ciphertext.chunks(bs)) {
        block.fill(0);
        block[bs - chunk.len()..bs].copy_from_slice(chunk);
        fold(&block[..bs], &mut acc);
    }

    block.fill(0);
    write_bit_length(&mut block[..half], ciphertext.len());
    write_bit_length(&mut block[half..bs], associated_data.len());
    fold(&block[..bs], &mut acc);

    auth.encrypt(&mut acc[..bs]);
    let tag = acc[bs - tag_len..bs].to_vec();
    acc.zeroize();
    block.zeroize();
    mask.zeroize();
    z.zeroize();
    tag
}

/// Writes `len * 8` little-endian into `dst`; the caller bounds `len`.
fn write_bit_length(dst: &mut [u8], len: usize) {
    let bits = (len as u64).wrapping_mul(8).to_le_bytes();
    dst.copy_from_slice(&bits[..dst.len()]);
}

/// `nonce`, associated data, ciphertext and tag in one serializable container.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MgmFrame {
    /// Nonce the frame was sealed under.
    pub nonce: Vec<u8>,
    /// Authenticated, unencrypted data.
    pub associated_data: Vec<u8>,
    /// Authenticated and encrypted data.
    pub ciphertext: Vec<u8>,
    /// Authentication tag.
    pub tag: Vec<u8>,
}

impl MgmFrame {
    /// Encrypts `plaintext` into a new frame.
    pub fn seal(
        key: &mut SecretKey,
        auth_key: Option<&mut SecretKey>,
        nonce: &[u8],
        associated_data: &[u8],
        plaintext: &[u8],
        tag_len: usize,
    ) -> Result<Self> {
        let sealed = encrypt(key, auth_key, nonce, associated_data, plaintext, tag_len)?;
        Ok(Self {
            nonce: nonce.to_vec(),
            associated_data: associated_data.to_vec(),
            ciphertext: sealed.ciphertext,
            tag: sealed.tag,
        })
    }

    /// Verifies and decrypts the frame.
    pub fn open(&self, key: &mut SecretKey, auth_key: Option<&mut SecretKey>) -> Result<Vec<u8>> {
        decrypt(
            key,
            auth_key,
            &self.nonce,
            &self.associated_data,
            &self.ciphertext,
            &self.tag,
        )
    }

    /// Serializes the frame with `bincode`.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| SkeyError::Frame(e.to_string()))
            .reported("MgmFrame::to_bytes")
    }

    /// Deserializes a frame with `bincode`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| SkeyError::Frame(e.to_string()))
            .reported("MgmFrame::from_bytes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Algorithm, KeyConfig};
    use block_core::Rc6Schedule;

    const NONCE: [u8; 16] = [
        0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x00, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22,
        0x11,
    ];

    fn keyed(byte: u8) -> SecretKey {
        let config = KeyConfig::default()
            .with_seed(u64::from(byte))
            .with_rc6_schedule(Rc6Schedule::Keyed);
        let mut skey = SecretKey::create(Algorithm::Rc6, &config).unwrap();
        skey.set_key(&[byte; 32]).unwrap();
        skey
    }

    #[test]
    fn round_trip_with_one_key() {
        let mut key = keyed(1);
        let sealed = encrypt(&mut key, None, &NONCE, b"header", b"attack at dawn!!!", 16).unwrap();
        assert_eq!(sealed.ciphertext.len(), 17);
        assert_eq!(sealed.tag.len(), 16);
        let pt = decrypt(&mut key, None, &NONCE, b"header", &sealed.ciphertext, &sealed.tag)
            .unwrap();
        assert_eq!(pt, b"attack at dawn!!!");
    }

    #[test]
    fn round_trip_with_separate_keys() {
        let (mut enc, mut auth) = (keyed(2), keyed(3));
        let sealed = encrypt(&mut enc, Some(&mut auth), &NONCE, b"ad", b"payload", 8).unwrap();
        let pt = decrypt(
            &mut enc,
            Some(&mut auth),
            &NONCE,
            b"ad",
            &sealed.ciphertext,
            &sealed.tag,
        )
        .unwrap();
        assert_eq!(pt, b"payload");

        // The wrong authentication key must not verify.
        let mut other = keyed(4);
        assert_eq!(
            decrypt(&mut enc, Some(&mut other), &NONCE, b"ad", &sealed.ciphertext, &sealed.tag),
            Err(SkeyError::AuthenticationFailed)
        );
    }

    #[test]
    fn ciphertext_matches_counter_keystream() {
        let mut key = keyed(5);
        let sealed = encrypt(&mut key, None, &NONCE, &[], &[0u8; 32], 16).unwrap();
        let y1 = key.encrypt_block(&NONCE).unwrap();
        assert_eq!(sealed.ciphertext[..16], key.encrypt_block(&y1).unwrap()[..]);
        let mut y2 = y1.clone();
        increment_le(&mut y2[..8]);
        assert_eq!(sealed.ciphertext[16..], key.encrypt_block(&y2).unwrap()[..]);
    }

    #[test]
    fn tag_over_single_block_matches_definition() {
        let mut key = keyed(6);
        let ad = [0x01u8; 16];
        let sealed = encrypt(&mut key, None, &NONCE, &ad, &[], 16).unwrap();

        let mut z = NONCE;
        z[15] |= 0x80;
        let z1 = key.encrypt_block(&z).unwrap();
        let h1 = key.encrypt_block(&z1).unwrap();
        let mut z2 = z1.clone();
        increment_le(&mut z2[8..]);
        let h2 = key.encrypt_block(&z2).unwrap();

        let mut lengths = [0u8; 16];
        lengths[8..].copy_from_slice(&128u64.to_le_bytes());
        let mut acc = [0u8; 16];
        gf::mul_acc(BlockWidth::Bits128, &mut acc, &h1, &ad);
        gf::mul_acc(BlockWidth::Bits128, &mut acc, &h2, &lengths);
        assert_eq!(sealed.tag, key.encrypt_block(&acc).unwrap());
    }

    #[test]
    fn any_flipped_bit_fails_authentication() {
        let mut key = keyed(7);
        let ad = b"associated".to_vec();
        let sealed = encrypt(&mut key, None, &NONCE, &ad, b"secret text", 12).unwrap();

        for i in 0..sealed.ciphertext.len() {
            let mut ct = sealed.ciphertext.clone();
            ct[i] ^= 1;
            assert_eq!(
                decrypt(&mut key, None, &NONCE, &ad, &ct, &sealed.tag),
                Err(SkeyError::AuthenticationFailed)
            );
        }
        for i in 0..ad.len() {
            let mut bad = ad.clone();
            bad[i] ^= 0x40;
            assert_eq!(
                decrypt(&mut key, None, &NONCE, &bad, &sealed.ciphertext, &sealed.tag),
                Err(SkeyError::AuthenticationFailed)
            );
        }
        let mut tag = sealed.tag.clone();
        tag[0] ^= 0x80;
        assert_eq!(
            decrypt(&mut key, None, &NONCE, &ad, &sealed.ciphertext, &tag),
            Err(SkeyError::AuthenticationFailed)
        );
    }

    #[test]
    fn moving_bytes_between_ad_and_ciphertext_fails() {
        let mut key = keyed(8);
        let sealed = encrypt(&mut key, None, &NONCE, b"abc", b"defg", 16).unwrap();
        let mut joined = b"abc".to_vec();
        joined.extend_from_slice(&sealed.ciphertext);
        assert_eq!(
            decrypt(&mut key, None, &NONCE, &joined[..4], &joined[4..], &sealed.tag),
            Err(SkeyError::AuthenticationFailed)
        );
    }

    #[test]
    fn argument_checks() {
        let mut key = keyed(9);
        assert_eq!(
            encrypt(&mut key, None, &NONCE, b"", b"x", 17),
            Err(SkeyError::InvalidTagLength { max: 16, actual: 17 })
        );
        assert_eq!(
            encrypt(&mut key, None, &NONCE[..12], b"", b"x", 16),
            Err(SkeyError::InvalidIvLength { expected: IvLength::Exactly(16), actual: 12 })
        );
        let mut high = NONCE;
        high[15] = 0x80;
        assert!(matches!(
            encrypt(&mut key, None, &high, b"", b"x", 16),
            Err(SkeyError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn resource_is_checked_before_anything_runs() {
        let config = KeyConfig::default().with_resource(5).with_seed(1);
        let mut enc = SecretKey::create(Algorithm::Rc6, &config).unwrap();
        enc.set_key(&[1u8; 32]).unwrap();
        let mut auth = keyed(10);
        // Two text blocks cost 3 encryption and 5 authentication operations.
        assert!(encrypt(&mut enc, Some(&mut auth), &NONCE, b"", &[0u8; 32], 16).is_ok());
        assert_eq!(enc.resource(), 2);
        assert!(matches!(
            encrypt(&mut enc, None, &NONCE, b"", &[0u8; 32], 16),
            Err(SkeyError::ResourceExhausted { remaining: 2, requested: 8 })
        ));
        assert_eq!(enc.resource(), 2);
    }

    #[test]
    fn frame_survives_serialization() {
        let mut key = keyed(11);
        let frame = MgmFrame::seal(&mut key, None, &NONCE, b"hdr", b"body", 16).unwrap();
        let decoded = MgmFrame::from_bytes(&frame.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(decoded.open(&mut key, None).unwrap(), b"body");
        assert!(matches!(MgmFrame::from_bytes(&[1, 2, 3]), Err(SkeyError::Frame(_))));
    }
}
