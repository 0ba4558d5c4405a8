//! Secret key context: key material, round keys, integrity code and block budget.
//!
//! A context moves through `created -> key set -> used* -> destroyed`. Key
//! bytes are kept XOR-masked with a random mask, round keys live in storage
//! owned by the context, and both are covered by an integrity code that is
//! recomputed before every operation. All of it is wiped on
//! [`destroy`](SecretKey::destroy) and on drop.

use core::fmt;

use block_core::{BlockPrimitive, BlockWidth, Rc6Schedule};
use rand::{rngs::OsRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use zeroize::{Zeroize, Zeroizing};

use crate::config::{Algorithm, KeyConfig};
use crate::error::{try_alloc, Reported, Result, SkeyError};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// One key instance bound to a block primitive.
pub struct SecretKey {
    primitive: Box<dyn BlockPrimitive>,
    width: BlockWidth,
    /// Key bytes XOR `mask`.
    key: Zeroizing<Vec<u8>>,
    mask: Zeroizing<Vec<u8>>,
    round_keys: Option<Zeroizing<Vec<u32>>>,
    icode: u64,
    resource: u64,
    budget: u64,
    rng: ChaCha20Rng,
}

impl SecretKey {
    /// Creates a context for `algorithm` with no key set.
    pub fn create(algorithm: Algorithm, config: &KeyConfig) -> Result<Self> {
        if algorithm == Algorithm::Rc6 && config.rc6_schedule == Rc6Schedule::Reference {
            tracing::warn!(
                algorithm = algorithm.name(),
                "reference key schedule ignores the key; output is not secret"
            );
        }
        Self::with_primitive(algorithm.primitive(config), config)
    }

    /// Creates a context around an arbitrary primitive.
    pub fn with_primitive(primitive: Box<dyn BlockPrimitive>, config: &KeyConfig) -> Result<Self> {
        Self::build(primitive, config).reported("SecretKey::create")
    }

    fn build(primitive: Box<dyn BlockPrimitive>, config: &KeyConfig) -> Result<Self> {
        let width = BlockWidth::from_bytes(primitive.block_size()).ok_or_else(|| {
            SkeyError::InvalidPrimitive {
                reason: format!("block size {} is not supported", primitive.block_size()),
            }
        })?;
        if primitive.key_size() == 0 {
            return Err(SkeyError::InvalidPrimitive {
                reason: "key size is zero".to_string(),
            });
        }
        if primitive.round_key_words() == 0 {
            return Err(SkeyError::InvalidPrimitive {
                reason: "round-key size is zero".to_string(),
            });
        }
        let budget = config.resource.unwrap_or_else(|| primitive.max_blocks());
        if budget == 0 {
            return Err(SkeyError::InvalidPrimitive {
                reason: "block budget is zero".to_string(),
            });
        }

        let rng = match config.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => {
                let mut seed = Zeroizing::new([0u8; 32]);
                OsRng.fill_bytes(&mut *seed);
                ChaCha20Rng::from_seed(*seed)
            }
        };

        tracing::debug!(algorithm = primitive.name(), budget, "secret key context created");
        Ok(Self {
            primitive,
            width,
            key: Zeroizing::new(Vec::new()),
            mask: Zeroizing::new(Vec::new()),
            round_keys: None,
            icode: 0,
            resource: 0,
            budget,
            rng,
        })
    }

    /// Installs `key`, runs the key schedule and resets the block budget.
    ///
    /// Any previous key is wiped first.
    pub fn set_key(&mut self, key: &[u8]) -> Result<()> {
        self.install(key).reported("SecretKey::set_key")
    }

    /// Installs a fresh key drawn from the context's random generator.
    pub fn set_key_random(&mut self) -> Result<()> {
        let result = try_alloc::<u8>(self.primitive.key_size()).and_then(|buf| {
            let mut key = Zeroizing::new(buf);
            self.rng.fill_bytes(&mut key);
            self.install(&key)
        });
        result.reported("SecretKey::set_key_random")
    }

    fn install(&mut self, key: &[u8]) -> Result<()> {
        if key.len() != self.primitive.key_size() {
            return Err(SkeyError::WrongKeyLength {
                expected: self.primitive.key_size(),
                actual: key.len(),
            });
        }

        let mut round_keys = Zeroizing::new(try_alloc::<u32>(self.primitive.round_key_words())?);
        let mut mask = Zeroizing::new(try_alloc::<u8>(key.len())?);
        let mut masked = Zeroizing::new(try_alloc::<u8>(key.len())?);

        self.destroy();
        self.primitive.schedule(key, &mut round_keys);
        self.rng.fill_bytes(&mut mask);
        for ((m, k), r) in masked.iter_mut().zip(key).zip(mask.iter()) {
            *m = k ^ r;
        }

        self.icode = integrity_code(key.iter().copied(), &round_keys);
        self.key = masked;
        self.mask = mask;
        self.round_keys = Some(round_keys);
        self.resource = self.budget;

        tracing::debug!(
            algorithm = self.primitive.name(),
            resource = self.resource,
            "secret key set"
        );
        Ok(())
    }

    /// Re-randomises the in-memory key mask without changing the key.
    pub fn remask(&mut self) -> Result<()> {
        self.verify().reported("SecretKey::remask")?;
        let mut fresh = Zeroizing::new(vec![0u8; self.mask.len()]);
        self.rng.fill_bytes(&mut fresh);
        for ((k, old), new) in self.key.iter_mut().zip(self.mask.iter()).zip(fresh.iter()) {
            *k ^= old ^ new;
        }
        self.mask = fresh;
        Ok(())
    }

    /// Wipes round keys, key bytes and mask; zeroes the integrity code and budget.
    ///
    /// Idempotent. The context can take a new key afterwards.
    pub fn destroy(&mut self) {
        let had_key = self.round_keys.is_some();
        if let Some(mut round_keys) = self.round_keys.take() {
            round_keys.zeroize();
        }
        self.key.zeroize();
        self.mask.zeroize();
        self.icode = 0;
        self.resource = 0;
        if had_key {
            tracing::debug!(algorithm = self.primitive.name(), "secret key destroyed");
        }
    }

    /// Encrypts exactly one block.
    pub fn encrypt_block(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        self.single_block(input, true).reported("SecretKey::encrypt_block")
    }

    /// Decrypts exactly one block.
    pub fn decrypt_block(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        self.single_block(input, false).reported("SecretKey::decrypt_block")
    }

    fn single_block(&mut self, input: &[u8], encrypt: bool) -> Result<Vec<u8>> {
        if input.len() != self.block_size() {
            return Err(SkeyError::InvalidDataLength {
                block_size: self.block_size(),
                actual: input.len(),
            });
        }
        let mut out = crate::error::try_copy(input)?;
        let cipher = self.begin(1)?;
        if encrypt {
            cipher.encrypt(&mut out);
        } else {
            cipher.decrypt(&mut out);
        }
        Ok(out)
    }

    /// Name of the bound algorithm.
    pub fn algorithm(&self) -> &'static str {
        self.primitive.name()
    }

    /// Block size in bytes.
    pub fn block_size(&self) -> usize {
        self.width.bytes()
    }

    /// Key size in bytes.
    pub fn key_size(&self) -> usize {
        self.primitive.key_size()
    }

    /// Block width of the bound primitive.
    pub fn width(&self) -> BlockWidth {
        self.width
    }

    /// Block operations left before the key must be replaced.
    pub fn resource(&self) -> u64 {
        self.resource
    }

    /// Whether a key is currently installed.
    pub fn is_key_set(&self) -> bool {
        self.round_keys.is_some()
    }

    /// Checks that a key is set and its integrity code still matches.
    pub(crate) fn verify(&self) -> Result<&[u32]> {
        let round_keys = self
            .round_keys
            .as_ref()
            .map(|words| words.as_slice())
            .ok_or(SkeyError::KeyNotSet)?;
        let key = self.key.iter().zip(self.mask.iter()).map(|(k, m)| k ^ m);
        if integrity_code(key, round_keys) != self.icode {
            return Err(SkeyError::KeyIntegrityViolation);
        }
        Ok(round_keys)
    }

    /// Checks that `blocks` operations may run, without consuming any.
    pub(crate) fn ready(&self, blocks: u64) -> Result<()> {
        self.verify()?;
        if self.resource < blocks {
            return Err(SkeyError::ResourceExhausted {
                remaining: self.resource,
                requested: blocks,
            });
        }
        Ok(())
    }

    /// Charges `blocks` operations to the budget and hands out the transform.
    pub(crate) fn begin(&mut self, blocks: u64) -> Result<BlockCipher<'_>> {
        self.ready(blocks)?;
        self.resource -= blocks;
        let round_keys = self
            .round_keys
            .as_ref()
            .map(|words| words.as_slice())
            .ok_or(SkeyError::KeyNotSet)?;
        Ok(BlockCipher {
            primitive: self.primitive.as_ref(),
            round_keys,
            width: self.width,
        })
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("algorithm", &self.primitive.name())
            .field("key_set", &self.is_key_set())
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

/// Borrowed single-block transform handed out by [`SecretKey::begin`].
pub(crate) struct BlockCipher<'a> {
    primitive: &'a dyn BlockPrimitive,
    round_keys: &'a [u32],
    width: BlockWidth,
}

impl BlockCipher<'_> {
    #[inline]
    pub(crate) fn encrypt(&self, block: &mut [u8]) {
        self.primitive.encrypt(self.round_keys, block);
    }

    #[inline]
    pub(crate) fn decrypt(&self, block: &mut [u8]) {
        self.primitive.decrypt(self.round_keys, block);
    }

    #[inline]
    pub(crate) fn width(&self) -> BlockWidth {
        self.width
    }
}

/// FNV-1a over the key bytes followed by the round-key words.
fn integrity_code(key: impl Iterator<Item = u8>, round_keys: &[u32]) -> u64 {
    let words = round_keys.iter().flat_map(|w| w.to_le_bytes());
    key.chain(words).fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RC6_BUDGET: u64 = 1 << 32;

    const KEY: [u8; 32] = [
        0xef, 0xcd, 0xab, 0x89, 0x67, 0x45, 0x23, 0x01, 0x10, 0x32, 0x54, 0x76, 0x98, 0xba, 0xdc,
        0xfe, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11, 0x00, 0xff, 0xee, 0xdd, 0xcc, 0xbb, 0xaa,
        0x99, 0x88,
    ];
    const PLAIN: [u8; 16] = [
        0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x00, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22,
        0x11,
    ];
    const CIPHER: [u8; 16] = [
        0x21, 0x9b, 0x58, 0x7d, 0xfb, 0xc5, 0xb4, 0xc4, 0xb2, 0x43, 0xf3, 0x06, 0x19, 0x44, 0x28,
        0x0e,
    ];

    fn keyed(config: &KeyConfig) -> SecretKey {
        let mut skey = SecretKey::create(Algorithm::Rc6, config).unwrap();
        skey.set_key(&KEY).unwrap();
        skey
    }

    #[derive(Debug)]
    struct Wide;

    impl BlockPrimitive for Wide {
        fn name(&self) -> &'static str {
            "wide"
        }
        fn block_size(&self) -> usize {
            32
        }
        fn key_size(&self) -> usize {
            32
        }
        fn round_key_words(&self) -> usize {
            1
        }
        fn max_blocks(&self) -> u64 {
            1
        }
        fn schedule(&self, _key: &[u8], _round_keys: &mut [u32]) {}
        fn encrypt(&self, _round_keys: &[u32], _block: &mut [u8]) {}
        fn decrypt(&self, _round_keys: &[u32], _block: &mut [u8]) {}
    }

    #[test]
    fn block_round_trip_matches_reference() {
        let config = KeyConfig::default()
            .with_seed(1)
            .with_rc6_schedule(Rc6Schedule::Reference);
        let mut skey = keyed(&config);
        assert_eq!(skey.encrypt_block(&PLAIN).unwrap(), CIPHER);
        assert_eq!(skey.decrypt_block(&CIPHER).unwrap(), PLAIN);
        assert_eq!(skey.resource(), RC6_BUDGET - 2);
    }

    #[test]
    fn unsupported_block_size_is_rejected() {
        let err = SecretKey::with_primitive(Box::new(Wide), &KeyConfig::default()).unwrap_err();
        assert_eq!(err.code(), "unsupported_primitive");
    }

    #[test]
    fn zero_budget_is_rejected() {
        let err = SecretKey::create(Algorithm::Rc6, &KeyConfig::default().with_resource(0))
            .unwrap_err();
        assert!(matches!(err, SkeyError::InvalidPrimitive { .. }));
    }

    #[test]
    fn wrong_key_length_is_rejected() {
        let mut skey = SecretKey::create(Algorithm::Rc6, &KeyConfig::default()).unwrap();
        assert_eq!(
            skey.set_key(&KEY[..16]),
            Err(SkeyError::WrongKeyLength { expected: 32, actual: 16 })
        );
        assert!(!skey.is_key_set());
    }

    #[test]
    fn operations_need_a_key() {
        let mut skey = SecretKey::create(Algorithm::Rc6, &KeyConfig::default()).unwrap();
        assert_eq!(skey.encrypt_block(&PLAIN), Err(SkeyError::KeyNotSet));
    }

    #[test]
    fn wrong_block_length_is_rejected() {
        let mut skey = keyed(&KeyConfig::default());
        assert!(matches!(
            skey.encrypt_block(&PLAIN[..15]),
            Err(SkeyError::InvalidDataLength { block_size: 16, actual: 15 })
        ));
        assert_eq!(skey.resource(), RC6_BUDGET);
    }

    #[test]
    fn tampered_round_keys_are_detected() {
        let mut skey = keyed(&KeyConfig::default());
        if let Some(round_keys) = skey.round_keys.as_mut() {
            round_keys[7] ^= 1;
        }
        assert_eq!(skey.encrypt_block(&PLAIN), Err(SkeyError::KeyIntegrityViolation));
    }

    #[test]
    fn tampered_key_bytes_are_detected() {
        let mut skey = keyed(&KeyConfig::default());
        skey.key[0] ^= 0x80;
        assert_eq!(skey.decrypt_block(&CIPHER), Err(SkeyError::KeyIntegrityViolation));
    }

    #[test]
    fn key_is_stored_masked() {
        let skey = keyed(&KeyConfig::default().with_seed(9));
        assert_ne!(skey.key.as_slice(), &KEY[..]);
        let unmasked: Vec<u8> = skey.key.iter().zip(skey.mask.iter()).map(|(k, m)| k ^ m).collect();
        assert_eq!(unmasked, KEY);
    }

    #[test]
    fn remask_keeps_key_usable() {
        let mut skey = keyed(&KeyConfig::default().with_rc6_schedule(Rc6Schedule::Keyed));
        let before = skey.encrypt_block(&PLAIN).unwrap();
        let masked_before = skey.key.to_vec();
        skey.remask().unwrap();
        assert_ne!(skey.key.to_vec(), masked_before);
        assert_eq!(skey.encrypt_block(&PLAIN).unwrap(), before);
    }

    #[test]
    fn budget_is_enforced_and_reset_by_rekey() {
        let mut skey = keyed(&KeyConfig::default().with_resource(2));
        skey.encrypt_block(&PLAIN).unwrap();
        skey.encrypt_block(&PLAIN).unwrap();
        assert_eq!(
            skey.encrypt_block(&PLAIN),
            Err(SkeyError::ResourceExhausted { remaining: 0, requested: 1 })
        );
        skey.set_key(&KEY).unwrap();
        assert_eq!(skey.resource(), 2);
        assert!(skey.encrypt_block(&PLAIN).is_ok());
    }

    #[test]
    fn destroy_wipes_and_is_idempotent() {
        let mut skey = keyed(&KeyConfig::default());
        skey.destroy();
        skey.destroy();
        assert!(!skey.is_key_set());
        assert_eq!(skey.resource(), 0);
        assert!(skey.key.iter().all(|b| *b == 0));
        assert_eq!(skey.encrypt_block(&PLAIN), Err(SkeyError::KeyNotSet));
    }

    #[test]
    fn random_keys_differ_under_keyed_schedule() {
        let config = KeyConfig::default()
            .with_seed(5)
            .with_rc6_schedule(Rc6Schedule::Keyed);
        let mut a = SecretKey::create(Algorithm::Rc6, &config).unwrap();
        let mut b = SecretKey::create(Algorithm::Rc6, &config.clone().with_seed(6)).unwrap();
        a.set_key_random().unwrap();
        b.set_key_random().unwrap();
        assert_ne!(a.encrypt_block(&PLAIN).unwrap(), b.encrypt_block(&PLAIN).unwrap());
    }

    #[test]
    fn debug_output_hides_key_material() {
        let skey = keyed(&KeyConfig::default());
        let rendered = format!("{skey:?}");
        assert!(rendered.contains("rc6"));
        assert!(!rendered.contains("mask"));
    }
}
