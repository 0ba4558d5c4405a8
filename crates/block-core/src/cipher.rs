//! RC6-32/20/32 key schedule and block encryption/decryption.

use zeroize::Zeroize;

use crate::key::{Rc6Schedule, KEY_BYTES, ROUNDS, ROUND_KEY_WORDS};
use crate::primitive::BlockPrimitive;
use crate::round::{forward_round, inverse_round, load_words, store_words};

/// Odd integer closest to `(e - 2) * 2^32`.
const P32: u32 = 0xB7E1_5163;
/// Odd integer closest to `(phi - 1) * 2^32`.
const Q32: u32 = 0x9E37_79B9;

/// Block operations permitted per RC6 key.
pub(crate) const MAX_BLOCKS: u64 = 1 << 32;

fn expand_into(key: &[u8], schedule: Rc6Schedule, s: &mut [u32]) {
    let mut l = [0u32; KEY_BYTES / 4];
    if schedule == Rc6Schedule::Keyed {
        for (word, chunk) in l.iter_mut().zip(key.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
    }

    s[0] = P32;
    for i in 1..s.len() {
        s[i] = s[i - 1].wrapping_add(Q32);
    }

    let (mut a, mut b) = (0u32, 0u32);
    let (mut i, mut j) = (0usize, 0usize);
    for _ in 0..3 * s.len() {
        a = s[i].wrapping_add(a).wrapping_add(b).rotate_left(3);
        s[i] = a;
        b = l[j].wrapping_add(a).wrapping_add(b).rotate_left(a.wrapping_add(b));
        l[j] = b;
        i = (i + 1) % s.len();
        j = (j + 1) % l.len();
    }

    l.zeroize();
}

fn encrypt_words(s: &[u32], block: &mut [u8]) {
    let mut state = load_words(block);
    state[1] = state[1].wrapping_add(s[0]);
    state[3] = state[3].wrapping_add(s[1]);
    for round in 1..=ROUNDS {
        forward_round(&mut state, s[2 * round], s[2 * round + 1]);
    }
    state[0] = state[0].wrapping_add(s[2 * ROUNDS + 2]);
    state[2] = state[2].wrapping_add(s[2 * ROUNDS + 3]);
    store_words(&state, block);
    state.zeroize();
}

fn decrypt_words(s: &[u32], block: &mut [u8]) {
    let mut state = load_words(block);
    state[2] = state[2].wrapping_sub(s[2 * ROUNDS + 3]);
    state[0] = state[0].wrapping_sub(s[2 * ROUNDS + 2]);
    for round in (1..=ROUNDS).rev() {
        inverse_round(&mut state, s[2 * round], s[2 * round + 1]);
    }
    state[3] = state[3].wrapping_sub(s[1]);
    state[1] = state[1].wrapping_sub(s[0]);
    store_words(&state, block);
    state.zeroize();
}

/// RC6 descriptor for key contexts: 128-bit block, 256-bit key, 20 rounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rc6 {
    schedule: Rc6Schedule,
}

impl Rc6 {
    /// Creates a descriptor bound to the given key schedule.
    pub const fn new(schedule: Rc6Schedule) -> Self {
        Self { schedule }
    }

    /// The key schedule this descriptor binds.
    pub const fn schedule(&self) -> Rc6Schedule {
        self.schedule
    }
}

impl BlockPrimitive for Rc6 {
    fn name(&self) -> &'static str {
        "rc6"
    }

    fn block_size(&self) -> usize {
        16
    }

    fn key_size(&self) -> usize {
        KEY_BYTES
    }

    fn round_key_words(&self) -> usize {
        ROUND_KEY_WORDS
    }

    fn max_blocks(&self) -> u64 {
        MAX_BLOCKS
    }

    fn schedule(&self, key: &[u8], round_keys: &mut [u32]) {
        expand_into(key, self.schedule, round_keys);
    }

    fn encrypt(&self, round_keys: &[u32], block: &mut [u8]) {
        encrypt_words(round_keys, block);
    }

    fn decrypt(&self, round_keys: &[u32], block: &mut [u8]) {
        decrypt_words(round_keys, block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    const REFERENCE_KEY: [u8; 32] = [
        0xef, 0xcd, 0xab, 0x89, 0x67, 0x45, 0x23, 0x01, 0x10, 0x32, 0x54, 0x76, 0x98, 0xba, 0xdc,
        0xfe, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11, 0x00, 0xff, 0xee, 0xdd, 0xcc, 0xbb, 0xaa,
        0x99, 0x88,
    ];
    const REFERENCE_PLAIN: [u8; 16] = [
        0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x00, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22,
        0x11,
    ];
    const REFERENCE_CIPHER: [u8; 16] = [
        0x21, 0x9b, 0x58, 0x7d, 0xfb, 0xc5, 0xb4, 0xc4, 0xb2, 0x43, 0xf3, 0x06, 0x19, 0x44, 0x28,
        0x0e,
    ];

    // RC6 submission test vector 4 (256-bit key).
    const KEYED_KEY: [u8; 32] = [
        0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0x01, 0x12, 0x23, 0x34, 0x45, 0x56, 0x67,
        0x78, 0x89, 0x9a, 0xab, 0xbc, 0xcd, 0xde, 0xef, 0xf0, 0x10, 0x32, 0x54, 0x76, 0x98, 0xba,
        0xdc, 0xfe,
    ];
    const KEYED_PLAIN: [u8; 16] = [
        0x02, 0x13, 0x24, 0x35, 0x46, 0x57, 0x68, 0x79, 0x8a, 0x9b, 0xac, 0xbd, 0xce, 0xdf, 0xe0,
        0xf1,
    ];
    const KEYED_CIPHER: [u8; 16] = [
        0xc8, 0x24, 0x18, 0x16, 0xf0, 0xd7, 0xe4, 0x89, 0x20, 0xad, 0x16, 0xa1, 0x67, 0x4e, 0x5d,
        0x48,
    ];

    fn round_keys(rc6: &Rc6, key: &[u8]) -> Vec<u32> {
        let mut words = vec![0u32; rc6.round_key_words()];
        BlockPrimitive::schedule(rc6, key, &mut words);
        words
    }

    fn encrypt(schedule: Rc6Schedule, key: &[u8], plain: &[u8; 16]) -> [u8; 16] {
        let rc6 = Rc6::new(schedule);
        let mut block = *plain;
        rc6.encrypt(&round_keys(&rc6, key), &mut block);
        block
    }

    #[test]
    fn default_descriptor_is_keyed() {
        assert_eq!(Rc6::default().schedule(), Rc6Schedule::Keyed);
        assert_eq!(Rc6Schedule::default(), Rc6Schedule::Keyed);
    }

    #[test]
    fn reference_schedule_matches_reference_vector() {
        assert_eq!(
            encrypt(Rc6Schedule::Reference, &REFERENCE_KEY, &REFERENCE_PLAIN),
            REFERENCE_CIPHER
        );
        let rc6 = Rc6::new(Rc6Schedule::Reference);
        let mut block = REFERENCE_CIPHER;
        rc6.decrypt(&round_keys(&rc6, &REFERENCE_KEY), &mut block);
        assert_eq!(block, REFERENCE_PLAIN);
    }

    #[test]
    fn keyed_schedule_matches_rc6_vectors() {
        assert_eq!(encrypt(Rc6Schedule::Keyed, &KEYED_KEY, &KEYED_PLAIN), KEYED_CIPHER);
        let expected = [
            0x8f, 0x5f, 0xbd, 0x05, 0x10, 0xd1, 0x5f, 0xa8, 0x93, 0xfa, 0x3f, 0xda, 0x6e, 0x85,
            0x7e, 0xc2,
        ];
        assert_eq!(encrypt(Rc6Schedule::Keyed, &[0u8; 32], &[0u8; 16]), expected);
    }

    #[test]
    fn only_keyed_schedule_depends_on_key_bytes() {
        let reference = Rc6::new(Rc6Schedule::Reference);
        assert_eq!(
            round_keys(&reference, &REFERENCE_KEY),
            round_keys(&reference, &[0x5au8; 32])
        );

        let keyed = Rc6::new(Rc6Schedule::Keyed);
        assert_ne!(round_keys(&keyed, &REFERENCE_KEY), round_keys(&keyed, &[0x5au8; 32]));
    }

    #[test]
    fn trait_object_reports_sizes() {
        let rc6: &dyn BlockPrimitive = &Rc6::new(Rc6Schedule::Keyed);
        assert_eq!(rc6.name(), "rc6");
        assert_eq!((rc6.block_size(), rc6.key_size()), (16, KEY_BYTES));
        assert_eq!(rc6.round_key_words(), ROUND_KEY_WORDS);
        assert_eq!(rc6.max_blocks(), MAX_BLOCKS);
    }

    #[test]
    fn encrypt_decrypt_round_trip_random() {
        let mut rng = rand::thread_rng();
        for schedule in [Rc6Schedule::Reference, Rc6Schedule::Keyed] {
            let rc6 = Rc6::new(schedule);
            for _ in 0..100 {
                let mut key = [0u8; 32];
                let mut block = [0u8; 16];
                rng.fill_bytes(&mut key);
                rng.fill_bytes(&mut block);
                let words = round_keys(&rc6, &key);
                let mut data = block;
                rc6.encrypt(&words, &mut data);
                rc6.decrypt(&words, &mut data);
                assert_eq!(data, block);
            }
        }
    }
}
