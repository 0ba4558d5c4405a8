//! Secret-key cryptography over pluggable block ciphers.
//!
//! A [`SecretKey`] owns masked key material, round keys, an integrity code and
//! a block budget. The chaining modes (ECB, CBC, CFB, OFB, CTR) and CMAC are
//! methods on it; the authenticated [`mgm`] mode takes one or two keys. The
//! only bundled primitive is RC6-32/20/32 from `block-core`.
//!
//! ```
//! use skey_engine::{Algorithm, KeyConfig, SecretKey};
//!
//! let mut skey = SecretKey::create(Algorithm::Rc6, &KeyConfig::default()).unwrap();
//! skey.set_key(&[7u8; 32]).unwrap();
//! let ct = skey.ctr(b"hello", &[0u8; 8]).unwrap();
//! assert_eq!(skey.ctr(&ct, &[0u8; 8]).unwrap(), b"hello");
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cmac;
mod config;
mod error;
pub mod gf;
pub mod mgm;
mod modes;
pub mod selftest;
mod skey;

pub use block_core::{BlockPrimitive, BlockWidth, Rc6Schedule};
pub use config::{Algorithm, Compatibility, KeyConfig};
pub use error::{IvLength, Result, SkeyError};
pub use mgm::{MgmFrame, Sealed};
pub use skey::SecretKey;
