//! Key-context configuration.
//!
//! Configuration is an explicit value handed to [`SecretKey::create`]; there
//! is no process-wide option state.
//!
//! [`SecretKey::create`]: crate::SecretKey::create

use block_core::{BlockPrimitive, Rc6, Rc6Schedule};
use serde::{Deserialize, Serialize};

/// Block cipher families a key context can be created for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// RC6-32/20/32.
    #[default]
    Rc6,
}

impl Algorithm {
    /// Algorithm name as reported by the primitive.
    pub fn name(self) -> &'static str {
        match self {
            Self::Rc6 => "rc6",
        }
    }

    /// Binds the concrete primitive for this algorithm under `config`.
    pub fn primitive(self, config: &KeyConfig) -> Box<dyn BlockPrimitive> {
        match self {
            // RC6 has a single transform in both compatibility modes.
            Self::Rc6 => match config.compatibility {
                Compatibility::Native | Compatibility::OpenSsl => {
                    Box::new(Rc6::new(config.rc6_schedule))
                }
            },
        }
    }
}

/// Byte-order compatibility toggle for primitives that have one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compatibility {
    /// Native block layout.
    #[default]
    Native,
    /// Layout compatible with OpenSSL-style implementations.
    OpenSsl,
}

/// Settings applied when a key context is created.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyConfig {
    /// Compatibility toggle forwarded to the primitive binding.
    pub compatibility: Compatibility,
    /// Which RC6 key schedule to bind. `Reference` ignores the key and is
    /// only for known-answer vectors.
    pub rc6_schedule: Rc6Schedule,
    /// Block budget per key; `None` uses the primitive's maximum.
    pub resource: Option<u64>,
    /// Seed for the masking RNG; `None` seeds from the operating system.
    pub seed: Option<u64>,
}

impl KeyConfig {
    /// Overrides the per-key block budget.
    pub fn with_resource(mut self, blocks: u64) -> Self {
        self.resource = Some(blocks);
        self
    }

    /// Seeds the masking RNG deterministically.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Selects the RC6 key schedule.
    pub fn with_rc6_schedule(mut self, schedule: Rc6Schedule) -> Self {
        self.rc6_schedule = schedule;
        self
    }
}
