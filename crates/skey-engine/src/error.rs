//! Error types and the error-reporting sink.

use core::fmt;

use thiserror::Error;

/// Result alias used across the engine.
pub type Result<T> = core::result::Result<T, SkeyError>;

/// IV length a mode accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IvLength {
    /// Exactly this many bytes.
    Exactly(usize),
    /// A non-zero multiple of this many bytes.
    MultipleOf(usize),
}

impl fmt::Display for IvLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "{n} bytes"),
            Self::MultipleOf(n) => write!(f, "a non-zero multiple of {n} bytes"),
        }
    }
}

/// Errors from key-context, mode, MGM and CMAC operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkeyError {
    /// Empty or otherwise unusable argument.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the argument
        reason: &'static str,
    },

    /// The block primitive cannot back a key context.
    #[error("unsupported primitive: {reason}")]
    InvalidPrimitive {
        /// Why the primitive was rejected
        reason: String,
    },

    /// Key material does not match the primitive's key size.
    #[error("wrong key length: expected {expected} bytes, got {actual}")]
    WrongKeyLength {
        /// Key size of the primitive
        expected: usize,
        /// Length supplied by the caller
        actual: usize,
    },

    /// Operation on a context that holds no key.
    #[error("no key has been set on this context")]
    KeyNotSet,

    /// Stored integrity code no longer matches the key material.
    #[error("key integrity code mismatch")]
    KeyIntegrityViolation,

    /// The key has used up its block budget and must be replaced.
    #[error("key resource exhausted: {remaining} block operations left, {requested} requested")]
    ResourceExhausted {
        /// Block operations the key may still perform
        remaining: u64,
        /// Block operations the call needs
        requested: u64,
    },

    /// Tag mismatch; no plaintext is released.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Round-key or work-buffer allocation failed.
    #[error("allocation of {bytes} bytes failed")]
    AllocationFailure {
        /// Size of the failed allocation
        bytes: usize,
    },

    /// IV or nonce of the wrong size for the mode.
    #[error("invalid iv length: got {actual} bytes, expected {expected}")]
    InvalidIvLength {
        /// Length the mode accepts
        expected: IvLength,
        /// Length supplied by the caller
        actual: usize,
    },

    /// Data length not a multiple of the block size for a block-aligned mode.
    #[error("data length {actual} is not a multiple of the block size {block_size}")]
    InvalidDataLength {
        /// Block size of the primitive
        block_size: usize,
        /// Length supplied by the caller
        actual: usize,
    },

    /// Associated data longer than the MGM length block can encode.
    #[error("associated data too large: {actual} bytes, at most {max_bytes}")]
    AssociatedDataTooLarge {
        /// Largest accepted length
        max_bytes: u64,
        /// Length supplied by the caller
        actual: u64,
    },

    /// Plaintext or ciphertext longer than the MGM length block can encode.
    #[error("plaintext too large: {actual} bytes, at most {max_bytes}")]
    PlaintextTooLarge {
        /// Largest accepted length
        max_bytes: u64,
        /// Length supplied by the caller
        actual: u64,
    },

    /// Requested tag length outside `1..=block size`.
    #[error("invalid tag length {actual}: must be between 1 and {max}")]
    InvalidTagLength {
        /// Block size of the primitive
        max: usize,
        /// Length requested by the caller
        actual: usize,
    },

    /// MGM frame could not be encoded or decoded.
    #[error("malformed mgm frame: {0}")]
    Frame(String),

    /// A known-answer check produced the wrong output.
    #[error("self-test failed: {check}")]
    SelfTestFailed {
        /// Name of the failing check
        check: &'static str,
    },
}

impl SkeyError {
    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::InvalidPrimitive { .. } => "unsupported_primitive",
            Self::WrongKeyLength { .. } => "wrong_key_length",
            Self::KeyNotSet => "key_not_set",
            Self::KeyIntegrityViolation => "key_integrity_violation",
            Self::ResourceExhausted { .. } => "resource_exhausted",
            Self::AuthenticationFailed => "authentication_failed",
            Self::AllocationFailure { .. } => "allocation_failure",
            Self::InvalidIvLength { .. } => "invalid_iv_length",
            Self::InvalidDataLength { .. } => "invalid_data_length",
            Self::AssociatedDataTooLarge { .. } => "associated_data_too_large",
            Self::PlaintextTooLarge { .. } => "plaintext_too_large",
            Self::InvalidTagLength { .. } => "invalid_tag_length",
            Self::Frame(_) => "malformed_frame",
            Self::SelfTestFailed { .. } => "self_test_failed",
        }
    }

    /// Returns true if the key or the message must be discarded.
    ///
    /// Everything else is a caller mistake that can be corrected and retried.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::KeyIntegrityViolation
            | Self::ResourceExhausted { .. }
            | Self::AuthenticationFailed
            | Self::AllocationFailure { .. }
            | Self::SelfTestFailed { .. } => true,

            Self::InvalidArgument { .. }
            | Self::InvalidPrimitive { .. }
            | Self::WrongKeyLength { .. }
            | Self::KeyNotSet
            | Self::InvalidIvLength { .. }
            | Self::InvalidDataLength { .. }
            | Self::AssociatedDataTooLarge { .. }
            | Self::PlaintextTooLarge { .. }
            | Self::InvalidTagLength { .. }
            | Self::Frame(_) => false,
        }
    }
}

/// Sends failures to the log as `(code, message, origin)` on their way out.
///
/// Fatal errors are logged at error level, caller mistakes at warn.
pub(crate) trait Reported<T> {
    fn reported(self, origin: &'static str) -> Result<T>;
}

impl<T> Reported<T> for Result<T> {
    fn reported(self, origin: &'static str) -> Result<T> {
        match &self {
            Err(err) if err.is_fatal() => tracing::error!(code = err.code(), origin, "{err}"),
            Err(err) => tracing::warn!(code = err.code(), origin, "{err}"),
            Ok(_) => {}
        }
        self
    }
}

/// Allocates a zeroed buffer, surfacing allocator refusal as an error.
pub(crate) fn try_alloc<T: Clone + Default>(len: usize) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| SkeyError::AllocationFailure {
            bytes: len.saturating_mul(core::mem::size_of::<T>()),
        })?;
    buf.resize(len, T::default());
    Ok(buf)
}

/// Allocates a copy of `data`.
pub(crate) fn try_copy(data: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(data.len())
        .map_err(|_| SkeyError::AllocationFailure { bytes: data.len() })?;
    buf.extend_from_slice(data);
    Ok(buf)
}
