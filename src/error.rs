use thiserror::Error;

/// Errors surfaced by the dictionary's fallible operations.
///
/// Shape-invariant violations (value accessor on a value-less entry, pause
/// counter underflow, fingerprint mismatch on unsafe iterator release) are
/// *not* modeled here: they indicate a logic bug in the caller or in the
/// `TypeDescriptor` implementation and are reported via `debug_assert!`/
/// `panic!` instead, matching the C original's `assert()` policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DictError {
    /// Bucket-array allocation failed. Only produced by `try_expand`;
    /// `expand` maps an allocation failure to this variant as well rather
    /// than aborting the process.
    #[error("out of memory while allocating {requested} buckets")]
    OutOfMemory { requested: usize },

    /// The requested size is smaller than the current element count, the
    /// computed exponent is unchanged from the current one (a no-op that
    /// would waste a rehash), or expansion was requested while a rehash is
    /// already in progress.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

pub type Result<T> = std::result::Result<T, DictError>;
