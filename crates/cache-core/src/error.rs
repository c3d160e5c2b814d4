use thiserror::Error;

/// Errors surfaced by `cache-core`, per spec.md §7's error-kind catalogue.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Invalid configuration, raised at `CacheConfig::build()` time.
    #[error("invalid cache configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The configured loader raised or returned a failure for `get_or_load`.
    #[error("load failed: {0}")]
    LoadFailure(String),

    /// A deadline passed before a blocking operation completed.
    #[error("operation timed out")]
    Timeout,

    /// The operation was aborted by shutdown or an explicit user request.
    #[error("operation was cancelled")]
    Cancelled,

    /// An internal invariant was violated; indicates a bug rather than bad
    /// input. Per spec.md §4.11, a victim-selection failure under a
    /// capacity-violating store is treated as a fatal invariant breach.
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),

    /// The cache was constructed with `read_only`, and a mutation was
    /// attempted. See SPEC_FULL.md §4's ReadOnly resolution.
    #[error("cache is read-only")]
    ReadOnly,
}

/// Sub-kinds of `CacheError::Configuration`, raised at construction time.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: i64 },

    #[error("maximum_weight is set but no weigher was configured")]
    WeightWithoutWeigher,

    #[error("refresh_after_write is set but no loader was configured")]
    RefreshWithoutLoader,

    #[error("{field} out of bounds: {value} (expected {expected})")]
    OutOfBounds {
        field: &'static str,
        value: i64,
        expected: &'static str,
    },
}
