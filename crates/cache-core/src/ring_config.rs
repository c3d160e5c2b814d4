/// Configuration for a single `Ring` (and, by extension, a `StripedRingBuffer`).
#[derive(Debug, Clone, Copy)]
pub struct RingConfig {
    /// Ring buffer size as a power of 2 (default: 10 = 1024 slots).
    pub ring_bits: u8,
    /// Enable per-ring metrics collection (slight overhead).
    pub enable_metrics: bool,
}

impl RingConfig {
    /// Creates a new configuration with custom settings.
    ///
    /// # Panics
    ///
    /// Panics if `ring_bits` is 0 or greater than 20 (1M slots max) to prevent
    /// excessive memory usage per stripe.
    pub const fn new(ring_bits: u8, enable_metrics: bool) -> Self {
        assert!(
            ring_bits > 0 && ring_bits <= 20,
            "ring_bits must be between 1 and 20 (max 1M slots)"
        );

        Self {
            ring_bits,
            enable_metrics,
        }
    }

    /// Returns the capacity of the ring buffer.
    #[inline]
    pub const fn capacity(&self) -> usize {
        1 << self.ring_bits
    }

    /// Returns the mask for index wrapping.
    #[inline]
    pub const fn mask(&self) -> usize {
        self.capacity() - 1
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            ring_bits: 10, // 1024 slots per stripe
            enable_metrics: false,
        }
    }
}
