use crate::error::ConfigurationError;
use crate::listener::CacheEventListener;
use crate::policy::PolicyKind;
use std::sync::Arc;
use std::time::Duration;

/// Weight function: `(key, value) -> weight`. A capability object rather than
/// a bare function pointer so it can close over external configuration (see
/// SPEC_FULL.md §2).
pub type Weigher<K, V> = Arc<dyn Fn(&K, &V) -> u32 + Send + Sync>;

/// Synchronous reload function used by `get_or_load` and `refresh_after_write`.
pub type Loader<K, V> = Arc<dyn Fn(&K) -> Result<V, String> + Send + Sync>;

/// Construction-time configuration for a `Cache<K, V>`.
///
/// No builder type is introduced (spec.md §1 scopes "builder ergonomics"
/// out): this is a plain struct with `with_*` chain methods, validated by
/// `build()`.
pub struct CacheConfig<K, V> {
    pub maximum_size: Option<u64>,
    pub maximum_weight: Option<u64>,
    pub weigher: Option<Weigher<K, V>>,
    pub expire_after_write: Option<Duration>,
    pub expire_after_access: Option<Duration>,
    pub refresh_after_write: Option<Duration>,
    pub loader: Option<Loader<K, V>>,
    pub eviction_policy: PolicyKind,
    pub initial_capacity: Option<u32>,
    pub concurrency_level: Option<u32>,
    pub record_stats: bool,
    pub listeners: Vec<Arc<dyn CacheEventListener<K, V>>>,
    pub maintenance_interval: Duration,
    pub read_only: bool,
    pub sketch_sample_multiplier: u64,
}

impl<K, V> Default for CacheConfig<K, V> {
    fn default() -> Self {
        Self {
            maximum_size: None,
            maximum_weight: None,
            weigher: None,
            expire_after_write: None,
            expire_after_access: None,
            refresh_after_write: None,
            loader: None,
            eviction_policy: PolicyKind::WindowTinyLfu,
            initial_capacity: None,
            concurrency_level: None,
            record_stats: true,
            listeners: Vec::new(),
            maintenance_interval: Duration::from_secs(1),
            read_only: false,
            sketch_sample_multiplier: 10,
        }
    }
}

impl<K, V> CacheConfig<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_maximum_size(mut self, n: u64) -> Self {
        self.maximum_size = Some(n);
        self
    }

    pub fn with_maximum_weight(mut self, w: u64) -> Self {
        self.maximum_weight = Some(w);
        self
    }

    pub fn with_weigher(mut self, weigher: Weigher<K, V>) -> Self {
        self.weigher = Some(weigher);
        self
    }

    pub fn with_expire_after_write(mut self, d: Duration) -> Self {
        self.expire_after_write = Some(d);
        self
    }

    pub fn with_expire_after_access(mut self, d: Duration) -> Self {
        self.expire_after_access = Some(d);
        self
    }

    pub fn with_refresh_after_write(mut self, d: Duration) -> Self {
        self.refresh_after_write = Some(d);
        self
    }

    pub fn with_loader(mut self, loader: Loader<K, V>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_eviction_policy(mut self, policy: PolicyKind) -> Self {
        self.eviction_policy = policy;
        self
    }

    pub fn with_initial_capacity(mut self, n: u32) -> Self {
        self.initial_capacity = Some(n);
        self
    }

    pub fn with_concurrency_level(mut self, n: u32) -> Self {
        self.concurrency_level = Some(n);
        self
    }

    pub fn with_record_stats(mut self, enabled: bool) -> Self {
        self.record_stats = enabled;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn CacheEventListener<K, V>>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn with_maintenance_interval(mut self, d: Duration) -> Self {
        self.maintenance_interval = d;
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_sample_multiplier(mut self, multiplier: u64) -> Self {
        self.sketch_sample_multiplier = multiplier;
        self
    }

    /// Resolves the effective concurrency level (shard count), bounded to
    /// `[1, 32]` per spec.md §4.4.
    pub fn resolved_concurrency_level(&self) -> usize {
        let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        self.concurrency_level.map(|n| n as usize).unwrap_or(cpus).clamp(1, 32)
    }

    /// Validates the configuration, performing the checks spec.md §7 assigns
    /// to construction time.
    pub fn build(self) -> Result<Self, ConfigurationError> {
        if let Some(size) = self.maximum_size {
            if size == 0 {
                return Err(ConfigurationError::NotPositive {
                    field: "maximum_size",
                    value: 0,
                });
            }
        }
        if let Some(weight) = self.maximum_weight {
            if weight == 0 {
                return Err(ConfigurationError::NotPositive {
                    field: "maximum_weight",
                    value: 0,
                });
            }
            if self.weigher.is_none() {
                return Err(ConfigurationError::WeightWithoutWeigher);
            }
        }
        if self.refresh_after_write.is_some() && self.loader.is_none() {
            return Err(ConfigurationError::RefreshWithoutLoader);
        }
        if let Some(level) = self.concurrency_level {
            if level == 0 || level > 1024 {
                return Err(ConfigurationError::OutOfBounds {
                    field: "concurrency_level",
                    value: level as i64,
                    expected: "1..=1024",
                });
            }
        }
        Ok(self)
    }
}
