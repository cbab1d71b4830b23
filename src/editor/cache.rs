use std::hash::{DefaultHasher, Hash, Hasher};
use std::rc::Rc;

/// Fold a dependency set into a single fingerprint.
///
/// Dependencies are a set, so item order does not matter: per-item hashes
/// are sorted before they are combined.
pub(crate) fn fingerprint<D: Hash>(dependencies: &[D]) -> u64 {
    let mut item_hashes: Vec<u64> = dependencies
        .iter()
        .map(|dep| {
            let mut hasher = DefaultHasher::new();
            dep.hash(&mut hasher);
            hasher.finish()
        })
        .collect();
    item_hashes.sort_unstable();
    item_hashes.dedup();

    let mut hasher = DefaultHasher::new();
    item_hashes.hash(&mut hasher);
    hasher.finish()
}

/// Computes a value once per dependency fingerprint and hands out the same
/// `Rc` on every later access.
///
/// Callers compare identities with [`Rc::ptr_eq`]; an equal-but-new value
/// would look like a configuration change to the editor and reset it.
#[derive(Debug)]
pub struct ConfigCache<T> {
    slot: Option<(u64, Rc<T>)>,
    computations: usize,
}

impl<T> ConfigCache<T> {
    /// Create an empty cache.
    pub const fn new() -> Self {
        Self {
            slot: None,
            computations: 0,
        }
    }

    /// Return the cached value for `dependencies`, computing it if the
    /// fingerprint changed or nothing is cached yet.
    pub fn get_or_init<D, F>(&mut self, dependencies: &[D], compute: F) -> Rc<T>
    where
        D: Hash,
        F: FnOnce() -> T,
    {
        let key = fingerprint(dependencies);
        if let Some((cached_key, value)) = &self.slot
            && *cached_key == key
        {
            return Rc::clone(value);
        }
        self.store(key, compute())
    }

    /// Fallible variant of [`get_or_init`](Self::get_or_init).
    ///
    /// A failing `compute` leaves the cache empty.
    ///
    /// # Errors
    /// Propagates the error returned by `compute`.
    pub fn get_or_try_init<D, E, F>(&mut self, dependencies: &[D], compute: F) -> Result<Rc<T>, E>
    where
        D: Hash,
        F: FnOnce() -> Result<T, E>,
    {
        let key = fingerprint(dependencies);
        if let Some((cached_key, value)) = &self.slot
            && *cached_key == key
        {
            return Ok(Rc::clone(value));
        }
        match compute() {
            Ok(value) => Ok(self.store(key, value)),
            Err(err) => {
                self.slot = None;
                Err(err)
            }
        }
    }

    /// The cached value, if any, without computing.
    pub fn peek(&self) -> Option<&Rc<T>> {
        self.slot.as_ref().map(|(_, value)| value)
    }

    /// Drop the cached value.
    pub fn invalidate(&mut self) {
        self.slot = None;
    }

    /// How many times a value has been computed.
    pub const fn computations(&self) -> usize {
        self.computations
    }

    fn store(&mut self, key: u64, value: T) -> Rc<T> {
        self.computations += 1;
        tracing::debug!(
            fingerprint = key,
            computations = self.computations,
            "computed editor configuration"
        );
        let value = Rc::new(value);
        self.slot = Some((key, Rc::clone(&value)));
        value
    }
}

impl<T> Default for ConfigCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{ConfigurationError, EditorConfiguration};

    const NO_DEPS: &[u8] = &[];

    #[test]
    fn test_empty_dependencies_reuse_identity() {
        let mut cache = ConfigCache::new();
        let first = cache.get_or_init(NO_DEPS, EditorConfiguration::default);
        let second = cache.get_or_init(NO_DEPS, || panic!("must not recompute"));
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.computations(), 1);
    }

    #[test]
    fn test_changed_dependencies_recompute() {
        let mut cache = ConfigCache::new();
        let first = cache.get_or_init(&["a"], || 1);
        let second = cache.get_or_init(&["b"], || 2);
        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(*second, 2);
        assert_eq!(cache.computations(), 2);
    }

    #[test]
    fn test_dependency_order_does_not_matter() {
        let mut cache = ConfigCache::new();
        let first = cache.get_or_init(&["png", "gif"], || 1);
        let second = cache.get_or_init(&["gif", "png"], || 2);
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_invalidate_forces_recompute() {
        let mut cache = ConfigCache::new();
        let first = cache.get_or_init(NO_DEPS, || 1);
        cache.invalidate();
        assert!(cache.peek().is_none());
        let second = cache.get_or_init(NO_DEPS, || 1);
        assert!(!Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_failed_compute_leaves_cache_empty() {
        let mut cache: ConfigCache<EditorConfiguration> = ConfigCache::new();
        let result = cache.get_or_try_init(NO_DEPS, || {
            Err(ConfigurationError::EmptyImageExtensions)
        });
        assert!(result.is_err());
        assert!(cache.peek().is_none());
        assert_eq!(cache.computations(), 0);

        let ok = cache.get_or_try_init(NO_DEPS, || {
            Ok::<_, ConfigurationError>(EditorConfiguration::default())
        });
        assert!(ok.is_ok());
    }
}
