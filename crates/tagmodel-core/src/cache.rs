//! Process-wide cache of resolved model metadata.
//!
//! Each model type is resolved at most once per cache in the common case.
//! Concurrent misses on the same type may both run a resolution; the first
//! one to publish wins and every caller receives that instance afterwards.
//! Entries are never evicted.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::Config;
use crate::error::Result;
use crate::model::ModelMetadata;
use crate::reflect::{Model, ModelRef};
use crate::resolve::{FieldPatch, Resolution};

/// Counters describing cache activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: usize,
    /// Lookups that started a resolution pass.
    pub misses: usize,
    /// Model types resolved, including associated types reached from a miss.
    pub resolved: usize,
}

impl CacheStats {
    /// Fraction of lookups answered from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Thread-safe store of [`ModelMetadata`] keyed by model type.
///
/// # Example
///
/// ```ignore
/// let cache = ModelCache::new(Config::default());
/// let users = cache.get::<User>();
/// assert_eq!(users.table_name(cache.config()), "users");
/// ```
pub struct ModelCache {
    config: Config,
    models: RwLock<HashMap<TypeId, Arc<ModelMetadata>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
    resolved: AtomicUsize,
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("config", &self.config)
            .field("models", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl ModelCache {
    /// Create an empty cache resolving under `config`.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            models: RwLock::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            resolved: AtomicUsize::new(0),
        }
    }

    /// Configuration this cache resolves under.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Metadata for `M`, resolving it on first use.
    pub fn get<M: Model>(&self) -> Arc<ModelMetadata> {
        self.get_or_resolve(ModelRef::of::<M>(), None)
    }

    /// Metadata for the type of `value`.
    ///
    /// On first use the value's own [`Model::table_name`] takes precedence over
    /// the type-level name. Once cached, the stored name is reused for every
    /// value of the type.
    pub fn get_for<M: Model>(&self, value: &M) -> Arc<ModelMetadata> {
        let model = ModelRef::of::<M>();
        match self.cached(model.id()) {
            Some(meta) => meta,
            None => self.get_or_resolve(model, value.table_name()),
        }
    }

    /// Metadata for `M`, failing in strict mode when a relationship candidate
    /// was left without a foreign key or `M` is not a struct.
    pub fn try_get<M: Model>(&self) -> Result<Arc<ModelMetadata>> {
        let meta = self.get::<M>();
        if self.config.strict {
            if let Err(err) = meta.check_relationships() {
                tracing::warn!(model = M::NAME, error = %err, "Strict model check failed");
                return Err(err);
            }
        }
        Ok(meta)
    }

    /// Table name of `M` after the configured naming hook.
    pub fn table_name<M: Model>(&self) -> String {
        self.get::<M>().table_name(&self.config)
    }

    /// True if `M` has been resolved into this cache.
    pub fn contains<M: Model>(&self) -> bool {
        self.read().contains_key(&TypeId::of::<M>())
    }

    /// Number of cached model types.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True if nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            resolved: self.resolved.load(Ordering::Relaxed),
        }
    }

    /// Cached metadata without touching the counters.
    pub(crate) fn lookup(&self, id: TypeId) -> Option<Arc<ModelMetadata>> {
        self.read().get(&id).cloned()
    }

    fn cached(&self, id: TypeId) -> Option<Arc<ModelMetadata>> {
        let meta = self.lookup(id)?;
        self.hits.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(model = meta.model_type.name(), "Model cache hit");
        Some(meta)
    }

    #[tracing::instrument(level = "debug", skip(self, model, table_name), fields(model = model.name()))]
    fn get_or_resolve(&self, model: ModelRef, table_name: Option<String>) -> Arc<ModelMetadata> {
        if let Some(meta) = self.cached(model.id()) {
            return meta;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let mut resolution = Resolution::new(self);
        let root = resolution.resolve(&model.describe(), table_name);
        resolution.publish(root)
    }

    /// Store the models finished by one resolution pass and apply its
    /// foreign-key patches under a single write lock.
    ///
    /// Patches mark fields of already cached models in place; a published
    /// `Arc` is never replaced.
    pub(crate) fn publish(
        &self,
        root: ModelMetadata,
        finished: Vec<ModelMetadata>,
        patches: &[FieldPatch],
    ) -> Arc<ModelMetadata> {
        self.resolved
            .fetch_add(finished.len() + 1, Ordering::Relaxed);

        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);

        for patch in patches {
            let Some(entry) = models.get(&patch.model) else {
                continue;
            };
            if let Some(field) = entry.fields.get(patch.field) {
                if !field.is_foreign_key() {
                    tracing::trace!(
                        model = entry.model_type.name(),
                        field = %field.name,
                        "Marked foreign key"
                    );
                    field.mark_foreign_key();
                }
            }
        }

        for meta in finished {
            models
                .entry(meta.model_type.id())
                .or_insert_with(|| Arc::new(meta));
        }
        let published = models
            .entry(root.model_type.id())
            .or_insert_with(|| Arc::new(root));
        Arc::clone(published)
    }

    fn read(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<TypeId, Arc<ModelMetadata>>> {
        self.models.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            resolved: 2,
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_empty_cache() {
        let cache = ModelCache::default();
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats(), CacheStats::default());
        assert!(format!("{cache:?}").contains("ModelCache"));
    }
}
