//! Shared cache instances per namespace
//!
//! A [`CacheRegistry`] is the context object handed to code that needs a
//! cache. It opens each namespace once and returns the same instance on later
//! requests, so two callers asking for the same directory share one lock and
//! one in-memory index.

use crate::cache::{
    config::CacheConfig,
    store::{start_auto_cleanup, ExpiringCache},
    types::Namespace,
};
use crate::error::{CacheError, Result};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

struct RegistryInner {
    caches: HashMap<Namespace, Arc<ExpiringCache>>,
    cleanup_tasks: Vec<JoinHandle<()>>,
}

/// Lazily opened namespaces sharing one configuration
pub struct CacheRegistry {
    config: CacheConfig,
    inner: Mutex<RegistryInner>,
}

impl CacheRegistry {
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate().map_err(CacheError::ConfigError)?;

        Ok(Self {
            config,
            inner: Mutex::new(RegistryInner {
                caches: HashMap::new(),
                cleanup_tasks: Vec::new(),
            }),
        })
    }

    /// Registry configured from the environment
    pub fn from_env() -> Result<Self> {
        Self::new(CacheConfig::from_env()?)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The process-local namespace
    pub async fn default_cache(&self) -> Result<Arc<ExpiringCache>> {
        self.namespace(Namespace::Default).await
    }

    /// The namespace persisted under `dir`
    pub async fn directory(&self, dir: impl AsRef<Path>) -> Result<Arc<ExpiringCache>> {
        self.namespace(Namespace::directory(dir.as_ref())).await
    }

    /// Get or open the cache for `namespace`
    ///
    /// Directory paths are normalized first, so every spelling of a folder
    /// maps to the same instance. Auto cleanup tasks are spawned on the
    /// current tokio runtime when enabled.
    pub async fn namespace(&self, namespace: Namespace) -> Result<Arc<ExpiringCache>> {
        let namespace = match namespace {
            Namespace::Directory(dir) => Namespace::Directory(normalize(&dir).await),
            Namespace::Default => Namespace::Default,
        };

        let mut inner = self.inner.lock().await;

        if let Some(cache) = inner.caches.get(&namespace) {
            return Ok(Arc::clone(cache));
        }

        debug!("Opening cache namespace {}", namespace);
        let cache = Arc::new(ExpiringCache::for_namespace(namespace.clone(), self.config.clone()).await?);

        if self.config.enable_auto_cleanup {
            let task = tokio::spawn(start_auto_cleanup(Arc::clone(&cache)));
            inner.cleanup_tasks.push(task);
        }

        inner.caches.insert(namespace, Arc::clone(&cache));
        Ok(cache)
    }

    /// Namespaces opened so far
    pub async fn namespaces(&self) -> Vec<Namespace> {
        let inner = self.inner.lock().await;
        inner.caches.keys().cloned().collect()
    }
}

impl Drop for CacheRegistry {
    fn drop(&mut self) {
        for task in &self.inner.get_mut().cleanup_tasks {
            task.abort();
        }
    }
}

/// Canonical form of a directory so that equivalent spellings share a
/// namespace. The deepest existing ancestor is canonicalized and the missing
/// components below it are resolved lexically, so the key stays the same
/// once the directory is created.
async fn normalize(dir: &Path) -> PathBuf {
    let absolute = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(dir),
            Err(_) => dir.to_path_buf(),
        }
    };

    for ancestor in absolute.ancestors() {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        if let Ok(canonical) = tokio::fs::canonicalize(ancestor).await {
            let rest = absolute.strip_prefix(ancestor).unwrap_or(Path::new(""));
            return join_lexically(canonical, rest);
        }
    }

    join_lexically(PathBuf::new(), &absolute)
}

/// Append `rest` to `base`, folding `.` and `..` without touching the disk
fn join_lexically(mut base: PathBuf, rest: &Path) -> PathBuf {
    for component in rest.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                base.pop();
            }
            other => base.push(other),
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_same_namespace_is_shared() {
        let registry = CacheRegistry::new(CacheConfig::default()).unwrap();

        let a = registry.default_cache().await.unwrap();
        let b = registry.default_cache().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        a.put("shared", "yes").await.unwrap();
        assert_eq!(b.get::<String>("shared").await.unwrap(), Some("yes".to_string()));
    }

    #[tokio::test]
    async fn test_namespaces_are_independent() {
        let tmp = TempDir::new().unwrap();
        let registry = CacheRegistry::new(CacheConfig::default()).unwrap();

        let default = registry.default_cache().await.unwrap();
        let dir = registry.directory(tmp.path()).await.unwrap();

        default.put("key", "in memory").await.unwrap();
        dir.put("key", "on disk").await.unwrap();

        assert_eq!(default.get::<String>("key").await.unwrap(), Some("in memory".to_string()));
        assert_eq!(dir.get::<String>("key").await.unwrap(), Some("on disk".to_string()));
        assert_eq!(registry.namespaces().await.len(), 2);
    }

    #[tokio::test]
    async fn test_equivalent_paths_share_namespace() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("Cache")).unwrap();
        let registry = CacheRegistry::new(CacheConfig::default()).unwrap();

        let a = registry.directory(tmp.path().join("Cache")).await.unwrap();
        let b = registry
            .directory(tmp.path().join(".").join("Cache"))
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_namespace_stable_across_directory_creation() {
        let tmp = TempDir::new().unwrap();
        let registry = CacheRegistry::new(CacheConfig::default()).unwrap();
        let dir = tmp.path().join("Cache");

        let before = registry.directory(&dir).await.unwrap();
        before.put("key", "value").await.unwrap();
        assert!(dir.exists());

        let after = registry.directory(&dir).await.unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_namespace_entry_point_normalizes_paths() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        let registry = CacheRegistry::new(CacheConfig::default()).unwrap();
        let spelled = tmp.path().join("sub").join("..").join("Cache");

        let a = registry.directory(&spelled).await.unwrap();
        let b = registry
            .namespace(Namespace::directory(&spelled))
            .await
            .unwrap();
        let c = registry
            .namespace(Namespace::directory(tmp.path().join("Cache")))
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));

        a.put("k", "v").await.unwrap();
        assert!(b.remove("k").await.unwrap());
        assert!(a.get::<String>("k").await.unwrap().is_none());
        assert_eq!(registry.namespaces().await.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_components_resolved_lexically() {
        let tmp = TempDir::new().unwrap();
        let canonical = tokio::fs::canonicalize(tmp.path()).await.unwrap();

        let normalized = normalize(&tmp.path().join("missing").join("..").join("Cache")).await;
        assert_eq!(normalized, canonical.join("Cache"));

        let normalized = normalize(&tmp.path().join(".").join("a").join("b")).await;
        assert_eq!(normalized, canonical.join("a").join("b"));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = CacheConfig::builder().max_entries(0).build();
        assert!(matches!(
            CacheRegistry::new(config),
            Err(CacheError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_auto_cleanup_sweeps_expired_entries() {
        let config = CacheConfig::builder()
            .enable_auto_cleanup(true)
            .cleanup_interval(Duration::from_millis(50))
            .build();
        let registry = CacheRegistry::new(config).unwrap();
        let cache = registry.default_cache().await.unwrap();

        cache.put_with_ttl("gone", "soon", 0).await.unwrap();
        cache.put("kept", "forever").await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.stats().await.evictions_ttl, 1);
    }
}
