//! One-time model initialization shared by every caller.
//!
//! The first [`ModelLifecycleManager::ensure_ready`] call spawns a task that
//! loads the embedding provider and embeds the catalog. Callers arriving while
//! it runs await the same [`Shared`] future, so there is never more than one
//! load in flight and everyone sees the same outcome. Once ready, the model is
//! read from a [`OnceLock`] without touching the state mutex.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use semantic::{
    ConfigLoader, EmbedOptions, EmbeddingProvider, ProviderLoader, RetryConfig, SemanticConfig,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::catalog::SpecialtyCatalog;
use crate::error::LifecycleError;
use crate::ranker::CatalogVectorIndex;

/// Timeouts and failure backoff for the lifecycle manager.
///
/// A zero timeout disables that timeout. A zero `retry_backoff.base_delay`
/// lets the call right after a failure reload immediately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Upper bound on provider load plus catalog embedding.
    #[serde(with = "semantic::serde_millis")]
    pub init_timeout: Duration,
    /// Upper bound on embedding one query.
    #[serde(with = "semantic::serde_millis")]
    pub embed_timeout: Duration,
    /// Spacing between initialization attempts after consecutive failures.
    /// Fields left out of a config file keep the values of [`default_backoff`].
    #[serde(deserialize_with = "deserialize_backoff")]
    pub retry_backoff: RetryConfig,
    /// Options used for both catalog and query embeddings. Managers built from a
    /// [`SemanticConfig`] take these from [`SemanticConfig::embed_options`].
    #[serde(skip)]
    pub embed_options: EmbedOptions,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            init_timeout: Duration::from_secs(120),
            embed_timeout: Duration::from_secs(30),
            retry_backoff: default_backoff(),
            embed_options: EmbedOptions::default(),
        }
    }
}

/// Initialization backoff: 500 ms doubling up to 30 s, no jitter.
pub fn default_backoff() -> RetryConfig {
    RetryConfig::default()
        .with_base_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(30))
        .with_jitter(false)
}

#[derive(Deserialize)]
struct BackoffOverrides {
    max_retries: Option<u32>,
    #[serde(default, with = "semantic::serde_millis::option")]
    base_delay: Option<Duration>,
    #[serde(default, with = "semantic::serde_millis::option")]
    max_delay: Option<Duration>,
    backoff_multiplier: Option<f64>,
    jitter: Option<bool>,
}

fn deserialize_backoff<'de, D>(deserializer: D) -> Result<RetryConfig, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let overrides = BackoffOverrides::deserialize(deserializer)?;
    let base = default_backoff();
    Ok(RetryConfig {
        max_retries: overrides.max_retries.unwrap_or(base.max_retries),
        base_delay: overrides.base_delay.unwrap_or(base.base_delay),
        max_delay: overrides.max_delay.unwrap_or(base.max_delay),
        backoff_multiplier: overrides
            .backoff_multiplier
            .unwrap_or(base.backoff_multiplier),
        jitter: overrides.jitter.unwrap_or(base.jitter),
    })
}

impl LifecycleConfig {
    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: RetryConfig) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Reload on the very next call after a failure.
    pub fn without_backoff(self) -> Self {
        let backoff = self.retry_backoff.with_base_delay(Duration::ZERO);
        self.with_retry_backoff(backoff)
    }
}

/// Externally visible lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ModelState {
    Unloaded,
    Loading,
    Ready,
    Failed {
        consecutive_failures: u32,
        last_error: String,
    },
}

impl ModelState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelState::Ready)
    }
}

/// A loaded provider together with the catalog vectors it produced.
pub struct ReadyModel {
    provider: Arc<dyn EmbeddingProvider>,
    index: CatalogVectorIndex,
}

impl ReadyModel {
    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn index(&self) -> &CatalogVectorIndex {
        &self.index
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }
}

impl std::fmt::Debug for ReadyModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadyModel")
            .field("model", &self.provider.model_name())
            .field("specialties", &self.index.len())
            .field("dimension", &self.index.dimension())
            .finish()
    }
}

type InitResult = Result<Arc<ReadyModel>, LifecycleError>;
type InitFuture = Shared<BoxFuture<'static, InitResult>>;

enum Slot {
    Unloaded,
    Loading {
        pending: InitFuture,
        prior_failures: u32,
    },
    Ready(Arc<ReadyModel>),
    Failed {
        retry_at: Instant,
        failures: u32,
        error: LifecycleError,
    },
}

struct Inner {
    loader: Arc<dyn ProviderLoader>,
    catalog: SpecialtyCatalog,
    config: LifecycleConfig,
    ready: OnceLock<Arc<ReadyModel>>,
    slot: Mutex<Slot>,
}

/// Owns the embedding model and the catalog vectors derived from it.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct ModelLifecycleManager {
    inner: Arc<Inner>,
}

impl ModelLifecycleManager {
    pub fn new(
        loader: Arc<dyn ProviderLoader>,
        catalog: SpecialtyCatalog,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                loader,
                catalog,
                config,
                ready: OnceLock::new(),
                slot: Mutex::new(Slot::Unloaded),
            }),
        }
    }

    /// Manager whose provider is built from a [`SemanticConfig`]. Its pooling
    /// and normalization replace `config.embed_options`.
    pub fn from_semantic_config(
        semantic: SemanticConfig,
        catalog: SpecialtyCatalog,
        mut config: LifecycleConfig,
    ) -> Self {
        config.embed_options = semantic.embed_options();
        Self::new(Arc::new(ConfigLoader::new(semantic)), catalog, config)
    }

    pub fn catalog(&self) -> &SpecialtyCatalog {
        &self.inner.catalog
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.inner.config
    }

    /// The ready model, if initialization already succeeded.
    pub fn ready_model(&self) -> Option<Arc<ReadyModel>> {
        self.inner.ready.get().cloned()
    }

    pub fn state(&self) -> ModelState {
        if self.inner.ready.get().is_some() {
            return ModelState::Ready;
        }
        match &*self.inner.lock_slot() {
            Slot::Unloaded => ModelState::Unloaded,
            Slot::Loading { .. } => ModelState::Loading,
            Slot::Ready(_) => ModelState::Ready,
            Slot::Failed {
                failures, error, ..
            } => ModelState::Failed {
                consecutive_failures: *failures,
                last_error: error.to_string(),
            },
        }
    }

    /// Brings the model to the ready state, or joins the load already running.
    ///
    /// After a failure the next call past the backoff window starts a fresh
    /// load; calls inside the window get the last error back.
    pub async fn ensure_ready(&self) -> Result<Arc<ReadyModel>, LifecycleError> {
        if let Some(model) = self.inner.ready.get() {
            return Ok(Arc::clone(model));
        }

        let pending = {
            let mut slot = self.inner.lock_slot();
            let (joined, prior_failures) = match &*slot {
                Slot::Ready(model) => return Ok(Arc::clone(model)),
                Slot::Loading { pending, .. } => (Some(pending.clone()), 0),
                Slot::Failed {
                    retry_at, error, ..
                } if Instant::now() < *retry_at => return Err(error.clone()),
                Slot::Failed { failures, .. } => (None, *failures),
                Slot::Unloaded => (None, 0),
            };

            match joined {
                Some(pending) => {
                    debug!("joining in-flight model initialization");
                    pending
                }
                None => {
                    let pending = Inner::spawn_initialization(&self.inner);
                    *slot = Slot::Loading {
                        pending: pending.clone(),
                        prior_failures,
                    };
                    pending
                }
            }
        };

        pending.await
    }
}

impl Inner {
    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_initialization(inner: &Arc<Inner>) -> InitFuture {
        let task_inner = Arc::clone(inner);
        let handle = tokio::spawn(async move {
            let result = task_inner.initialize().await;
            task_inner.complete(&result);
            result
        });

        let abort_inner = Arc::clone(inner);
        async move {
            match handle.await {
                Ok(result) => result,
                Err(join_err) => {
                    let result = Err(LifecycleError::Aborted(join_err.to_string()));
                    abort_inner.complete(&result);
                    result
                }
            }
        }
        .boxed()
        .shared()
    }

    async fn initialize(&self) -> InitResult {
        let started = Instant::now();
        info!(specialties = self.catalog.len(), "loading embedding model");

        let work = async {
            let provider = self.loader.load().await?;
            let index =
                embed_catalog(provider.as_ref(), &self.catalog, self.config.embed_options).await?;
            Ok::<_, LifecycleError>(ReadyModel { provider, index })
        };

        let model = with_deadline(self.config.init_timeout, work)
            .await
            .ok_or(LifecycleError::Timeout(self.config.init_timeout))??;

        info!(
            model = model.model_name(),
            specialties = model.index.len(),
            dimension = ?model.index.dimension(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "embedding model and specialty vectors ready"
        );
        Ok(Arc::new(model))
    }

    fn complete(&self, result: &InitResult) {
        let mut slot = self.lock_slot();
        // a previous completion (task vs. abort path) already settled it
        if !matches!(&*slot, Slot::Loading { .. }) {
            return;
        }
        match result {
            Ok(model) => {
                let _ = self.ready.set(Arc::clone(model));
                *slot = Slot::Ready(Arc::clone(model));
            }
            Err(err) => {
                let prior = match &*slot {
                    Slot::Loading { prior_failures, .. } => *prior_failures,
                    _ => 0,
                };
                let failures = prior.saturating_add(1);
                let wait = self.config.retry_backoff.calculate_delay(failures);
                error!(
                    error = %err,
                    consecutive_failures = failures,
                    retry_in_ms = wait.as_millis() as u64,
                    "model initialization failed"
                );
                *slot = Slot::Failed {
                    retry_at: Instant::now() + wait,
                    failures,
                    error: err.clone(),
                };
            }
        }
    }
}

/// Embeds every specialty description in catalog order.
async fn embed_catalog(
    provider: &dyn EmbeddingProvider,
    catalog: &SpecialtyCatalog,
    options: EmbedOptions,
) -> Result<CatalogVectorIndex, LifecycleError> {
    let mut index = CatalogVectorIndex::with_capacity(catalog.len());
    for specialty in catalog {
        let vector = provider.embed(&specialty.description, options).await?;
        index.insert(specialty.name.as_str(), vector)?;
    }
    if catalog.is_empty() {
        warn!("specialty catalog is empty; every prediction will use the fallback");
    }
    Ok(index)
}

/// Runs `fut` under `limit`; `None` means it timed out. A zero limit never times out.
pub(crate) async fn with_deadline<F: Future>(limit: Duration, fut: F) -> Option<F::Output> {
    if limit.is_zero() {
        return Some(fut.await);
    }
    tokio::time::timeout(limit, fut).await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Specialty;
    use async_trait::async_trait;
    use semantic::{EmbeddingVector, SemanticError, StubEmbedder};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLoader {
        calls: AtomicUsize,
        fail_first: usize,
        delay: Duration,
    }

    impl CountingLoader {
        fn new(fail_first: usize, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_first,
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProviderLoader for CountingLoader {
        async fn load(&self) -> Result<Arc<dyn EmbeddingProvider>, SemanticError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if call < self.fail_first {
                return Err(SemanticError::Download(format!("attempt {call} offline")));
            }
            Ok(Arc::new(StubEmbedder::new("stub", 16)))
        }
    }

    struct RaggedProvider;

    #[async_trait]
    impl EmbeddingProvider for RaggedProvider {
        async fn embed(
            &self,
            text: &str,
            _options: EmbedOptions,
        ) -> Result<EmbeddingVector, SemanticError> {
            Ok(vec![1.0; text.len() % 3 + 1])
        }

        fn model_name(&self) -> &str {
            "ragged"
        }
    }

    struct RaggedLoader;

    #[async_trait]
    impl ProviderLoader for RaggedLoader {
        async fn load(&self) -> Result<Arc<dyn EmbeddingProvider>, SemanticError> {
            Ok(Arc::new(RaggedProvider))
        }
    }

    fn manager(loader: Arc<dyn ProviderLoader>, config: LifecycleConfig) -> ModelLifecycleManager {
        ModelLifecycleManager::new(loader, SpecialtyCatalog::default(), config)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_load() {
        let loader = CountingLoader::new(0, Duration::from_millis(50));
        let mgr = manager(loader.clone(), LifecycleConfig::default());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let mgr = mgr.clone();
            handles.push(tokio::spawn(async move { mgr.ensure_ready().await }));
        }
        for handle in handles {
            let model = handle.await.unwrap().unwrap();
            assert_eq!(model.index().len(), 12);
        }

        assert_eq!(loader.calls(), 1);
        assert_eq!(mgr.state(), ModelState::Ready);
    }

    #[tokio::test]
    async fn ready_call_does_not_reload() {
        let loader = CountingLoader::new(0, Duration::ZERO);
        let mgr = manager(loader.clone(), LifecycleConfig::default());
        let first = mgr.ensure_ready().await.unwrap();
        let second = mgr.ensure_ready().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test]
    async fn failure_is_retried_on_next_call() {
        let loader = CountingLoader::new(1, Duration::ZERO);
        let mgr = manager(loader.clone(), LifecycleConfig::default().without_backoff());

        let err = mgr.ensure_ready().await.unwrap_err();
        assert!(matches!(err, LifecycleError::Initialization(_)));
        assert!(matches!(
            mgr.state(),
            ModelState::Failed {
                consecutive_failures: 1,
                ..
            }
        ));

        mgr.ensure_ready().await.unwrap();
        assert_eq!(loader.calls(), 2);
        assert!(mgr.state().is_ready());
    }

    #[tokio::test]
    async fn failure_within_backoff_returns_cached_error() {
        let loader = CountingLoader::new(1, Duration::ZERO);
        let config = LifecycleConfig::default().with_retry_backoff(
            RetryConfig::default()
                .with_base_delay(Duration::from_secs(60))
                .with_jitter(false),
        );
        let mgr = manager(loader.clone(), config);

        assert!(mgr.ensure_ready().await.is_err());
        assert!(mgr.ensure_ready().await.is_err());
        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_waiters_all_see_same_failure() {
        let loader = CountingLoader::new(usize::MAX, Duration::from_millis(30));
        let mgr = manager(loader.clone(), LifecycleConfig::default());

        let results = futures::future::join_all((0..8).map(|_| mgr.ensure_ready())).await;
        assert!(results.iter().all(|r| r.is_err()));
        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test]
    async fn slow_load_times_out() {
        let loader = CountingLoader::new(0, Duration::from_secs(5));
        let config = LifecycleConfig::default()
            .with_init_timeout(Duration::from_millis(20))
            .without_backoff();
        let mgr = manager(loader, config);

        let err = mgr.ensure_ready().await.unwrap_err();
        assert!(matches!(err, LifecycleError::Timeout(_)));
    }

    #[tokio::test]
    async fn mismatched_catalog_dimensions_fail_initialization() {
        let mgr = manager(Arc::new(RaggedLoader), LifecycleConfig::default());
        let err = mgr.ensure_ready().await.unwrap_err();
        assert!(matches!(err, LifecycleError::Index(_)));
        assert!(mgr.ready_model().is_none());
    }

    #[tokio::test]
    async fn catalog_vectors_follow_catalog_order() {
        let catalog = SpecialtyCatalog::new(vec![
            Specialty::new("Zeta", "last letter"),
            Specialty::new("Alpha", "first letter"),
        ])
        .unwrap();
        let mgr = ModelLifecycleManager::new(
            CountingLoader::new(0, Duration::ZERO),
            catalog,
            LifecycleConfig::default(),
        );
        let model = mgr.ensure_ready().await.unwrap();
        let names: Vec<&str> = model.index().iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["Zeta", "Alpha"]);
    }

    #[test]
    fn state_starts_unloaded() {
        let mgr = manager(CountingLoader::new(0, Duration::ZERO), LifecycleConfig::default());
        assert_eq!(mgr.state(), ModelState::Unloaded);
    }

    #[test]
    fn config_deserializes_millis() {
        let cfg: LifecycleConfig =
            serde_json::from_str(r#"{"init_timeout": 1500, "embed_timeout": 0}"#).unwrap();
        assert_eq!(cfg.init_timeout, Duration::from_millis(1500));
        assert!(cfg.embed_timeout.is_zero());
        assert_eq!(cfg.retry_backoff.base_delay, Duration::from_millis(500));
    }

    #[test]
    fn partial_backoff_keeps_lifecycle_defaults() {
        let cfg: LifecycleConfig =
            serde_json::from_str(r#"{"retry_backoff": {"base_delay": 250}}"#).unwrap();
        assert_eq!(cfg.retry_backoff.base_delay, Duration::from_millis(250));
        assert_eq!(cfg.retry_backoff.max_delay, Duration::from_secs(30));
        assert!(!cfg.retry_backoff.jitter);
    }

    #[tokio::test]
    async fn semantic_options_drive_catalog_embeddings() {
        let semantic = SemanticConfig {
            normalize: false,
            ..SemanticConfig::fast()
        };
        let mgr = ModelLifecycleManager::from_semantic_config(
            semantic,
            SpecialtyCatalog::default(),
            LifecycleConfig::default(),
        );
        assert!(!mgr.config().embed_options.normalize);

        let model = mgr.ensure_ready().await.unwrap();
        let (_, vector) = model.index().iter().next().unwrap();
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() > 1e-3, "vector was normalized: {norm}");
    }
}
