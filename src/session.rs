//! Session-scoped catalog state
//!
//! The catalog is loaded once and shared as an immutable `Arc<Catalog>`
//! snapshot. Requests take a snapshot and keep it for their whole run.
//! Reloading installs a new snapshot under the write lock, so no reader
//! observes a half-updated catalog and in-flight requests finish against
//! the catalog they started with.

use crate::config::EngineConfig;
use crate::pipeline::{PictogramPipeline, UnitMatches};
use crate::segment::GranularityMode;
use picto_semantic_matcher::{Catalog, MatcherError};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{info, instrument};

/// Built-in catalog snapshot. Idempotent: every call returns the same `Arc`.
pub fn load_catalog() -> Result<Arc<Catalog>, MatcherError> {
    Catalog::builtin()
}

/// Load a JSON catalog file into a fresh snapshot
pub fn load_catalog_from(path: &Path) -> Result<Arc<Catalog>, MatcherError> {
    Catalog::load(path).map(Arc::new)
}

/// Catalog from `config.catalog_path`, or the built-in one
pub fn load_configured_catalog(config: &EngineConfig) -> Result<Arc<Catalog>, MatcherError> {
    match &config.catalog_path {
        Some(path) => load_catalog_from(path),
        None => load_catalog(),
    }
}

/// Holder of the current catalog snapshot
#[derive(Debug)]
pub struct CatalogStore {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogStore {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            current: RwLock::new(catalog),
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<Catalog> {
        // Swaps are a single assignment, so a poisoned lock still holds a whole snapshot
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Install `catalog`, returning the previous snapshot
    pub fn replace(&self, catalog: Arc<Catalog>) -> Arc<Catalog> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        info!(
            "Catalog replaced ({} -> {} entries)",
            guard.len(),
            catalog.len()
        );
        std::mem::replace(&mut *guard, catalog)
    }

    /// Run `loader` while holding the write lock and install its result.
    ///
    /// Snapshot calls block until the load finishes. On error the current
    /// snapshot is kept.
    pub fn reload_with<F>(&self, loader: F) -> Result<Arc<Catalog>, MatcherError>
    where
        F: FnOnce() -> Result<Catalog, MatcherError>,
    {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let catalog = Arc::new(loader()?);
        info!(
            "Catalog reloaded: {} entries, fingerprint {}",
            catalog.len(),
            &catalog.fingerprint()[..12]
        );
        *guard = Arc::clone(&catalog);
        Ok(catalog)
    }
}

/// Configured pipeline plus the session's catalog
pub struct Session {
    config: EngineConfig,
    pipeline: PictogramPipeline,
    catalogs: CatalogStore,
}

impl Session {
    /// Build the pipeline and load the catalog named by `config`
    #[instrument(skip(config), fields(scorer = %config.scorer))]
    pub fn open(config: EngineConfig) -> Result<Self, MatcherError> {
        let pipeline = PictogramPipeline::from_config(&config)?;
        let catalog = load_configured_catalog(&config)?;
        pipeline.prepare(&catalog)?;
        info!("Session ready with {} catalog entries", catalog.len());
        Ok(Self {
            config,
            pipeline,
            catalogs: CatalogStore::new(catalog),
        })
    }

    pub fn with_parts(
        config: EngineConfig,
        pipeline: PictogramPipeline,
        catalog: Arc<Catalog>,
    ) -> Self {
        Self {
            config,
            pipeline,
            catalogs: CatalogStore::new(catalog),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &PictogramPipeline {
        &self.pipeline
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalogs.snapshot()
    }

    /// Process with the configured mode and `top_k`
    pub fn process(&self, text: &str) -> Result<Vec<UnitMatches>, MatcherError> {
        self.process_with(text, self.config.mode, self.config.top_k)
    }

    pub fn process_with(
        &self,
        text: &str,
        mode: GranularityMode,
        top_k: usize,
    ) -> Result<Vec<UnitMatches>, MatcherError> {
        let catalog = self.catalogs.snapshot();
        self.pipeline.process(text, mode, top_k, &catalog)
    }

    /// Reload from `path` and warm the scorer for the new snapshot.
    ///
    /// The new catalog is installed only once both steps succeed; on any
    /// error the session keeps serving the previous snapshot.
    pub fn reload_catalog(&self, path: &Path) -> Result<Arc<Catalog>, MatcherError> {
        self.catalogs.reload_with(|| {
            let catalog = Catalog::load(path)?;
            self.pipeline.prepare(&catalog)?;
            Ok(catalog)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picto_semantic_matcher::{LexicalScorer, PictogramEntry, ScorerKind, SimilarityScorer};
    use tempfile::tempdir;

    /// Scores like the lexical scorer but cannot warm up for 寝る
    struct NoSleepScorer(LexicalScorer);

    impl SimilarityScorer for NoSleepScorer {
        fn kind(&self) -> ScorerKind {
            self.0.kind()
        }
        fn threshold(&self) -> f32 {
            self.0.threshold()
        }
        fn score_entries(&self, query: &str, catalog: &Catalog) -> Result<Vec<f32>, MatcherError> {
            self.0.score_entries(query, catalog)
        }
        fn prepare(&self, catalog: &Catalog) -> Result<(), MatcherError> {
            if catalog.get("寝る").is_some() {
                return Err(MatcherError::ResourceUnavailable("backend offline".into()));
            }
            Ok(())
        }
    }

    fn small_catalog(label: &str) -> Catalog {
        Catalog::new(vec![PictogramEntry::new(label, [label], None)]).unwrap()
    }

    #[test]
    fn test_load_catalog_is_idempotent() {
        let a = load_catalog().unwrap();
        let b = load_catalog().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 7);
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let store = CatalogStore::new(Arc::new(small_catalog("待つ")));
        let before = store.snapshot();
        let old = store.replace(Arc::new(small_catalog("病院")));

        assert!(Arc::ptr_eq(&before, &old));
        assert!(before.get("待つ").is_some());
        assert!(store.snapshot().get("病院").is_some());
    }

    #[test]
    fn test_failed_reload_keeps_current() {
        let store = CatalogStore::new(Arc::new(small_catalog("待つ")));
        let err = store
            .reload_with(|| Err(MatcherError::InvalidCatalog("broken".into())))
            .unwrap_err();
        assert!(matches!(err, MatcherError::InvalidCatalog(_)));
        assert!(store.snapshot().get("待つ").is_some());
    }

    #[test]
    fn test_reload_installs_new_snapshot() {
        let store = CatalogStore::new(Arc::new(small_catalog("待つ")));
        let loaded = store.reload_with(|| Ok(small_catalog("薬"))).unwrap();
        assert!(Arc::ptr_eq(&loaded, &store.snapshot()));
    }

    #[test]
    fn test_session_uses_config_defaults() {
        let session = Session::with_parts(
            EngineConfig::default(),
            PictogramPipeline::new(Arc::new(LexicalScorer::default())),
            load_catalog().unwrap(),
        );
        let out = session.process("お茶をのみましょう").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].matches.len(), 2);
    }

    #[test]
    fn test_reload_failing_prepare_keeps_previous_catalog() {
        let session = Session::with_parts(
            EngineConfig::default(),
            PictogramPipeline::new(Arc::new(NoSleepScorer(LexicalScorer::default()))),
            load_catalog().unwrap(),
        );
        let dir = tempdir().unwrap();

        let sleep = dir.path().join("sleep.json");
        small_catalog("寝る").save(&sleep).unwrap();
        let err = session.reload_catalog(&sleep).unwrap_err();
        assert!(matches!(err, MatcherError::ResourceUnavailable(_)));
        assert_eq!(session.catalog().len(), 7);
        assert!(session.catalog().get("寝る").is_none());

        let wait = dir.path().join("wait.json");
        small_catalog("待つ").save(&wait).unwrap();
        let loaded = session.reload_catalog(&wait).unwrap();
        assert!(Arc::ptr_eq(&loaded, &session.catalog()));
        assert!(session.catalog().get("待つ").is_some());
    }
}
