//! One-time mapping library bootstrap.
//!
//! The mapping library (script + stylesheet) must be injected into the host
//! page exactly once per process, no matter how many map views mount or how
//! close together they mount. [`MapLibraryLoader`] guards the injection with a
//! `tokio::sync::OnceCell`: concurrent callers await the same load, and a
//! completed load short-circuits every later call.
//!
//! A failed load is not cached. The stylesheet is never injected twice, but
//! the script load is retried on the next `ensure_loaded` call (typically a
//! manual refresh).

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::error::MapError;
use crate::api::BoxFuture;

/// A CDN resource pinned by a subresource-integrity hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapAsset {
    pub url: &'static str,
    pub integrity: &'static str,
}

/// Leaflet 1.9.4 stylesheet.
pub const LEAFLET_STYLESHEET: MapAsset = MapAsset {
    url: "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css",
    integrity: "sha256-p4NxAoJBhIIN+hmNHrzRCf9tD/miZyoHS5obTRR9BMY=",
};

/// Leaflet 1.9.4 script.
pub const LEAFLET_SCRIPT: MapAsset = MapAsset {
    url: "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js",
    integrity: "sha256-20nQCchB9co0qIjJZRGuk2/Z9VM+kNiyxNV1lvTlZBo=",
};

/// The page or runtime the library is loaded into.
pub trait MapAssetHost: Send + Sync {
    /// Whether the library global is already available.
    fn library_present(&self) -> bool;

    /// Add the stylesheet to the host. Fire-and-forget.
    fn inject_stylesheet(&self, asset: &MapAsset);

    /// Add the script and resolve once it has executed.
    fn load_script(&self, asset: &MapAsset) -> BoxFuture<'_, Result<(), MapError>>;
}

static GLOBAL_LOADER: OnceLock<Arc<MapLibraryLoader>> = OnceLock::new();

/// Init-once loader for the mapping library.
pub struct MapLibraryLoader {
    host: Arc<dyn MapAssetHost>,
    stylesheet: MapAsset,
    script: MapAsset,
    loaded: OnceCell<()>,
    stylesheet_injected: AtomicBool,
    script_attempts: AtomicU32,
}

impl MapLibraryLoader {
    /// Create a loader for the pinned Leaflet assets.
    pub fn new(host: Arc<dyn MapAssetHost>) -> Self {
        Self::with_assets(host, LEAFLET_STYLESHEET, LEAFLET_SCRIPT)
    }

    pub fn with_assets(host: Arc<dyn MapAssetHost>, stylesheet: MapAsset, script: MapAsset) -> Self {
        Self {
            host,
            stylesheet,
            script,
            loaded: OnceCell::new(),
            stylesheet_injected: AtomicBool::new(false),
            script_attempts: AtomicU32::new(0),
        }
    }

    /// Install the process-wide loader.
    ///
    /// The first call wins; later calls return the existing loader and ignore
    /// their `host` argument.
    pub fn install_global(host: Arc<dyn MapAssetHost>) -> Arc<MapLibraryLoader> {
        Arc::clone(GLOBAL_LOADER.get_or_init(|| Arc::new(Self::new(host))))
    }

    /// The process-wide loader, if one was installed.
    pub fn global() -> Option<Arc<MapLibraryLoader>> {
        GLOBAL_LOADER.get().cloned()
    }

    /// Whether the library has finished loading.
    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    /// Number of script injections attempted so far.
    pub fn script_attempts(&self) -> u32 {
        self.script_attempts.load(Ordering::Relaxed)
    }

    /// Ensure the mapping library is available.
    ///
    /// Resolves immediately once loaded. Otherwise the first caller injects
    /// the assets and every concurrent caller waits on the same result.
    pub async fn ensure_loaded(&self) -> Result<(), MapError> {
        if self.loaded.initialized() {
            return Ok(());
        }

        self.loaded
            .get_or_try_init(|| async {
                if self.host.library_present() {
                    debug!("Map library already present in host");
                    return Ok(());
                }

                if !self.stylesheet_injected.swap(true, Ordering::SeqCst) {
                    debug!(url = self.stylesheet.url, "Injecting map stylesheet");
                    self.host.inject_stylesheet(&self.stylesheet);
                }

                let attempt = self.script_attempts.fetch_add(1, Ordering::SeqCst) + 1;
                info!(url = self.script.url, attempt, "Loading map library");
                match self.host.load_script(&self.script).await {
                    Ok(()) => {
                        info!("Map library loaded");
                        Ok(())
                    }
                    Err(e) => {
                        warn!(error = %e, attempt, "Map library load failed");
                        Err(e)
                    }
                }
            })
            .await
            .map(|_| ())
    }
}

impl std::fmt::Debug for MapLibraryLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapLibraryLoader")
            .field("script", &self.script.url)
            .field("loaded", &self.is_loaded())
            .field("script_attempts", &self.script_attempts())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Host that counts injections and can be told to fail.
    #[derive(Default)]
    struct CountingHost {
        present: AtomicBool,
        stylesheets: AtomicU32,
        scripts: AtomicU32,
        fail_next: AtomicBool,
    }

    impl MapAssetHost for CountingHost {
        fn library_present(&self) -> bool {
            self.present.load(Ordering::SeqCst)
        }

        fn inject_stylesheet(&self, _asset: &MapAsset) {
            self.stylesheets.fetch_add(1, Ordering::SeqCst);
        }

        fn load_script(&self, _asset: &MapAsset) -> BoxFuture<'_, Result<(), MapError>> {
            Box::pin(async move {
                self.scripts.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                if self.fail_next.swap(false, Ordering::SeqCst) {
                    return Err(MapError::LibraryLoad("network error".to_string()));
                }
                self.present.store(true, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_loads_once_across_calls() {
        let host = Arc::new(CountingHost::default());
        let loader = MapLibraryLoader::new(host.clone());

        loader.ensure_loaded().await.unwrap();
        loader.ensure_loaded().await.unwrap();

        assert!(loader.is_loaded());
        assert_eq!(host.stylesheets.load(Ordering::SeqCst), 1);
        assert_eq!(host.scripts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_injection() {
        let host = Arc::new(CountingHost::default());
        let loader = Arc::new(MapLibraryLoader::new(host.clone()));

        let a = Arc::clone(&loader);
        let b = Arc::clone(&loader);
        let (ra, rb) = tokio::join!(a.ensure_loaded(), b.ensure_loaded());

        assert!(ra.is_ok() && rb.is_ok());
        assert_eq!(host.scripts.load(Ordering::SeqCst), 1);
        assert_eq!(host.stylesheets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_present_library_skips_injection() {
        let host = Arc::new(CountingHost::default());
        host.present.store(true, Ordering::SeqCst);
        let loader = MapLibraryLoader::new(host.clone());

        loader.ensure_loaded().await.unwrap();

        assert_eq!(host.scripts.load(Ordering::SeqCst), 0);
        assert_eq!(host.stylesheets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_load_can_be_retried() {
        let host = Arc::new(CountingHost::default());
        host.fail_next.store(true, Ordering::SeqCst);
        let loader = MapLibraryLoader::new(host.clone());

        let first = loader.ensure_loaded().await;
        assert!(matches!(first, Err(MapError::LibraryLoad(_))));
        assert!(!loader.is_loaded());

        loader.ensure_loaded().await.unwrap();
        assert!(loader.is_loaded());
        assert_eq!(loader.script_attempts(), 2);
        // Stylesheet is never injected twice
        assert_eq!(host.stylesheets.load(Ordering::SeqCst), 1);
    }
}
