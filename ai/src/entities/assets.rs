// survival_ai_core/ai/src/entities/assets.rs
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::error::AssetError;

pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = Result<ModelHandle, AssetError>> + Send + 'a>>;

/// Opaque reference to a loaded model. Whoever loaded it must hand it back
/// through [`AssetLoader::release`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelHandle {
    pub id: u64,
    pub key: String,
}

pub trait AssetLoader: Send + Sync {
    fn load_model<'a>(&'a self, key: &'a str) -> LoadFuture<'a>;
    fn release(&self, model: ModelHandle);
}

/// Loader over a fixed set of known model keys. Tracks live handles so
/// callers can check nothing leaked.
pub struct MemoryAssetLoader {
    known: DashMap<String, ()>,
    live: DashMap<u64, String>,
    next_id: AtomicU64,
    latency: Duration,
    failing: AtomicBool,
}

impl MemoryAssetLoader {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let known = DashMap::new();
        for key in keys {
            known.insert(key.into(), ());
        }
        MemoryAssetLoader {
            known,
            live: DashMap::new(),
            next_id: AtomicU64::new(1),
            latency: Duration::ZERO,
            failing: AtomicBool::new(false),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl AssetLoader for MemoryAssetLoader {
    fn load_model<'a>(&'a self, key: &'a str) -> LoadFuture<'a> {
        Box::pin(async move {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if self.failing.load(Ordering::Relaxed) {
                return Err(AssetError::LoadFailed(key.to_string()));
            }
            if !self.known.contains_key(key) {
                return Err(AssetError::NotFound(key.to_string()));
            }
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            self.live.insert(id, key.to_string());
            debug!("Loaded model {} as #{}", key, id);
            Ok(ModelHandle { id, key: key.to_string() })
        })
    }

    fn release(&self, model: ModelHandle) {
        if self.live.remove(&model.id).is_none() {
            warn!("Released unknown model #{} ({})", model.id, model.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_and_release_tracks_live_models() {
        let loader = MemoryAssetLoader::new(["models/stalker.glb"]);
        let model = loader.load_model("models/stalker.glb").await.unwrap();
        assert_eq!(loader.live_count(), 1);
        loader.release(model);
        assert_eq!(loader.live_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_key_is_not_found() {
        let loader = MemoryAssetLoader::new(Vec::<String>::new());
        let err = loader.load_model("models/missing.glb").await.unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failing_switch() {
        let loader = MemoryAssetLoader::new(["a"]);
        loader.set_failing(true);
        assert!(matches!(loader.load_model("a").await, Err(AssetError::LoadFailed(_))));
    }
}
