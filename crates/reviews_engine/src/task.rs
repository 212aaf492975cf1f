use std::sync::Arc;

use engine_logging::{engine_debug, engine_warn};
use tokio_util::sync::CancellationToken;

use crate::loader::Shared;
use crate::{DecodedImage, ResourceKey};

/// One fetch of one key: download, decode, hand the result to every waiter.
pub(crate) struct LoadTask {
    key: ResourceKey,
    fetch_id: u64,
    token: CancellationToken,
    shared: Arc<Shared>,
}

impl LoadTask {
    pub(crate) fn new(
        key: ResourceKey,
        fetch_id: u64,
        token: CancellationToken,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            key,
            fetch_id,
            token,
            shared,
        }
    }

    pub(crate) async fn run(self) {
        let image = self.fetch().await;
        self.resolve(image);
    }

    async fn fetch(&self) -> Option<Arc<DecodedImage>> {
        let permits = Arc::clone(&self.shared.permits);
        let _permit = tokio::select! {
            biased;
            _ = self.token.cancelled() => return None,
            permit = permits.acquire_owned() => permit.ok()?,
        };

        let bytes = tokio::select! {
            biased;
            _ = self.token.cancelled() => return None,
            result = self.shared.transport.fetch(self.key.url()) => match result {
                Ok(bytes) => bytes,
                Err(err) => {
                    engine_warn!("Image fetch {} failed: {}", self.key, err);
                    return None;
                }
            },
        };

        let decoder = Arc::clone(&self.shared.decoder);
        let decoded = tokio::task::spawn_blocking(move || decoder.decode(&bytes))
            .await
            .ok()
            .flatten();
        match decoded {
            Some(image) if !self.token.is_cancelled() => Some(Arc::new(image)),
            Some(_) => None,
            None => {
                engine_warn!("Image {} could not be decoded", self.key);
                None
            }
        }
    }

    /// Retires this fetch and notifies its callbacks outside the lock.
    fn resolve(self, image: Option<Arc<DecodedImage>>) {
        let callbacks = {
            let mut in_flight = self.shared.lock_in_flight();
            let ours = in_flight
                .get(&self.key)
                .is_some_and(|fetch| fetch.fetch_id == self.fetch_id);
            if !ours {
                // Cancelled: the entry and its callbacks are already gone.
                engine_debug!("Fetch {} for {} finished after cancel", self.fetch_id, self.key);
                return;
            }
            if let Some(image) = &image {
                self.shared.cache.put(self.key.clone(), Arc::clone(image));
            }
            in_flight
                .remove(&self.key)
                .map(|fetch| fetch.callbacks)
                .unwrap_or_default()
        };

        engine_debug!(
            "Fetch {} for {} resolved (ok={}, callbacks={})",
            self.fetch_id,
            self.key,
            image.is_some(),
            callbacks.len()
        );
        for callback in callbacks {
            callback(image.clone());
        }
    }
}
