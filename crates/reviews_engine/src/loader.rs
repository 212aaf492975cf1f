use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use engine_logging::{engine_debug, engine_trace};
use tokio::runtime::Handle;
use tokio::sync::{oneshot, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::task::LoadTask;
use crate::{DecodedImage, ImageCache, ImageDecoder, ResourceKey, Transport};

/// Callback handed the outcome of one image request.
pub type Completion = Box<dyn FnOnce(Option<Arc<DecodedImage>>) + Send + 'static>;

#[derive(Debug, Clone)]
pub struct LoaderSettings {
    /// Upper bound on simultaneous network fetches, clamped to
    /// `1..=Semaphore::MAX_PERMITS`.
    pub max_concurrent_fetches: usize,
    /// Pixel-byte budget for the cache; `None` leaves it unbounded.
    pub cache_max_cost: Option<usize>,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 10,
            cache_max_cost: None,
        }
    }
}

/// The one live fetch for a key.
pub(crate) struct InFlight {
    pub(crate) fetch_id: u64,
    pub(crate) token: CancellationToken,
    /// Notified in insertion order.
    pub(crate) callbacks: Vec<Completion>,
}

/// State shared between the loader handle and its running tasks.
pub(crate) struct Shared {
    pub(crate) cache: ImageCache,
    in_flight: Mutex<HashMap<ResourceKey, InFlight>>,
    next_fetch_id: AtomicU64,
    pub(crate) permits: Arc<Semaphore>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) decoder: Arc<dyn ImageDecoder>,
}

impl Shared {
    /// Guards the live-fetch map. Cache writes on resolution happen under it too,
    /// so lookup-then-attach in `request` cannot miss a resolving fetch.
    pub(crate) fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<ResourceKey, InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Deduplicating, cancellable image loader backed by an in-memory cache.
///
/// At most one fetch per [`ResourceKey`] is ever live; further requests for
/// the same key attach to it and are answered together. Cheap to clone.
#[derive(Clone)]
pub struct ImageLoader {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl ImageLoader {
    /// Spawns fetch tasks on `runtime`.
    pub fn new(
        transport: Arc<dyn Transport>,
        decoder: Arc<dyn ImageDecoder>,
        settings: LoaderSettings,
        runtime: Handle,
    ) -> Self {
        let cache = match settings.cache_max_cost {
            Some(max) => ImageCache::with_max_cost(max),
            None => ImageCache::new(),
        };
        let shared = Shared {
            cache,
            in_flight: Mutex::new(HashMap::new()),
            next_fetch_id: AtomicU64::new(1),
            permits: Arc::new(Semaphore::new(
                settings
                    .max_concurrent_fetches
                    .clamp(1, Semaphore::MAX_PERMITS),
            )),
            transport,
            decoder,
        };
        Self {
            shared: Arc::new(shared),
            runtime,
        }
    }

    /// Requests the image at `url`.
    ///
    /// Invalid URLs and cache hits call `on_complete` before returning. Otherwise
    /// it runs on a runtime thread once the shared fetch resolves, or never if
    /// the key is cancelled first.
    pub fn request<F>(&self, url: &str, on_complete: F)
    where
        F: FnOnce(Option<Arc<DecodedImage>>) + Send + 'static,
    {
        let Some(key) = ResourceKey::parse(url) else {
            engine_debug!("Rejecting invalid image url {:?}", url);
            on_complete(None);
            return;
        };

        let mut in_flight = self.shared.lock_in_flight();
        if let Some(image) = self.shared.cache.get(&key) {
            drop(in_flight);
            engine_trace!("Image cache hit {}", key);
            on_complete(Some(image));
            return;
        }

        if let Some(fetch) = in_flight.get_mut(&key) {
            fetch.callbacks.push(Box::new(on_complete));
            engine_trace!("Joined fetch {} for {}", fetch.fetch_id, key);
            return;
        }

        let fetch_id = self.shared.next_fetch_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        in_flight.insert(
            key.clone(),
            InFlight {
                fetch_id,
                token: token.clone(),
                callbacks: vec![Box::new(on_complete)],
            },
        );
        drop(in_flight);

        engine_debug!("Starting fetch {} for {}", fetch_id, key);
        let task = LoadTask::new(key, fetch_id, token, Arc::clone(&self.shared));
        self.runtime.spawn(task.run());
    }

    /// Starts (or joins) a fetch only to fill the cache.
    pub fn warm(&self, url: &str) {
        self.request(url, |_| {});
    }

    /// Async form of [`ImageLoader::request`]. Resolves to `None` on any
    /// failure, including cancellation of the underlying fetch.
    pub async fn load(&self, url: &str) -> Option<Arc<DecodedImage>> {
        let (tx, rx) = oneshot::channel();
        self.request(url, move |image| {
            let _ = tx.send(image);
        });
        rx.await.ok().flatten()
    }

    /// Cancels the live fetch for `url`, if any.
    ///
    /// Callbacks already attached to it are dropped without being called.
    pub fn cancel(&self, url: &str) {
        let Some(key) = ResourceKey::parse(url) else {
            return;
        };
        let removed = self.shared.lock_in_flight().remove(&key);
        if let Some(fetch) = removed {
            fetch.token.cancel();
            engine_debug!(
                "Cancelled fetch {} for {} ({} waiting callbacks dropped)",
                fetch.fetch_id,
                key,
                fetch.callbacks.len()
            );
        }
    }

    pub fn cache(&self) -> &ImageCache {
        &self.shared.cache
    }

    /// Number of keys with a live fetch.
    pub fn in_flight_count(&self) -> usize {
        self.shared.lock_in_flight().len()
    }
}
