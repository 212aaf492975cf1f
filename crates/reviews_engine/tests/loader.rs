use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use reviews_engine::{
    DecodedImage, FailureKind, FetchError, ImageDecoder, ImageLoader, LoaderSettings, Transport,
};
use tokio::sync::{mpsc, Semaphore};
use tokio::time::timeout;
use url::Url;

const AVATAR: &str = "https://cdn.example.com/avatar/1.jpg";

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

/// Serves the URL path as the body once the gate is opened.
/// Paths containing "broken" fail; "corrupt" returns bytes the decoder rejects.
struct GatedTransport {
    gate: Semaphore,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl GatedTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        })
    }

    fn open(&self) {
        self.gate.add_permits(1024);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Transport for GatedTransport {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        let permit = self.gate.acquire().await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        drop(permit);

        if url.path().contains("broken") {
            return Err(FetchError::new(FailureKind::HttpStatus(404), "404 Not Found"));
        }
        if url.path().contains("corrupt") {
            return Ok(b"corrupt".to_vec());
        }
        Ok(url.path().as_bytes().to_vec())
    }
}

struct BytesDecoder;

impl ImageDecoder for BytesDecoder {
    fn decode(&self, bytes: &[u8]) -> Option<DecodedImage> {
        if bytes == b"corrupt" {
            return None;
        }
        Some(DecodedImage::new(bytes.len() as u32, 1, bytes.to_vec()))
    }
}

fn loader_with(transport: Arc<GatedTransport>, max_concurrent_fetches: usize) -> ImageLoader {
    init_logging();
    ImageLoader::new(
        transport,
        Arc::new(BytesDecoder),
        LoaderSettings {
            max_concurrent_fetches,
            cache_max_cost: None,
        },
        tokio::runtime::Handle::current(),
    )
}

async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("callback in time")
        .expect("channel open")
}

#[tokio::test]
async fn concurrent_requests_share_one_fetch_and_keep_order() {
    let transport = GatedTransport::new();
    let loader = loader_with(transport.clone(), 10);
    let (tx, mut rx) = mpsc::unbounded_channel();

    for caller in 0..5 {
        let tx = tx.clone();
        loader.request(AVATAR, move |image| {
            let _ = tx.send((caller, image));
        });
    }
    assert_eq!(loader.in_flight_count(), 1);

    transport.open();
    let mut seen = Vec::new();
    for _ in 0..5 {
        seen.push(recv(&mut rx).await);
    }

    assert_eq!(transport.calls(), 1);
    let order: Vec<_> = seen.iter().map(|(caller, _)| *caller).collect();
    assert_eq!(order, vec![0, 1, 2, 3, 4]);
    let first = seen[0].1.clone().expect("image");
    for (_, image) in &seen {
        assert!(Arc::ptr_eq(image.as_ref().expect("image"), &first));
    }
    assert_eq!(loader.in_flight_count(), 0);
}

#[tokio::test]
async fn equivalent_urls_are_deduplicated() {
    let transport = GatedTransport::new();
    let loader = loader_with(transport.clone(), 10);

    loader.warm("https://CDN.example.com/avatar/1.jpg");
    loader.warm(AVATAR);
    assert_eq!(loader.in_flight_count(), 1);

    transport.open();
    assert!(loader.load(AVATAR).await.is_some());
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn cache_hit_answers_synchronously() {
    let transport = GatedTransport::new();
    transport.open();
    let loader = loader_with(transport.clone(), 10);

    let first = loader.load(AVATAR).await.expect("image");
    assert_eq!(first.pixels, b"/avatar/1.jpg");

    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    loader.request(AVATAR, move |image| {
        *sink.lock().unwrap() = Some(image);
    });

    let hit = slot.lock().unwrap().take().expect("called before returning");
    assert!(Arc::ptr_eq(&hit.expect("image"), &first));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn invalid_url_resolves_immediately_with_none() {
    let transport = GatedTransport::new();
    let loader = loader_with(transport.clone(), 10);

    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    loader.request("not a url", move |image| {
        *sink.lock().unwrap() = Some(image.is_none());
    });

    assert_eq!(*slot.lock().unwrap(), Some(true));
    assert_eq!(loader.in_flight_count(), 0);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn cancel_drops_waiting_callbacks() {
    let transport = GatedTransport::new();
    let loader = loader_with(transport.clone(), 10);
    let called = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let called = Arc::clone(&called);
        loader.request(AVATAR, move |_| {
            called.fetch_add(1, Ordering::SeqCst);
        });
    }
    loader.cancel(AVATAR);
    assert_eq!(loader.in_flight_count(), 0);

    transport.open();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(called.load(Ordering::SeqCst), 0);
    assert!(loader.cache().is_empty());
}

#[tokio::test]
async fn cancelled_load_future_resolves_to_none() {
    let transport = GatedTransport::new();
    let loader = loader_with(transport.clone(), 10);

    let waiter = {
        let loader = loader.clone();
        tokio::spawn(async move { loader.load(AVATAR).await })
    };
    while loader.in_flight_count() == 0 {
        tokio::task::yield_now().await;
    }
    loader.cancel(AVATAR);

    let result = timeout(Duration::from_secs(5), waiter)
        .await
        .expect("in time")
        .expect("join");
    assert!(result.is_none());
}

#[tokio::test]
async fn request_after_cancel_starts_a_new_fetch() {
    let transport = GatedTransport::new();
    let loader = loader_with(transport.clone(), 10);

    loader.warm(AVATAR);
    loader.cancel(AVATAR);

    let (tx, mut rx) = mpsc::unbounded_channel();
    loader.request(AVATAR, move |image| {
        let _ = tx.send(image);
    });
    assert_eq!(loader.in_flight_count(), 1);

    transport.open();
    assert!(recv(&mut rx).await.is_some());
    assert_eq!(transport.calls(), 1);
    assert_eq!(loader.in_flight_count(), 0);
}

#[tokio::test]
async fn cancel_of_unknown_or_invalid_key_is_harmless() {
    let transport = GatedTransport::new();
    let loader = loader_with(transport.clone(), 10);
    loader.cancel(AVATAR);
    loader.cancel("::::");
    assert_eq!(loader.in_flight_count(), 0);
}

#[tokio::test]
async fn transport_failure_resolves_none_and_is_not_cached() {
    let transport = GatedTransport::new();
    transport.open();
    let loader = loader_with(transport.clone(), 10);
    let url = "https://cdn.example.com/broken.jpg";

    assert!(loader.load(url).await.is_none());
    assert!(loader.cache().is_empty());

    assert!(loader.load(url).await.is_none());
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn undecodable_payload_resolves_none() {
    let transport = GatedTransport::new();
    transport.open();
    let loader = loader_with(transport.clone(), 10);

    assert!(loader.load("https://cdn.example.com/corrupt.jpg").await.is_none());
    assert!(loader.cache().is_empty());
    assert_eq!(loader.in_flight_count(), 0);
}

#[tokio::test]
async fn concurrent_fetches_are_capped() {
    let transport = GatedTransport::new();
    let loader = loader_with(transport.clone(), 2);

    let mut waiters = Vec::new();
    for i in 0..6 {
        let loader = loader.clone();
        waiters.push(tokio::spawn(async move {
            loader
                .load(&format!("https://cdn.example.com/photo/{i}.jpg"))
                .await
        }));
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.calls(), 2);

    transport.open();
    for waiter in waiters {
        let image = timeout(Duration::from_secs(5), waiter)
            .await
            .expect("in time")
            .expect("join");
        assert!(image.is_some());
    }
    assert_eq!(transport.calls(), 6);
    assert_eq!(transport.max_active.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn callback_can_request_again_and_hit_cache() {
    let transport = GatedTransport::new();
    let loader = loader_with(transport.clone(), 10);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let nested = loader.clone();
    loader.request(AVATAR, move |_| {
        nested.request(AVATAR, move |image| {
            let _ = tx.send(image.is_some());
        });
    });

    transport.open();
    assert!(recv(&mut rx).await);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn purged_cache_refetches() {
    let transport = GatedTransport::new();
    transport.open();
    let loader = loader_with(transport.clone(), 10);

    assert!(loader.load(AVATAR).await.is_some());
    loader.cache().purge();
    assert!(loader.load(AVATAR).await.is_some());
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn out_of_range_fetch_limits_are_clamped() {
    let transport = GatedTransport::new();
    transport.open();

    for max_concurrent_fetches in [0, usize::MAX] {
        let loader = loader_with(transport.clone(), max_concurrent_fetches);
        assert!(loader.load(AVATAR).await.is_some());
    }
    assert_eq!(transport.calls(), 2);
}

/// Answers at once, so fetches resolve while other threads keep attaching.
struct InstantTransport;

#[async_trait::async_trait]
impl Transport for InstantTransport {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        tokio::task::yield_now().await;
        Ok(url.path().as_bytes().to_vec())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn callbacks_attached_while_fetches_resolve_all_fire() {
    init_logging();
    const KEYS: usize = 500;
    const CALLERS: usize = 4;

    let loader = ImageLoader::new(
        Arc::new(InstantTransport),
        Arc::new(BytesDecoder),
        LoaderSettings::default(),
        tokio::runtime::Handle::current(),
    );
    let fired = Arc::new(AtomicUsize::new(0));
    let with_image = Arc::new(AtomicUsize::new(0));

    let mut callers = Vec::new();
    for caller in 0..CALLERS {
        let loader = loader.clone();
        let fired = Arc::clone(&fired);
        let with_image = Arc::clone(&with_image);
        callers.push(tokio::spawn(async move {
            for i in 0..KEYS {
                let key = (i + caller * 7) % KEYS;
                let fired = Arc::clone(&fired);
                let with_image = Arc::clone(&with_image);
                loader.request(
                    &format!("https://cdn.example.com/photo/{key}.jpg"),
                    move |image| {
                        if image.is_some() {
                            with_image.fetch_add(1, Ordering::SeqCst);
                        }
                        fired.fetch_add(1, Ordering::SeqCst);
                    },
                );
                if i % 16 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }));
    }
    for caller in callers {
        caller.await.expect("join");
    }

    let expected = KEYS * CALLERS;
    timeout(Duration::from_secs(10), async {
        while fired.load(Ordering::SeqCst) < expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("every callback fired");

    assert_eq!(fired.load(Ordering::SeqCst), expected);
    assert_eq!(with_image.load(Ordering::SeqCst), expected);
    assert_eq!(loader.in_flight_count(), 0);
    assert_eq!(loader.cache().len(), KEYS);
}
