//! Owns the reviews state on one thread and runs the effects `update` asks for.

use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use engine_logging::{engine_debug, engine_info, engine_warn};
use reviews_core::{update, Effect, Msg, PageFetchError, PageRequest, ReviewsState, ViewState};
use reviews_engine::{ImageLoader, ReviewsProvider};
use tokio::runtime::Handle;

/// Receives every published state. Called on the session thread.
pub trait StateSubscriber: Send {
    fn on_state_change(&self, state: ViewState);
}

impl<F> StateSubscriber for F
where
    F: Fn(ViewState) + Send,
{
    fn on_state_change(&self, state: ViewState) {
        self(state)
    }
}

enum SessionCommand {
    Dispatch(Msg),
    Shutdown,
}

/// Handle to a running reviews session.
pub struct ReviewsSession {
    cmd_tx: mpsc::Sender<SessionCommand>,
    worker: Option<JoinHandle<()>>,
    images: ImageLoader,
}

impl ReviewsSession {
    pub fn spawn(
        state: ReviewsState,
        provider: Arc<dyn ReviewsProvider>,
        images: ImageLoader,
        runtime: Handle,
        subscriber: Box<dyn StateSubscriber>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let runner = EffectRunner {
            provider,
            images: images.clone(),
            runtime,
            cmd_tx: cmd_tx.clone(),
            subscriber,
        };

        let worker = thread::spawn(move || runner.run(state, cmd_rx));

        Self {
            cmd_tx,
            worker: Some(worker),
            images,
        }
    }

    pub fn send(&self, msg: Msg) {
        if let Err(mpsc::SendError(command)) = self.cmd_tx.send(SessionCommand::Dispatch(msg)) {
            if let SessionCommand::Dispatch(msg) = command {
                engine_warn!("Reviews session is gone; dropping {:?}", msg);
            }
        }
    }

    pub fn images(&self) -> &ImageLoader {
        &self.images
    }

    /// Stops the session thread. Page responses still in flight are discarded.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.cmd_tx.send(SessionCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                engine_warn!("Reviews session thread panicked");
            }
        }
    }
}

impl Drop for ReviewsSession {
    fn drop(&mut self) {
        self.stop();
    }
}

struct EffectRunner {
    provider: Arc<dyn ReviewsProvider>,
    images: ImageLoader,
    runtime: Handle,
    cmd_tx: mpsc::Sender<SessionCommand>,
    subscriber: Box<dyn StateSubscriber>,
}

impl EffectRunner {
    fn run(self, mut state: ReviewsState, cmd_rx: mpsc::Receiver<SessionCommand>) {
        engine_info!("Reviews session started (limit={})", state.limit());
        while let Ok(command) = cmd_rx.recv() {
            let msg = match command {
                SessionCommand::Dispatch(msg) => msg,
                SessionCommand::Shutdown => break,
            };
            let (next, effects) = update(state, msg);
            state = next;
            for effect in effects {
                self.apply(&state, effect);
            }
        }
        engine_info!("Reviews session stopped");
    }

    fn apply(&self, state: &ReviewsState, effect: Effect) {
        match effect {
            Effect::Publish => self.subscriber.on_state_change(state.view()),
            Effect::FetchPage(request) => self.fetch_page(request),
            Effect::WarmImages { urls } => {
                engine_debug!("Warming {} images", urls.len());
                for url in &urls {
                    self.images.warm(url);
                }
            }
            Effect::CancelImages { urls } => {
                for url in &urls {
                    self.images.cancel(url);
                }
            }
        }
    }

    fn fetch_page(&self, request: PageRequest) {
        engine_info!(
            "FetchPage seq={} offset={} limit={}",
            request.seq,
            request.offset,
            request.limit
        );
        let provider = Arc::clone(&self.provider);
        let cmd_tx = self.cmd_tx.clone();
        self.runtime.spawn(async move {
            let result = provider
                .get_page(request.offset, request.limit)
                .await
                .map_err(|err| PageFetchError::Transport(err.to_string()));
            let _ = cmd_tx.send(SessionCommand::Dispatch(Msg::PageLoaded { request, result }));
        });
    }
}
