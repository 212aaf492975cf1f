//! Stands in for the list view: measures rows, prefetches what comes into
//! range and keeps scrolling to the bottom until every page is in.

use std::sync::mpsc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use reviews_core::{DisplayItem, FixedWidthMetrics, Msg, ViewState};

use crate::config::Viewport;
use crate::session::ReviewsSession;

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollOutcome {
    pub last_state: Option<ViewState>,
    pub page_requests: usize,
    pub complete: bool,
}

pub struct HeadlessFeed<'a> {
    session: &'a ReviewsSession,
    states: &'a mpsc::Receiver<ViewState>,
    viewport: Viewport,
    metrics: FixedWidthMetrics,
    idle_timeout: Duration,
    max_pages: usize,
}

impl<'a> HeadlessFeed<'a> {
    pub fn new(
        session: &'a ReviewsSession,
        states: &'a mpsc::Receiver<ViewState>,
        viewport: Viewport,
        idle_timeout: Duration,
        max_pages: usize,
    ) -> Self {
        Self {
            session,
            states,
            viewport,
            metrics: FixedWidthMetrics::default(),
            idle_timeout,
            max_pages,
        }
    }

    pub fn content_height(&self, state: &ViewState) -> f64 {
        state
            .items
            .iter()
            .map(|item| item.height(self.viewport.width, &self.metrics))
            .sum()
    }

    /// Loads from the top and keeps "flinging" to the bottom after each page.
    pub fn scroll_to_end(&self) -> ScrollOutcome {
        let mut outcome = ScrollOutcome {
            last_state: None,
            page_requests: 1,
            complete: false,
        };
        let mut prefetched = 0;
        self.session.send(Msg::Reload);

        loop {
            let state = match self.states.recv_timeout(self.idle_timeout) {
                Ok(state) => state,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    engine_warn!("No state change for {:?}; giving up", self.idle_timeout);
                    break;
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            };

            let fresh: Vec<usize> = (prefetched..state.items.len())
                .filter(|&index| matches!(state.items[index], DisplayItem::Review(_)))
                .collect();
            if !fresh.is_empty() {
                prefetched = fresh[fresh.len() - 1] + 1;
                self.session.send(Msg::PrefetchRows(fresh));
            }

            if state.footer().is_some() {
                outcome.complete = true;
                outcome.last_state = Some(state);
                break;
            }

            if state.should_load && !state.has_loader() {
                if outcome.page_requests >= self.max_pages {
                    engine_warn!("Stopping after {} page requests", outcome.page_requests);
                    outcome.last_state = Some(state);
                    break;
                }
                let content_height = self.content_height(&state);
                let target_offset = (content_height - self.viewport.height).max(0.0);
                engine_debug!(
                    "Scrolling to {} of {} px ({} rows)",
                    target_offset,
                    content_height,
                    state.items.len()
                );
                outcome.page_requests += 1;
                self.session.send(Msg::ScrollWillEnd {
                    viewport_height: self.viewport.height,
                    content_height,
                    target_offset,
                });
            }
            outcome.last_state = Some(state);
        }

        engine_info!(
            "Scroll finished: complete={} page_requests={}",
            outcome.complete,
            outcome.page_requests
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use reviews_core::ReviewsState;

    use super::*;
    use crate::session::tests::{fake_loader, FakeProvider};

    #[test]
    fn scrolls_through_every_page() {
        engine_logging::initialize_for_tests();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let provider = FakeProvider::new(12);
        let (state_tx, state_rx) = mpsc::channel();
        let session = ReviewsSession::spawn(
            ReviewsState::new(),
            provider.clone(),
            fake_loader(&runtime),
            runtime.handle().clone(),
            Box::new(move |state: ViewState| {
                let _ = state_tx.send(state);
            }),
        );

        let feed = HeadlessFeed::new(
            &session,
            &state_rx,
            Viewport::default(),
            Duration::from_secs(5),
            10,
        );
        let outcome = feed.scroll_to_end();

        assert!(outcome.complete);
        let last = outcome.last_state.expect("state");
        assert_eq!(last.review_count(), 12);
        assert_eq!(last.items.len(), 13);
        assert_eq!(last.offset, 12);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.page_requests, 3);
    }
}
