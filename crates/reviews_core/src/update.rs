use engine_logging::{engine_debug, engine_warn};

use crate::{
    Effect, JsonPageDecoder, Msg, PageDecoder, RatingRenderer, ReviewsPage, ReviewsState,
    StarRatingRenderer,
};

/// How many viewport heights before the end of the content a new page is requested.
pub const SCREENS_TO_LOAD_NEXT_PAGE: f64 = 2.5;

/// Decoders and renderers `update` maps raw pages through.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub decoder: &'a dyn PageDecoder,
    pub ratings: &'a dyn RatingRenderer,
}

impl Default for Collaborators<'static> {
    fn default() -> Self {
        Self {
            decoder: &JsonPageDecoder,
            ratings: &StarRatingRenderer,
        }
    }
}

/// Pure update function: applies a message to state and returns any effects.
pub fn update(state: ReviewsState, msg: Msg) -> (ReviewsState, Vec<Effect>) {
    update_with(state, msg, &Collaborators::default())
}

/// `update` with explicit collaborators.
pub fn update_with(
    mut state: ReviewsState,
    msg: Msg,
    collaborators: &Collaborators<'_>,
) -> (ReviewsState, Vec<Effect>) {
    let effects = match msg {
        Msg::LoadNextPage => request_next_page(&mut state),
        Msg::Reload => {
            state.reset();
            request_next_page(&mut state)
        }
        Msg::PageLoaded { request, result } => {
            // Loader goes first, whatever the outcome.
            if !state.finish_page_load(request) {
                engine_debug!(
                    "Ignoring stale page response seq={} offset={}",
                    request.seq,
                    request.offset
                );
                return (state, Vec::new());
            }
            match decode_page(result, collaborators.decoder) {
                Ok(page) => {
                    engine_debug!(
                        "Page offset={} brought {} reviews of {}",
                        request.offset,
                        page.items.len(),
                        page.count
                    );
                    state.apply_page(page, collaborators.ratings);
                }
                Err(message) => {
                    engine_warn!("Page offset={} failed: {}", request.offset, message);
                    state.reopen_gate();
                }
            }
            vec![Effect::Publish]
        }
        Msg::ShowMoreTapped { id } => {
            if state.expand_review(id) {
                vec![Effect::Publish]
            } else {
                Vec::new()
            }
        }
        Msg::PrefetchRows(indices) => {
            let urls = state.image_urls_at(&indices);
            if urls.is_empty() {
                Vec::new()
            } else {
                vec![Effect::WarmImages { urls }]
            }
        }
        Msg::CancelPrefetchRows(indices) => {
            let urls = state.image_urls_at(&indices);
            if urls.is_empty() {
                Vec::new()
            } else {
                vec![Effect::CancelImages { urls }]
            }
        }
        Msg::ScrollWillEnd {
            viewport_height,
            content_height,
            target_offset,
        } => {
            if should_load_next_page(viewport_height, content_height, target_offset) {
                request_next_page(&mut state)
            } else {
                Vec::new()
            }
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// True when the remaining scroll distance is within the prefetch distance.
/// Landing exactly on the threshold counts.
pub fn should_load_next_page(viewport_height: f64, content_height: f64, target_offset: f64) -> bool {
    let trigger_distance = viewport_height * SCREENS_TO_LOAD_NEXT_PAGE;
    let remaining = content_height - viewport_height - target_offset;
    remaining <= trigger_distance
}

fn request_next_page(state: &mut ReviewsState) -> Vec<Effect> {
    match state.begin_page_load() {
        Some(request) => vec![Effect::Publish, Effect::FetchPage(request)],
        None => Vec::new(),
    }
}

fn decode_page(
    result: Result<Vec<u8>, crate::PageFetchError>,
    decoder: &dyn PageDecoder,
) -> Result<ReviewsPage, String> {
    let bytes = result.map_err(|err| err.to_string())?;
    decoder.decode(&bytes).map_err(|err| err.to_string())
}
