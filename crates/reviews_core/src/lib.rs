//! Reviews core: pure pagination state machine and view-model helpers.
mod effect;
mod layout;
mod msg;
mod page;
mod rating;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, PageRequest};
pub use layout::{FixedWidthMetrics, TextMetrics};
pub use msg::Msg;
pub use page::{
    JsonPageDecoder, PageDecodeError, PageDecoder, PageFetchError, ReviewRecord, ReviewsPage,
};
pub use rating::{RatingImage, RatingRenderer, StarRatingRenderer, MAX_RATING};
pub use state::{ReviewsState, DEFAULT_PAGE_LIMIT};
pub use update::{
    should_load_next_page, update, update_with, Collaborators, SCREENS_TO_LOAD_NEXT_PAGE,
};
pub use view_model::{
    review_count_text, DisplayItem, FooterRow, ItemId, LoaderRow, ReviewRow, ViewState,
    DEFAULT_MAX_LINES,
};
