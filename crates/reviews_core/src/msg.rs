use crate::{ItemId, PageFetchError, PageRequest};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Ask for the next page if no page load is in flight.
    LoadNextPage,
    /// Drop every row, rewind the cursor and load the first page again.
    Reload,
    /// Raw bytes (or transport failure) for a previously issued page request.
    PageLoaded {
        request: PageRequest,
        result: Result<Vec<u8>, PageFetchError>,
    },
    /// User tapped "show more" on a review row.
    ShowMoreTapped { id: ItemId },
    /// Rows at these indices are about to scroll into view.
    PrefetchRows(Vec<usize>),
    /// Rows at these indices are no longer expected to appear.
    CancelPrefetchRows(Vec<usize>),
    /// Scrolling is decelerating towards `target_offset`.
    ScrollWillEnd {
        viewport_height: f64,
        content_height: f64,
        target_offset: f64,
    },
    /// Fallback for placeholder wiring.
    NoOp,
}
