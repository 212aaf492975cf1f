use crate::view_model::{DisplayItem, FooterRow, ItemId, LoaderRow, ReviewRow, ViewState, DEFAULT_MAX_LINES};
use crate::{PageRequest, RatingRenderer, ReviewRecord, ReviewsPage};

/// Reviews fetched per page unless configured otherwise.
pub const DEFAULT_PAGE_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewsState {
    items: Vec<DisplayItem>,
    limit: usize,
    offset: usize,
    should_load: bool,
    pending: Option<PageRequest>,
    next_item_id: u64,
    next_request_seq: u64,
}

impl Default for ReviewsState {
    fn default() -> Self {
        Self::with_limit(DEFAULT_PAGE_LIMIT)
    }
}

impl ReviewsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A zero limit would never advance the cursor, so it is raised to one.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            items: Vec::new(),
            limit: limit.max(1),
            offset: 0,
            should_load: true,
            pending: None,
            next_item_id: 1,
            next_request_seq: 1,
        }
    }

    pub fn view(&self) -> ViewState {
        ViewState {
            items: self.items.clone(),
            limit: self.limit,
            offset: self.offset,
            should_load: self.should_load,
        }
    }

    pub fn items(&self) -> &[DisplayItem] {
        &self.items
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn should_load(&self) -> bool {
        self.should_load
    }

    pub fn pending_request(&self) -> Option<PageRequest> {
        self.pending
    }

    fn allocate_id(&mut self) -> ItemId {
        let id = ItemId(self.next_item_id);
        self.next_item_id += 1;
        id
    }

    /// Closes the gate, appends the loader row and returns the request to issue.
    pub(crate) fn begin_page_load(&mut self) -> Option<PageRequest> {
        if !self.should_load {
            return None;
        }
        self.should_load = false;
        let id = self.allocate_id();
        self.items.push(DisplayItem::Loader(LoaderRow { id }));

        let request = PageRequest {
            seq: self.next_request_seq,
            offset: self.offset,
            limit: self.limit,
        };
        self.next_request_seq += 1;
        self.pending = Some(request);
        Some(request)
    }

    /// Removes the loader row if `request` is the outstanding one.
    /// Returns false for responses that no longer match (e.g. after a reload).
    pub(crate) fn finish_page_load(&mut self, request: PageRequest) -> bool {
        if self.pending != Some(request) {
            return false;
        }
        self.pending = None;
        if matches!(self.items.last(), Some(DisplayItem::Loader(_))) {
            self.items.pop();
        }
        true
    }

    pub(crate) fn apply_page(&mut self, page: ReviewsPage, ratings: &dyn RatingRenderer) {
        for record in page.items {
            let row = self.make_review_row(record, ratings);
            self.items.push(DisplayItem::Review(row));
        }
        // Never step past the reported total.
        self.offset = (self.offset + self.limit).min(page.count);
        self.should_load = self.offset < page.count;
        if !self.should_load {
            let id = self.allocate_id();
            self.items.push(DisplayItem::Footer(FooterRow {
                id,
                review_count: page.count,
            }));
        }
    }

    pub(crate) fn reopen_gate(&mut self) {
        self.should_load = true;
    }

    pub(crate) fn reset(&mut self) {
        self.items.clear();
        self.offset = 0;
        self.should_load = true;
        self.pending = None;
    }

    /// Lifts the line limit on the matching review. False when nothing changed.
    pub(crate) fn expand_review(&mut self, id: ItemId) -> bool {
        let row = self.items.iter_mut().find_map(|item| match item {
            DisplayItem::Review(row) if row.id == id => Some(row),
            _ => None,
        });
        match row {
            Some(row) if !row.is_expanded() => {
                row.max_lines = 0;
                true
            }
            _ => false,
        }
    }

    /// Avatar and photo URLs of the review rows at `indices`, in row order.
    pub(crate) fn image_urls_at(&self, indices: &[usize]) -> Vec<String> {
        indices
            .iter()
            .filter_map(|&index| self.items.get(index).and_then(DisplayItem::as_review))
            .flat_map(|row| row.image_urls().map(ToOwned::to_owned))
            .collect()
    }

    fn make_review_row(&mut self, record: ReviewRecord, ratings: &dyn RatingRenderer) -> ReviewRow {
        ReviewRow {
            id: self.allocate_id(),
            username: format!("{} {}", record.first_name, record.last_name),
            rating: ratings.render(record.rating),
            avatar_url: record.avatar_url,
            photo_urls: record.photo_urls,
            text: record.text,
            created: record.created,
            max_lines: DEFAULT_MAX_LINES,
        }
    }
}
