use crate::layout::{self, TextMetrics};
use crate::{Msg, RatingImage};

/// Default number of visible review text lines before "show more".
pub const DEFAULT_MAX_LINES: usize = 3;

/// Stable row identity, unique for the lifetime of one `ReviewsState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

/// Snapshot handed to subscribers. Owned, so later state changes never reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub items: Vec<DisplayItem>,
    pub limit: usize,
    pub offset: usize,
    pub should_load: bool,
}

impl ViewState {
    pub fn review_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, DisplayItem::Review(_)))
            .count()
    }

    pub fn has_loader(&self) -> bool {
        self.items
            .iter()
            .any(|item| matches!(item, DisplayItem::Loader(_)))
    }

    pub fn footer(&self) -> Option<&FooterRow> {
        self.items.iter().find_map(|item| match item {
            DisplayItem::Footer(footer) => Some(footer),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayItem {
    Review(ReviewRow),
    Loader(LoaderRow),
    Footer(FooterRow),
}

impl DisplayItem {
    pub fn id(&self) -> ItemId {
        match self {
            DisplayItem::Review(row) => row.id,
            DisplayItem::Loader(row) => row.id,
            DisplayItem::Footer(row) => row.id,
        }
    }

    /// Row height for the given available width.
    pub fn height(&self, width: f64, metrics: &dyn TextMetrics) -> f64 {
        match self {
            DisplayItem::Review(row) => layout::review_height(row, width, metrics),
            DisplayItem::Loader(_) => layout::loader_height(),
            DisplayItem::Footer(_) => layout::footer_height(metrics),
        }
    }

    pub fn as_review(&self) -> Option<&ReviewRow> {
        match self {
            DisplayItem::Review(row) => Some(row),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRow {
    pub id: ItemId,
    pub avatar_url: String,
    pub photo_urls: Vec<String>,
    pub username: String,
    pub rating: RatingImage,
    pub text: String,
    pub created: String,
    /// Visible text lines; 0 means unlimited.
    pub max_lines: usize,
}

impl ReviewRow {
    pub fn is_expanded(&self) -> bool {
        self.max_lines == 0
    }

    /// Message the view sends when the "show more" control is tapped.
    pub fn show_more_msg(&self) -> Msg {
        Msg::ShowMoreTapped { id: self.id }
    }

    /// Whether the truncated text hides lines at this width.
    pub fn needs_show_more(&self, width: f64, metrics: &dyn TextMetrics) -> bool {
        layout::review_needs_show_more(self, width, metrics)
    }

    /// Avatar first, then photos in display order.
    pub fn image_urls(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.avatar_url.as_str()).chain(self.photo_urls.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderRow {
    pub id: ItemId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FooterRow {
    pub id: ItemId,
    pub review_count: usize,
}

impl FooterRow {
    pub fn text(&self) -> String {
        review_count_text(self.review_count)
    }
}

/// Review count with the matching Russian noun form ("1 отзыв", "3 отзыва", "12 отзывов").
pub fn review_count_text(count: usize) -> String {
    let last_digit = count % 10;
    let last_two_digits = count % 100;

    if (11..=14).contains(&last_two_digits) {
        return format!("{count} отзывов");
    }

    match last_digit {
        1 => format!("{count} отзыв"),
        2..=4 => format!("{count} отзыва"),
        _ => format!("{count} отзывов"),
    }
}
