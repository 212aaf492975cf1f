//! Row height math for the list. Pure functions of row content, width and font metrics.

use crate::ReviewRow;

const INSET_TOP: f64 = 9.0;
const INSET_BOTTOM: f64 = 9.0;
const INSET_HORIZONTAL: f64 = 12.0;

const AVATAR_SIZE: f64 = 36.0;
const AVATAR_TO_USERNAME: f64 = 10.0;
const USERNAME_TO_RATING: f64 = 6.0;
const RATING_TO_TEXT: f64 = 6.0;
const RATING_TO_PHOTOS: f64 = 10.0;
const PHOTO_HEIGHT: f64 = 66.0;
const PHOTOS_TO_TEXT: f64 = 10.0;
const TEXT_TO_CREATED: f64 = 6.0;
const SHOW_MORE_TO_CREATED: f64 = 6.0;

const LOADER_INDICATOR_HEIGHT: f64 = 9.0;

/// Text measurement supplied by the rendering side.
pub trait TextMetrics {
    fn line_height(&self) -> f64;
    /// Height of `text` wrapped to `width`, with no line limit.
    fn text_height(&self, text: &str, width: f64) -> f64;
}

/// Metrics for a fixed-advance font: every character is `char_width` wide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedWidthMetrics {
    pub char_width: f64,
    pub line_height: f64,
}

impl Default for FixedWidthMetrics {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            line_height: 20.0,
        }
    }
}

impl TextMetrics for FixedWidthMetrics {
    fn line_height(&self) -> f64 {
        self.line_height
    }

    fn text_height(&self, text: &str, width: f64) -> f64 {
        if text.is_empty() {
            return 0.0;
        }
        let columns = ((width / self.char_width).floor() as usize).max(1);
        let lines: usize = text
            .split('\n')
            .map(|paragraph| paragraph.chars().count().div_ceil(columns).max(1))
            .sum();
        lines as f64 * self.line_height
    }
}

struct TextBlock {
    height: f64,
    truncated: bool,
}

fn text_width(width: f64) -> f64 {
    let content = width - 2.0 * INSET_HORIZONTAL;
    let leading = INSET_HORIZONTAL + AVATAR_SIZE + AVATAR_TO_USERNAME;
    (content - leading).max(0.0)
}

fn text_block(row: &ReviewRow, width: f64, metrics: &dyn TextMetrics) -> TextBlock {
    let full = metrics.text_height(&row.text, width);
    if row.max_lines == 0 {
        return TextBlock {
            height: full,
            truncated: false,
        };
    }
    let limit = metrics.line_height() * row.max_lines as f64;
    TextBlock {
        height: full.min(limit),
        truncated: full > limit,
    }
}

pub(crate) fn review_needs_show_more(row: &ReviewRow, width: f64, metrics: &dyn TextMetrics) -> bool {
    !row.text.is_empty() && text_block(row, text_width(width), metrics).truncated
}

pub(crate) fn review_height(row: &ReviewRow, width: f64, metrics: &dyn TextMetrics) -> f64 {
    let width = text_width(width);

    let username_height = metrics.text_height(&row.username, width);
    let mut y = INSET_TOP + username_height + USERNAME_TO_RATING;

    // The rating strip fills what the avatar leaves beside the username.
    let rating_height = (AVATAR_SIZE - username_height).max(0.0);
    y += rating_height;

    if row.photo_urls.is_empty() {
        y += RATING_TO_TEXT;
    } else {
        y += RATING_TO_PHOTOS + PHOTO_HEIGHT + PHOTOS_TO_TEXT;
    }

    let mut show_more = false;
    if !row.text.is_empty() {
        let block = text_block(row, width, metrics);
        show_more = block.truncated;
        y += block.height + TEXT_TO_CREATED;
    }

    if show_more {
        y += metrics.line_height() + SHOW_MORE_TO_CREATED;
    }

    y + metrics.text_height(&row.created, width) + INSET_BOTTOM
}

pub(crate) fn loader_height() -> f64 {
    INSET_TOP + LOADER_INDICATOR_HEIGHT + INSET_BOTTOM
}

pub(crate) fn footer_height(metrics: &dyn TextMetrics) -> f64 {
    INSET_TOP + metrics.line_height() + INSET_BOTTOM
}
