pub const MAX_RATING: u8 = 5;

/// Handle to a rendered rating strip. The view layer turns it into pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RatingImage {
    pub filled: u8,
    pub total: u8,
}

pub trait RatingRenderer: Send + Sync {
    fn render(&self, rating: i32) -> RatingImage;
}

/// Five-star strip; out-of-range ratings are clamped.
#[derive(Debug, Default, Clone, Copy)]
pub struct StarRatingRenderer;

impl RatingRenderer for StarRatingRenderer {
    fn render(&self, rating: i32) -> RatingImage {
        let filled = rating.clamp(0, i32::from(MAX_RATING)) as u8;
        RatingImage {
            filled,
            total: MAX_RATING,
        }
    }
}
