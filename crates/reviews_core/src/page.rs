use serde::Deserialize;

/// One review as delivered by the reviews endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReviewRecord {
    pub avatar_url: String,
    #[serde(rename = "photos")]
    pub photo_urls: Vec<String>,
    pub first_name: String,
    pub last_name: String,
    pub rating: i32,
    pub text: String,
    pub created: String,
}

/// One decoded page: the reviews in it and the total number available.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReviewsPage {
    pub items: Vec<ReviewRecord>,
    pub count: usize,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PageDecodeError {
    #[error("malformed reviews payload: {0}")]
    Malformed(String),
}

/// Failure reported by whatever fetched the raw page bytes.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PageFetchError {
    #[error("page transport failed: {0}")]
    Transport(String),
}

pub trait PageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<ReviewsPage, PageDecodeError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPageDecoder;

impl PageDecoder for JsonPageDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<ReviewsPage, PageDecodeError> {
        serde_json::from_slice(bytes).map_err(|err| PageDecodeError::Malformed(err.to_string()))
    }
}
