use std::sync::Arc;

use engine_logging::engine_debug;
use url::Url;

use crate::{FetchError, Transport};

/// Source of raw review pages.
#[async_trait::async_trait]
pub trait ReviewsProvider: Send + Sync {
    async fn get_page(&self, offset: usize, limit: usize) -> Result<Vec<u8>, FetchError>;
}

/// Fetches `GET {endpoint}?offset=..&limit=..` through a [`Transport`].
#[derive(Clone)]
pub struct HttpReviewsProvider {
    endpoint: Url,
    transport: Arc<dyn Transport>,
}

impl HttpReviewsProvider {
    pub fn new(endpoint: Url, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint,
            transport,
        }
    }

    pub fn page_url(&self, offset: usize, limit: usize) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &limit.to_string());
        url
    }
}

#[async_trait::async_trait]
impl ReviewsProvider for HttpReviewsProvider {
    async fn get_page(&self, offset: usize, limit: usize) -> Result<Vec<u8>, FetchError> {
        let url = self.page_url(offset, limit);
        engine_debug!("Requesting reviews page {}", url);
        self.transport.fetch(&url).await
    }
}
