//! Reviews engine: image loading, caching and page transport.
mod cache;
mod decode;
mod key;
mod loader;
mod provider;
mod task;
mod transport;
mod types;

pub use cache::ImageCache;
pub use decode::{ImageDecoder, RasterImageDecoder};
pub use key::ResourceKey;
pub use loader::{Completion, ImageLoader, LoaderSettings};
pub use provider::{HttpReviewsProvider, ReviewsProvider};
pub use transport::{ReqwestTransport, Transport, TransportSettings};
pub use types::{DecodedImage, FailureKind, FetchError};
