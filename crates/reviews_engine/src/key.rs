use std::fmt;

use url::Url;

/// Normalized absolute URL identifying one fetchable image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey(Url);

impl ResourceKey {
    /// Parses and normalizes `raw`; `None` when it is not an absolute URL.
    pub fn parse(raw: &str) -> Option<Self> {
        Url::parse(raw.trim()).ok().map(Self)
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}
