/// One outstanding page load. `seq` tells a current response from a stale one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub seq: u64,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// State changed; push a fresh `ViewState` to subscribers.
    Publish,
    FetchPage(PageRequest),
    WarmImages { urls: Vec<String> },
    CancelImages { urls: Vec<String> },
}
