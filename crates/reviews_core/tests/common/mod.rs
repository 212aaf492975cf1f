#![allow(dead_code)]

use std::sync::Once;

use reviews_core::{DisplayItem, Effect, PageRequest, ViewState};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

/// JSON page with `n` reviews numbered from `first`, reporting `count` in total.
pub fn page_json(first: usize, n: usize, count: usize) -> Vec<u8> {
    let items: Vec<String> = (first..first + n)
        .map(|i| {
            format!(
                r#"{{"avatar_url":"https://cdn.example.com/avatar/{i}.jpg","photos":["https://cdn.example.com/photo/{i}-a.jpg","https://cdn.example.com/photo/{i}-b.jpg"],"first_name":"User","last_name":"{i}","rating":4,"text":"Review number {i}","created":"1 March"}}"#
            )
        })
        .collect();
    format!(r#"{{"items":[{}],"count":{}}}"#, items.join(","), count).into_bytes()
}

pub fn fetch_request(effects: &[Effect]) -> PageRequest {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::FetchPage(request) => Some(*request),
            _ => None,
        })
        .expect("fetch page effect")
}

/// Loader and footer never co-occur and only ever sit in the last slot.
pub fn assert_sentinels(view: &ViewState) {
    let last = view.items.len().saturating_sub(1);
    let mut loaders = 0;
    let mut footers = 0;
    for (index, item) in view.items.iter().enumerate() {
        match item {
            DisplayItem::Loader(_) => {
                loaders += 1;
                assert_eq!(index, last, "loader must be last");
            }
            DisplayItem::Footer(_) => {
                footers += 1;
                assert_eq!(index, last, "footer must be last");
            }
            DisplayItem::Review(_) => {}
        }
    }
    assert!(loaders + footers <= 1, "loader and footer co-occur");

    let mut ids: Vec<_> = view.items.iter().map(DisplayItem::id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), view.items.len(), "duplicate row ids");
}
