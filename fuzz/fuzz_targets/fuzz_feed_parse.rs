#![no_main]
use cloudiplookup::{feeds, FeedKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    if let Ok(text) = std::str::from_utf8(rest) {
        let kind = FeedKind::ALL[selector as usize % FeedKind::ALL.len()];
        let _ = feeds::parse(kind, text);
    }
});
