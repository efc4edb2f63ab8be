//! Web search adapter: DuckDuckGo with page fetch and an on-disk cache

pub mod cache;
pub mod duckduckgo;
pub mod extract;
