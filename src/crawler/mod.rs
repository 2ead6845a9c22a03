//! Crawler module for link discovery and fetching
//!
//! This module contains everything that talks HTTP:
//! - Incremental link extraction and archive link filtering
//! - HTTP client construction and streaming downloads
//! - The listing page crawler that feeds the link queue

mod fetcher;
mod links;
mod listing;

pub use fetcher::{build_http_client, download_to, open_stream};
pub use links::{LinkExtractor, LinkFilter};
pub use listing::{resolve_link, LinkCrawler};
