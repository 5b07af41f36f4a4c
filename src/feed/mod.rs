//! External What's New feed access.
//!
//! - [`client`] - The [`FeedSource`] seam and its HTTP implementation
//! - [`types`] - Wire format models and the [`FeedRecord`] domain value
//! - [`ordering`] - Detection of pages that are not newest-first
//!
//! # Example
//!
//! ```ignore
//! use digest_sync::feed::{FeedSource, HttpFeedClient};
//!
//! let client = HttpFeedClient::new(reqwest::Client::new(), base_url, "whats-new-v2", "en_US");
//! let page = client.fetch_page(0, NonZeroU32::new(100).unwrap()).await?;
//! ```

mod client;
pub mod ordering;
mod types;

pub use client::{FeedSource, FetchError, HttpFeedClient, DEFAULT_TIMEOUT};
pub use ordering::{check_recency_order, OrderViolation, RecencyGuard};
pub use types::{parse_source_timestamp, ApiResponse, FeedPage, FeedRecord};
