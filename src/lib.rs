//! Weekly update newsletter parsing and incremental What's New feed sync.
//!
//! - [`mail`] - Structural parser for the newsletter body
//! - [`feed`] - Paginated feed client
//! - [`storage`] - SQLite persistence gateway
//! - [`sync`] - Stop-at-first-known sync engine
//! - [`notify`] - Webhook notifications
//! - [`runner`] - Scheduling loop tying the above together

pub mod config;
pub mod feed;
pub mod mail;
pub mod notify;
pub mod runner;
pub mod storage;
pub mod sync;
pub mod util;
