//! Newsletter mail handling.
//!
//! - [`parser`] - Structural extraction of the "What's New" table and the
//!   main update bullets from a plain-text body
//! - [`markers`] - The section marker table the parser scans for
//! - [`message`] - MIME decoding of raw messages via `mail-parser`
//! - [`mailbox`] - Loading raw `.mime` files from a local directory
//! - [`summary`] - Console rendering of a parsed message
//!
//! Mailbox transport (IMAP) is not handled here; callers hand in raw bytes.

pub mod mailbox;
pub mod markers;
mod message;
mod parser;
mod summary;

pub use mailbox::{load_dir, load_file, MailFile, MailboxError};
pub use markers::Marker;
pub use message::{parse_body, parse_message, ParsedMail};
pub use parser::{extract_news_table, extract_update_bullets, NewsItem};
pub use summary::render_summary;
