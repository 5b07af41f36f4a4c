mod news;
mod schema;
mod tags;
mod types;

pub use news::NewsStore;
pub use schema::{Database, MAX_TAG_NAME_LEN};
pub use types::{DatabaseError, NewsRecord, TagCount};
