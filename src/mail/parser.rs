//! Structural extraction of the weekly update newsletter body.
//!
//! The body is plain text laid out as:
//!
//! ```text
//! What's New
//! <title> <https://link>
//! YYYY년 MM월 DD일
//! ...
//! Upcoming Launches
//!
//! 주요 업데이트
//! * <bullet text>
//! 제목
//! ```
//!
//! Both extractors are best-effort: a missing section yields an empty result
//! and lines that do not fit the layout are skipped.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use super::markers::Marker;

/// One row of the "What's New" table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub date: String,
}

/// `<title> <http(s)://url>`; group 1 is the raw title, group 2 the URL.
fn title_link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(.*?)<(https?://[^>]+)>").expect("title/link pattern is valid")
    })
}

/// Localized date line such as `2024년 06월 01일`.
fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9]{4}년 [0-9]{2}월 [0-9]{2}일$").expect("date pattern is valid")
    })
}

/// Returns `(title, link)` if the trimmed line looks like a table row.
fn match_title_link(line: &str) -> Option<(&str, &str)> {
    let caps = title_link_pattern().captures(line)?;
    let title = caps.get(1)?.as_str();
    let link = caps.get(2)?.as_str();
    Some((title, link))
}

pub(crate) fn is_date_line(line: &str) -> bool {
    date_pattern().is_match(line)
}

/// Scanner state while walking the "What's New" section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableState<'a> {
    SeekingSectionStart,
    ScanningTable,
    /// A title/link row was seen; the next non-blank line must be its date.
    SeekingDate { title: &'a str, link: &'a str },
}

/// Result of feeding one line to the table scanner.
#[derive(Debug, PartialEq, Eq)]
enum Step<'a> {
    /// Move to the next line in the given state.
    Advance(TableState<'a>),
    /// Feed the same line again in the given state.
    Reprocess(TableState<'a>),
    Emit(NewsItem),
    Done,
}

fn step<'a>(state: TableState<'a>, line: &'a str) -> Step<'a> {
    match state {
        TableState::SeekingSectionStart => {
            if Marker::WhatsNew.contains(line) {
                Step::Advance(TableState::ScanningTable)
            } else {
                Step::Advance(TableState::SeekingSectionStart)
            }
        }
        TableState::ScanningTable => {
            let line = line.trim();
            if Marker::UpcomingLaunches.contains(line) {
                return Step::Done;
            }
            match match_title_link(line) {
                Some((title, link)) => Step::Advance(TableState::SeekingDate { title, link }),
                None => Step::Advance(TableState::ScanningTable),
            }
        }
        TableState::SeekingDate { title, link } => {
            let candidate = line.trim();
            if candidate.is_empty() {
                return Step::Advance(state);
            }
            if is_date_line(candidate) {
                return Step::Emit(NewsItem {
                    title: title.trim().to_string(),
                    link: link.to_string(),
                    date: candidate.to_string(),
                });
            }
            // Adjacency broken: drop the row and scan this line as a table line.
            tracing::trace!(title = %title.trim(), line = %candidate, "Row without date line skipped");
            Step::Reprocess(TableState::ScanningTable)
        }
    }
}

/// Extracts the rows of the "What's New" table.
///
/// The table starts after the first line containing `What's New` and ends at
/// a line containing `Upcoming Launches` (or the end of the body). A row is a
/// title/link line whose next non-blank line is a date; rows without one are
/// dropped. Items are returned in source order.
pub fn extract_news_table(body: &str) -> Vec<NewsItem> {
    let lines: Vec<&str> = body.lines().collect();
    let mut items = Vec::new();
    let mut state = TableState::SeekingSectionStart;
    let mut cursor = 0;

    while cursor < lines.len() {
        match step(state, lines[cursor]) {
            Step::Advance(next) => {
                state = next;
                cursor += 1;
            }
            Step::Reprocess(next) => state = next,
            Step::Emit(item) => {
                items.push(item);
                state = TableState::ScanningTable;
                cursor += 1;
            }
            Step::Done => break,
        }
    }

    if state == TableState::SeekingSectionStart {
        tracing::debug!(section = %Marker::WhatsNew, "Section not found");
    }

    items
}

/// Extracts the `*` bullets under `주요 업데이트`.
///
/// Scanning stops at the first line containing the `제목` table header or at
/// the end of the body. Bullet markers are stripped and the text trimmed;
/// other lines inside the block are ignored.
pub fn extract_update_bullets(body: &str) -> Vec<String> {
    let lines: Vec<&str> = body.lines().collect();

    let Some(start) = Marker::MainUpdates.find_in(&lines) else {
        tracing::debug!(section = %Marker::MainUpdates, "Section not found");
        return Vec::new();
    };

    let mut bullets = Vec::new();
    for line in &lines[start + 1..] {
        let line = line.trim();
        if Marker::TableHeader.contains(line) {
            break;
        }
        if let Some(rest) = line.strip_prefix('*') {
            bullets.push(rest.trim().to_string());
        }
    }
    bullets
}
