use mail_parser::MessageParser;
use serde::Serialize;

use super::parser::{extract_news_table, extract_update_bullets, NewsItem};

/// Everything extracted from one newsletter message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedMail {
    /// Decoded `Subject` header, empty when absent.
    pub subject: String,
    pub news: Vec<NewsItem>,
    pub updates: Vec<String>,
}

/// Decodes a raw RFC 5322 message and runs both extractors on its text body.
///
/// Returns `None` only when the bytes cannot be read as a message at all. A
/// message without a text body keeps its subject and yields empty sections.
pub fn parse_message(raw: &[u8]) -> Option<ParsedMail> {
    let message = MessageParser::default().parse(raw)?;
    let subject = message.subject().unwrap_or_default().to_string();

    let Some(body) = message.body_text(0) else {
        tracing::warn!(subject = %subject, "No text body found in message");
        return Some(ParsedMail {
            subject,
            ..ParsedMail::default()
        });
    };

    let parsed = parse_body(subject, &body);
    tracing::debug!(
        subject = %parsed.subject,
        news = parsed.news.len(),
        updates = parsed.updates.len(),
        "Parsed newsletter"
    );
    Some(parsed)
}

/// Runs both extractors over an already decoded body.
pub fn parse_body(subject: impl Into<String>, body: &str) -> ParsedMail {
    ParsedMail {
        subject: subject.into(),
        news: extract_news_table(body),
        updates: extract_update_bullets(body),
    }
}
