use std::fmt::Write;

use super::message::ParsedMail;

const RULE: &str = "========================================";

/// Renders the console summary printed after a message is parsed.
pub fn render_summary(mail: &ParsedMail) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "Subject: {}", mail.subject);
    let _ = writeln!(out, "--- What's New ---");
    for (i, item) in mail.news.iter().enumerate() {
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "{}.", i + 1);
        let _ = writeln!(out, "제목: {}", item.title);
        let _ = writeln!(out, "링크: {}", item.link);
        let _ = writeln!(out, "날짜: {}", item.date);
    }
    let _ = writeln!(out, "--- Main Updates ---");
    for update in &mail.updates {
        let _ = writeln!(out, "{update}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::parse_body;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_summary() {
        let mail = parse_body(
            "Weekly",
            "What's New\nA <https://x.com/a>\n2024년 01월 01일\n주요 업데이트\n* one\n",
        );
        let expected = "Subject: Weekly\n\
--- What's New ---\n\
========================================\n\
1.\n\
제목: A\n\
링크: https://x.com/a\n\
날짜: 2024년 01월 01일\n\
--- Main Updates ---\n\
one\n";
        assert_eq!(render_summary(&mail), expected);
    }

    #[test]
    fn test_render_empty_summary() {
        let out = render_summary(&ParsedMail::default());
        assert_eq!(out, "Subject: \n--- What's New ---\n--- Main Updates ---\n");
    }
}
