//! Scheduler cycles: newsletter files in, webhook notification and sync pass out.

use secrecy::SecretString;
use serde_json::json;
use std::num::NonZeroU32;
use std::path::PathBuf;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use digest_sync::feed::HttpFeedClient;
use digest_sync::notify::WebhookNotifier;
use digest_sync::runner::Runner;
use digest_sync::storage::Database;
use digest_sync::sync::{StopReason, SyncEngine};

const NEWSLETTER: &str = "From: updates@example.com\r\n\
Subject: AWS Weekly Update (AWS Confidential)\r\n\
MIME-Version: 1.0\r\n\
Content-Type: text/plain; charset=UTF-8\r\n\
\r\n\
안녕하세요,\r\n\
\r\n\
*** What's New ***\r\n\
제목\r\n\
Title A <https://example.com/a>\r\n\
2024년 06월 01일\r\n\
\r\n\
Broken entry <https://example.com/broken>\r\n\
not a date\r\n\
Title B <https://example.com/b>\r\n\
\r\n\
2024년 06월 02일\r\n\
\r\n\
Upcoming Launches\r\n\
Later <https://example.com/later>\r\n\
2024년 07월 01일\r\n\
\r\n\
주요 업데이트\r\n\
* 업데이트 1\r\n\
  *   업데이트 2  \r\n\
제목\r\n\
* after header\r\n";

fn mail_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("digest_sync_cycle_{}", name));
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("2024-06-03.mime"), NEWSLETTER).unwrap();
    dir
}

async fn runner_for(server: &MockServer, dir: PathBuf) -> Runner<HttpFeedClient, Database> {
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(server)
        .await;

    let base = Url::parse(&format!("{}/search", server.uri())).unwrap();
    let client = HttpFeedClient::new(reqwest::Client::new(), base, "whats-new-v2", "en_US");
    let engine = SyncEngine::new(client, Database::open(":memory:").await.unwrap());
    let notifier = WebhookNotifier::new(
        reqwest::Client::new(),
        SecretString::from(format!("{}/hook", server.uri())),
    );

    Runner::new(engine, NonZeroU32::new(100).unwrap())
        .with_mail_dir(dir)
        .with_subject_filter("AWS Weekly Update".to_string())
        .with_notifier(notifier)
}

#[test]
fn test_newsletter_extraction() {
    let parsed = digest_sync::mail::parse_message(NEWSLETTER.as_bytes()).unwrap();

    let news: Vec<(&str, &str, &str)> = parsed
        .news
        .iter()
        .map(|n| (n.title.as_str(), n.link.as_str(), n.date.as_str()))
        .collect();
    assert_eq!(
        news,
        vec![
            ("Title A", "https://example.com/a", "2024년 06월 01일"),
            ("Title B", "https://example.com/b", "2024년 06월 02일"),
        ]
    );
    assert_eq!(parsed.updates, vec!["업데이트 1", "업데이트 2"]);
}

#[tokio::test]
async fn test_cycle_notifies_and_syncs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_json(json!({ "text": "\nUpdates:\n업데이트 1\n업데이트 2" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = mail_dir("notify");
    let runner = runner_for(&server, dir.clone()).await;

    let summary = runner.run_cycle().await;
    assert_eq!(summary.mails_parsed, 1);
    assert_eq!(summary.notifications_sent, 1);
    assert_eq!(summary.sync.unwrap().stop, StopReason::EmptyPage);

    // Already handled files are not sent again.
    let summary = runner.run_cycle().await;
    assert_eq!(summary.mails_parsed, 0);
    assert_eq!(summary.notifications_sent, 0);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_webhook_failure_does_not_stop_sync() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let dir = mail_dir("webhook_failure");
    let runner = runner_for(&server, dir.clone()).await;

    let summary = runner.run_cycle().await;
    assert_eq!(summary.mails_parsed, 1);
    assert_eq!(summary.notifications_sent, 0);
    assert!(summary.sync.is_some());

    std::fs::remove_dir_all(&dir).ok();
}
