//! The scheduling loop around mail processing and feed sync.
//!
//! One cycle handles any new newsletter files, then runs one sync pass.
//! Nothing that goes wrong inside a cycle stops the loop; the next tick is
//! the retry.

use std::collections::HashSet;
use std::future::Future;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::feed::FeedSource;
use crate::mail::{self, ParsedMail};
use crate::notify::WebhookNotifier;
use crate::storage::NewsStore;
use crate::sync::{SyncEngine, SyncReport};

/// What one cycle did.
#[derive(Debug, Default)]
pub struct CycleSummary {
    pub mails_parsed: usize,
    pub notifications_sent: usize,
    /// `None` when the sync pass failed.
    pub sync: Option<SyncReport>,
}

pub struct Runner<F, S> {
    engine: SyncEngine<F, S>,
    page_size: NonZeroU32,
    mail_dir: Option<PathBuf>,
    subject_filter: Option<String>,
    notifier: Option<WebhookNotifier>,
    // Mail files already handled by this process.
    processed: Mutex<HashSet<PathBuf>>,
}

impl<F: FeedSource, S: NewsStore> Runner<F, S> {
    pub fn new(engine: SyncEngine<F, S>, page_size: NonZeroU32) -> Self {
        Self {
            engine,
            page_size,
            mail_dir: None,
            subject_filter: None,
            notifier: None,
            processed: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_mail_dir(mut self, dir: PathBuf) -> Self {
        self.mail_dir = Some(dir);
        self
    }

    /// Only messages whose subject contains `filter` are processed.
    pub fn with_subject_filter(mut self, filter: String) -> Self {
        self.subject_filter = Some(filter);
        self
    }

    pub fn with_notifier(mut self, notifier: WebhookNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn engine(&self) -> &SyncEngine<F, S> {
        &self.engine
    }

    /// Runs one cycle. Failures are logged, never returned.
    pub async fn run_cycle(&self) -> CycleSummary {
        let mut summary = CycleSummary::default();

        for mail in self.new_mails() {
            summary.mails_parsed += 1;
            println!("{}", mail::render_summary(&mail));

            let Some(notifier) = &self.notifier else {
                continue;
            };
            match notifier.notify_updates(&mail).await {
                Ok(true) => summary.notifications_sent += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(subject = %mail.subject, error = %e, "Failed to send update notification");
                }
            }
        }

        match self.engine.sync_until_known(self.page_size).await {
            Ok(report) => summary.sync = Some(report),
            Err(e) => tracing::error!(error = %e, "Sync pass failed"),
        }
        summary
    }

    /// Parses mail files not seen before in this process.
    fn new_mails(&self) -> Vec<ParsedMail> {
        let Some(dir) = &self.mail_dir else {
            return Vec::new();
        };
        let files = match mail::load_dir(dir) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping mail processing");
                return Vec::new();
            }
        };

        let mut processed = match self.processed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut mails = Vec::new();
        for file in files {
            if !processed.insert(file.path.clone()) {
                continue;
            }
            let Some(parsed) = mail::parse_message(&file.raw) else {
                tracing::warn!(path = %file.path.display(), "Not a parseable message, skipping");
                continue;
            };
            if let Some(filter) = &self.subject_filter {
                if !parsed.subject.contains(filter.as_str()) {
                    tracing::debug!(path = %file.path.display(), subject = %parsed.subject, "Subject does not match filter");
                    continue;
                }
            }
            tracing::info!(
                path = %file.path.display(),
                news = parsed.news.len(),
                updates = parsed.updates.len(),
                "Loaded newsletter"
            );
            mails.push(parsed);
        }
        mails
    }

    /// Runs a cycle every `period` (the first one immediately) until
    /// `shutdown` resolves. Cycles never overlap.
    pub async fn run_forever(&self, period: Duration, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(period = ?period, "Scheduler started");
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping scheduler");
                    break;
                }
                _ = ticker.tick() => {
                    let summary = self.run_cycle().await;
                    tracing::debug!(
                        mails = summary.mails_parsed,
                        notifications = summary.notifications_sent,
                        synced = summary.sync.is_some(),
                        "Cycle finished"
                    );
                }
            }
        }
    }
}
