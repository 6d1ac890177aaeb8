//! Polling loop: authorize, list threads, reply where needed, repeat

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::auth::{self, Authenticator};
use crate::client::{ClientOptions, GmailMailClient, MailClient};
use crate::composer::{build_reply, compose, encode};
use crate::config::{PollConfig, ReplyConfig};
use crate::decision::{extract_sender, needs_reply};
use crate::error::{AutoReplyError, Result};
use crate::models::{CycleReport, OutgoingMessage, ThreadOutcome};

/// Produces an authorized mail client at the start of each cycle
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn MailClient>>;
}

/// Authorizes from the token file (or grant flow) and builds a Gmail client
pub struct GmailConnector {
    authenticator: Authenticator,
    poll: PollConfig,
}

impl GmailConnector {
    pub fn new(authenticator: Authenticator, poll: PollConfig) -> Self {
        Self { authenticator, poll }
    }
}

#[async_trait]
impl Connector for GmailConnector {
    async fn connect(&self) -> Result<Arc<dyn MailClient>> {
        let credential = self.authenticator.authorize().await?;
        let hub = auth::build_gmail_hub(&credential).await?;

        let client = GmailMailClient::new(hub).with_options(ClientOptions::from(&self.poll));

        Ok(Arc::new(client))
    }
}

/// Runs the reply decision over every listed thread
pub struct Responder {
    reply: ReplyConfig,
    max_concurrent: usize,
}

impl Responder {
    pub fn new(reply: ReplyConfig, max_concurrent: usize) -> Self {
        Self {
            reply,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Process one page of threads, at most `max_concurrent` at a time
    ///
    /// Listing failures abort the cycle. Per-thread failures are collected
    /// into the report and do not affect other threads.
    pub async fn run_cycle(&self, client: &dyn MailClient) -> Result<CycleReport> {
        let mut report = CycleReport::new();

        let threads = client.list_threads().await?;
        report.threads_seen = threads.len();
        debug!("Listed {} threads", threads.len());

        if threads.is_empty() {
            return Ok(report);
        }

        let from = client.profile_address().await?;

        let outcomes: Vec<(String, Result<ThreadOutcome>)> = stream::iter(threads)
            .map(|summary| {
                let from = from.as_str();
                async move {
                    let outcome = self.process_thread(client, &summary.id, from).await;
                    (summary.id, outcome)
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        for (thread_id, outcome) in outcomes {
            report.record(&thread_id, outcome);
        }

        Ok(report)
    }

    /// Decide whether a thread needs a reply and send it if so
    pub async fn process_thread(
        &self,
        client: &dyn MailClient,
        thread_id: &str,
        from: &str,
    ) -> Result<ThreadOutcome> {
        let thread = client.get_thread(thread_id).await?;
        if !needs_reply(&thread) {
            debug!("Thread {} already has a sent message or draft", thread_id);
            return Ok(ThreadOutcome::AlreadyHandled);
        }

        let first = thread.messages.first().ok_or_else(|| {
            AutoReplyError::InvalidMessage(format!("Thread {} has no messages", thread_id))
        })?;

        let message = client.get_message(&first.id).await?;
        let sender = extract_sender(&message)?;
        info!("Thread {} awaits a reply from {}", thread_id, sender);

        let options = build_reply(&message, &sender, from, &self.reply);
        let raw = encode(&compose(&options)?);

        if self.reply.dry_run {
            info!("Dry run: not sending reply to {}", sender);
            return Ok(ThreadOutcome::DryRun { to: sender });
        }

        let sent = client
            .send_message(OutgoingMessage {
                raw,
                thread_id: first.thread_id.clone(),
            })
            .await?;

        info!(
            message_id = ?sent.id,
            thread_id = ?sent.thread_id,
            labels = ?sent.labels,
            "Reply sent to {}",
            sender
        );
        Ok(ThreadOutcome::Replied { to: sender })
    }
}

/// Shortest repeat interval a scheduler accepts
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Pick the repeat interval uniformly from `[min_secs, max_secs)` seconds
pub fn pick_interval(min_secs: u64, max_secs: u64) -> Duration {
    let secs = if max_secs > min_secs {
        rand::thread_rng().gen_range(min_secs..max_secs)
    } else {
        min_secs
    };
    Duration::from_secs(secs)
}

/// Owns the polling loop
///
/// The first cycle runs immediately, later cycles every `interval`. The
/// interval is chosen once, when the scheduler is created, and is never
/// shorter than [`MIN_INTERVAL`].
pub struct Scheduler<C> {
    connector: C,
    responder: Responder,
    interval: Duration,
}

impl<C: Connector> Scheduler<C> {
    pub fn new(connector: C, responder: Responder, poll: &PollConfig) -> Self {
        let interval = pick_interval(poll.min_interval_secs, poll.max_interval_secs);
        Self::with_interval(connector, responder, interval)
    }

    pub fn with_interval(connector: C, responder: Responder, interval: Duration) -> Self {
        if interval < MIN_INTERVAL {
            warn!("Interval {:?} is below {:?}, using the minimum", interval, MIN_INTERVAL);
        }

        Self {
            connector,
            responder,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single authorize→list→reply cycle
    pub async fn run_once(&self) -> Result<CycleReport> {
        let client = self.connector.connect().await?;
        self.responder.run_cycle(client.as_ref()).await
    }

    /// Run cycles until `shutdown` resolves, returning how many cycles finished
    ///
    /// A cycle that fails is logged and abandoned; the next tick starts a
    /// fresh one. Shutdown during a cycle abandons that cycle.
    pub async fn run<F>(&self, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0;

        info!("Polling every {:?}", self.interval);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("Shutdown requested during a cycle, abandoning it");
                    break;
                }
                _ = self.tick() => cycles += 1,
            }
        }

        info!("Scheduler stopped after {} cycles", cycles);
        cycles
    }

    async fn tick(&self) {
        let span = info_span!("cycle");
        async {
            match self.run_once().await {
                Ok(report) => log_report(&report),
                Err(e) => {
                    error!("Cycle failed: {}", e);
                    if e.needs_reauthorization() {
                        warn!("Stored credential may be revoked; run `auth --force` to re-authorize");
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn log_report(report: &CycleReport) {
    for failure in &report.failures {
        warn!(
            cycle_id = %report.cycle_id,
            "Thread {} failed: {}",
            failure.thread_id,
            failure.error
        );
    }

    info!(
        cycle_id = %report.cycle_id,
        started_at = %report.started_at,
        threads = report.threads_seen,
        replied = report.replies_sent,
        skipped = report.skipped,
        failed = report.failures.len(),
        "Cycle complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockMailClient;
    use crate::models::{Header, Message, SentMessage, Thread, ThreadSummary};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn message(id: &str, thread_id: &str, labels: &[&str]) -> Message {
        Message {
            id: id.to_string(),
            thread_id: thread_id.to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            headers: Vec::new(),
            snippet: None,
        }
    }

    fn responder() -> Responder {
        Responder::new(ReplyConfig::default(), 4)
    }

    #[test]
    fn test_pick_interval_within_bounds() {
        for _ in 0..200 {
            let interval = pick_interval(50, 120);
            assert!(interval >= Duration::from_secs(50));
            assert!(interval < Duration::from_secs(120));
        }
        assert_eq!(pick_interval(7, 7), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_sent_thread_is_not_answered() {
        let mut client = MockMailClient::new();
        client.expect_get_thread().returning(|id| {
            Ok(Thread {
                id: id.to_string(),
                messages: vec![message("m1", id, &["INBOX"]), message("m2", id, &["SENT"])],
            })
        });
        client.expect_get_message().never();
        client.expect_send_message().never();

        let outcome = responder().process_thread(&client, "t1", "me@example.org").await.unwrap();
        assert_eq!(outcome, ThreadOutcome::AlreadyHandled);
    }

    #[tokio::test]
    async fn test_missing_from_header_fails_thread() {
        let mut client = MockMailClient::new();
        client.expect_get_thread().returning(|id| {
            Ok(Thread {
                id: id.to_string(),
                messages: vec![message("m1", id, &["INBOX"])],
            })
        });
        client
            .expect_get_message()
            .returning(|id| Ok(message(id, "t1", &["INBOX"])));
        client.expect_send_message().never();

        let result = responder().process_thread(&client, "t1", "me@example.org").await;
        assert!(matches!(result, Err(AutoReplyError::InvalidMessage(_))));
    }

    #[tokio::test]
    async fn test_dry_run_skips_send() {
        let mut client = MockMailClient::new();
        client.expect_get_thread().returning(|id| {
            Ok(Thread {
                id: id.to_string(),
                messages: vec![message("m1", id, &["INBOX"])],
            })
        });
        client.expect_get_message().returning(|id| {
            let mut msg = message(id, "t1", &["INBOX"]);
            msg.headers.push(Header::new("From", "Jane <jane@example.com>"));
            Ok(msg)
        });
        client.expect_send_message().never();

        let config = ReplyConfig {
            dry_run: true,
            ..ReplyConfig::default()
        };
        let outcome = Responder::new(config, 1)
            .process_thread(&client, "t1", "me@example.org")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ThreadOutcome::DryRun {
                to: "jane@example.com".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_cycle_collects_thread_failures() {
        let mut client = MockMailClient::new();
        client.expect_list_threads().returning(|| {
            Ok(vec![
                ThreadSummary { id: "ok".to_string() },
                ThreadSummary { id: "gone".to_string() },
            ])
        });
        client
            .expect_profile_address()
            .returning(|| Ok("me@example.org".to_string()));
        client.expect_get_thread().returning(|id| {
            if id == "gone" {
                Err(AutoReplyError::NotFound("HTTP 404: Not Found".to_string()))
            } else {
                Ok(Thread {
                    id: id.to_string(),
                    messages: vec![message("m1", id, &["INBOX"])],
                })
            }
        });
        client.expect_get_message().returning(|id| {
            let mut msg = message(id, "ok", &["INBOX"]);
            msg.headers.push(Header::new("From", "Jane <jane@example.com>"));
            Ok(msg)
        });
        client.expect_send_message().times(1).returning(|outgoing| {
            Ok(SentMessage {
                id: Some("sent1".to_string()),
                thread_id: Some(outgoing.thread_id),
                labels: vec!["SENT".to_string()],
            })
        });

        let report = responder().run_cycle(&client).await.unwrap();
        assert_eq!(report.threads_seen, 2);
        assert_eq!(report.replies_sent, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].thread_id, "gone");
    }

    #[tokio::test]
    async fn test_empty_mailbox_skips_profile_lookup() {
        let mut client = MockMailClient::new();
        client.expect_list_threads().returning(|| Ok(Vec::new()));
        client.expect_profile_address().never();

        let report = responder().run_cycle(&client).await.unwrap();
        assert_eq!(report.threads_seen, 0);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_list_failure_aborts_cycle() {
        let mut client = MockMailClient::new();
        client
            .expect_list_threads()
            .returning(|| Err(AutoReplyError::Unauthorized("HTTP 401".to_string())));

        let result = responder().run_cycle(&client).await;
        assert!(matches!(result, Err(AutoReplyError::Unauthorized(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_runs_immediately_then_every_interval() {
        let connects = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&connects);

        let mut connector = MockConnector::new();
        connector.expect_connect().returning(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let mut client = MockMailClient::new();
            client.expect_list_threads().returning(|| Ok(Vec::new()));
            Ok(Arc::new(client) as Arc<dyn MailClient>)
        });

        let scheduler = Scheduler::with_interval(connector, responder(), Duration::from_secs(50));
        let cycles = scheduler
            .run(tokio::time::sleep(Duration::from_secs(120)))
            .await;

        // t=0, t=50, t=100
        assert_eq!(cycles, 3);
        assert_eq!(connects.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_survives_failed_cycles() {
        let mut connector = MockConnector::new();
        connector
            .expect_connect()
            .times(2)
            .returning(|| Err(AutoReplyError::Auth("grant rejected".to_string())));

        let scheduler = Scheduler::with_interval(connector, responder(), Duration::from_secs(60));
        let cycles = scheduler
            .run(tokio::time::sleep(Duration::from_secs(90)))
            .await;

        assert_eq!(cycles, 2);
    }

    #[tokio::test]
    async fn test_scheduler_stops_on_shutdown() {
        let mut connector = MockConnector::new();
        connector.expect_connect().never();

        let scheduler = Scheduler::with_interval(connector, responder(), Duration::from_secs(60));
        let cycles = scheduler.run(std::future::ready(())).await;

        assert_eq!(cycles, 0);
    }

    #[test]
    fn test_zero_interval_config_is_clamped() {
        let poll = PollConfig {
            min_interval_secs: 0,
            max_interval_secs: 0,
            ..PollConfig::default()
        };
        let scheduler = Scheduler::new(MockConnector::new(), responder(), &poll);
        assert_eq!(scheduler.interval(), MIN_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_runs_at_minimum_period() {
        let mut connector = MockConnector::new();
        connector.expect_connect().times(3).returning(|| {
            let mut client = MockMailClient::new();
            client.expect_list_threads().returning(|| Ok(Vec::new()));
            Ok(Arc::new(client) as Arc<dyn MailClient>)
        });

        let scheduler = Scheduler::with_interval(connector, responder(), Duration::ZERO);
        let cycles = scheduler
            .run(tokio::time::sleep(Duration::from_millis(2500)))
            .await;

        // t=0, t=1, t=2
        assert_eq!(cycles, 3);
    }

    #[test]
    fn test_scheduler_interval_from_config() {
        let poll = PollConfig {
            min_interval_secs: 50,
            max_interval_secs: 120,
            ..PollConfig::default()
        };
        let scheduler = Scheduler::new(MockConnector::new(), responder(), &poll);
        assert!(scheduler.interval() >= Duration::from_secs(50));
        assert!(scheduler.interval() < Duration::from_secs(120));
    }
}
