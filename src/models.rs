use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label Gmail puts on messages the mailbox owner sent
pub const LABEL_SENT: &str = "SENT";

/// Label Gmail puts on unsent drafts
pub const LABEL_DRAFT: &str = "DRAFT";

/// Thread reference as returned by the thread list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub id: String,
}

/// A conversation with its messages in server order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub labels: Vec<String>,
    pub headers: Vec<Header>,
    pub snippet: Option<String>,
}

impl Message {
    /// First header with the given name, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// Transfer encoding applied to the text and HTML parts of a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    #[default]
    Base64,
    QuotedPrintable,
    #[serde(rename = "7bit")]
    SevenBit,
    #[serde(rename = "8bit")]
    EightBit,
}

/// Everything needed to compose one auto-reply
#[derive(Debug, Clone)]
pub struct ReplyOptions {
    pub from: String,
    pub to: String,
    pub reply_to: String,
    pub in_reply_to: String,
    pub references: Option<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub text_encoding: TextEncoding,
}

/// Payload for the send call: base64url MIME plus the thread it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub raw: String,
    pub thread_id: String,
}

/// What the send call reported back
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentMessage {
    pub id: Option<String>,
    pub thread_id: Option<String>,
    pub labels: Vec<String>,
}

/// Outcome of processing a single thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadOutcome {
    /// Thread already has a sent message or draft
    AlreadyHandled,
    /// Reply composed but not sent (dry run)
    DryRun { to: String },
    Replied { to: String },
}

#[derive(Debug, Clone)]
pub struct ThreadFailure {
    pub thread_id: String,
    pub error: String,
}

/// Aggregate result of one polling cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub threads_seen: usize,
    pub replies_sent: usize,
    pub skipped: usize,
    pub failures: Vec<ThreadFailure>,
}

impl CycleReport {
    pub fn new() -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            started_at: Utc::now(),
            threads_seen: 0,
            replies_sent: 0,
            skipped: 0,
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, thread_id: &str, outcome: crate::error::Result<ThreadOutcome>) {
        match outcome {
            Ok(ThreadOutcome::Replied { .. }) => self.replies_sent += 1,
            Ok(ThreadOutcome::AlreadyHandled) | Ok(ThreadOutcome::DryRun { .. }) => {
                self.skipped += 1
            }
            Err(e) => self.failures.push(ThreadFailure {
                thread_id: thread_id.to_string(),
                error: e.to_string(),
            }),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Default for CycleReport {
    fn default() -> Self {
        Self::new()
    }
}
