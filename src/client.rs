//! Gmail API client for the thread, message and send calls the responder makes

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use google_gmail1::api;
use std::future::Future;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::{GmailHub, API_SCOPE};
use crate::config::PollConfig;
use crate::error::{AutoReplyError, Result};
use crate::models::{Header, Message, OutgoingMessage, SentMessage, Thread, ThreadSummary};

/// Headers requested when fetching a message
pub const METADATA_HEADERS: &[&str] = &["From", "Subject", "Message-ID", "References"];

/// Mail service operations used by a polling cycle
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailClient: Send + Sync {
    /// List thread ids from the first page of the mailbox
    async fn list_threads(&self) -> Result<Vec<ThreadSummary>>;

    /// Get a thread with all of its messages
    async fn get_thread(&self, id: &str) -> Result<Thread>;

    /// Get a single message with its metadata headers
    async fn get_message(&self, id: &str) -> Result<Message>;

    /// Address of the authenticated mailbox
    async fn profile_address(&self) -> Result<String>;

    /// Send a base64url-encoded MIME message into a thread
    async fn send_message(&self, message: OutgoingMessage) -> Result<SentMessage>;
}

/// Request settings for [`GmailMailClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub max_threads: u32,
    pub query: Option<String>,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::from(&PollConfig::default())
    }
}

impl From<&PollConfig> for ClientOptions {
    fn from(poll: &PollConfig) -> Self {
        Self {
            max_threads: poll.max_threads,
            query: poll.query.clone(),
            timeout: Duration::from_secs(poll.request_timeout_secs),
        }
    }
}

/// Client backed by the google-gmail1 hub
///
/// No retry, pagination or rate limiting: a failed call is reported to the
/// caller and the next polling cycle starts over.
pub struct GmailMailClient {
    hub: GmailHub,
    options: ClientOptions,
}

impl GmailMailClient {
    pub fn new(hub: GmailHub) -> Self {
        Self {
            hub,
            options: ClientOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_max_threads(mut self, max_threads: u32) -> Self {
        self.options.max_threads = max_threads;
        self
    }

    pub fn with_query(mut self, query: Option<String>) -> Self {
        self.options.query = query;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    async fn timed<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, google_gmail1::Error>>,
    {
        call_with_timeout(operation, self.options.timeout, call).await
    }
}

/// Bound an API call by `timeout`, mapping an expired call to `Network`
pub async fn call_with_timeout<T, F>(operation: &str, timeout: Duration, call: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, google_gmail1::Error>>,
{
    debug!("Calling Gmail API: {}", operation);
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(AutoReplyError::from),
        Err(_) => {
            warn!("Gmail API {} call timed out after {:?}", operation, timeout);
            Err(AutoReplyError::Network(format!(
                "{} timed out after {:?}",
                operation, timeout
            )))
        }
    }
}

#[async_trait]
impl MailClient for GmailMailClient {
    async fn list_threads(&self) -> Result<Vec<ThreadSummary>> {
        let mut call = self
            .hub
            .users()
            .threads_list("me")
            .max_results(self.options.max_threads);

        if let Some(query) = self.options.query.as_deref() {
            call = call.q(query);
        }

        let (_, response) = self
            .timed("threads.list", call.add_scope(API_SCOPE).doit())
            .await?;

        Ok(parse_thread_list(response))
    }

    async fn get_thread(&self, id: &str) -> Result<Thread> {
        let call = self
            .hub
            .users()
            .threads_get("me", id)
            .format("minimal")
            .add_scope(API_SCOPE)
            .doit();

        let (_, thread) = self.timed("threads.get", call).await?;
        parse_thread(thread)
    }

    async fn get_message(&self, id: &str) -> Result<Message> {
        let mut call = self.hub.users().messages_get("me", id).format("metadata");
        for header in METADATA_HEADERS {
            call = call.add_metadata_headers(header);
        }

        let (_, message) = self
            .timed("messages.get", call.add_scope(API_SCOPE).doit())
            .await?;

        parse_message(message)
    }

    async fn profile_address(&self) -> Result<String> {
        let call = self.hub.users().get_profile("me").add_scope(API_SCOPE).doit();
        let (_, profile) = self.timed("users.getProfile", call).await?;

        profile
            .email_address
            .ok_or_else(|| AutoReplyError::Api("Profile has no email address".to_string()))
    }

    async fn send_message(&self, message: OutgoingMessage) -> Result<SentMessage> {
        // google-gmail1 takes the MIME bytes as an rfc822 media upload and
        // the thread id as request metadata
        let mime_bytes = URL_SAFE_NO_PAD
            .decode(message.raw.as_bytes())
            .map_err(|e| AutoReplyError::Compose(format!("raw is not base64url: {}", e)))?;
        let media_type: mime::Mime = "message/rfc822"
            .parse()
            .map_err(|e| AutoReplyError::Compose(format!("Invalid media type: {}", e)))?;

        let request = api::Message {
            thread_id: Some(message.thread_id),
            ..Default::default()
        };

        let call = self
            .hub
            .users()
            .messages_send(request, "me")
            .add_scope(API_SCOPE)
            .upload(Cursor::new(mime_bytes), media_type);

        let (_, sent) = self.timed("messages.send", call).await?;

        Ok(SentMessage {
            id: sent.id,
            thread_id: sent.thread_id,
            labels: sent.label_ids.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl<T> MailClient for Arc<T>
where
    T: MailClient + ?Sized,
{
    async fn list_threads(&self) -> Result<Vec<ThreadSummary>> {
        self.as_ref().list_threads().await
    }

    async fn get_thread(&self, id: &str) -> Result<Thread> {
        self.as_ref().get_thread(id).await
    }

    async fn get_message(&self, id: &str) -> Result<Message> {
        self.as_ref().get_message(id).await
    }

    async fn profile_address(&self) -> Result<String> {
        self.as_ref().profile_address().await
    }

    async fn send_message(&self, message: OutgoingMessage) -> Result<SentMessage> {
        self.as_ref().send_message(message).await
    }
}

fn parse_thread_list(response: api::ListThreadsResponse) -> Vec<ThreadSummary> {
    response
        .threads
        .unwrap_or_default()
        .into_iter()
        .filter_map(|thread| thread.id.map(|id| ThreadSummary { id }))
        .collect()
}

fn parse_thread(thread: api::Thread) -> Result<Thread> {
    let id = thread
        .id
        .ok_or_else(|| AutoReplyError::InvalidMessage("Missing thread ID".to_string()))?;

    let messages = thread
        .messages
        .unwrap_or_default()
        .into_iter()
        .map(parse_message)
        .collect::<Result<Vec<_>>>()?;

    Ok(Thread { id, messages })
}

/// Convert a Gmail API message into our Message structure
fn parse_message(msg: api::Message) -> Result<Message> {
    let id = msg
        .id
        .ok_or_else(|| AutoReplyError::InvalidMessage("Missing message ID".to_string()))?;

    let thread_id = msg
        .thread_id
        .ok_or_else(|| AutoReplyError::InvalidMessage(format!("Message {} has no thread ID", id)))?;

    // minimal format carries no payload
    let headers = msg
        .payload
        .and_then(|p| p.headers)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|header| match (header.name, header.value) {
            (Some(name), Some(value)) => Some(Header { name, value }),
            _ => None,
        })
        .collect();

    Ok(Message {
        id,
        thread_id,
        labels: msg.label_ids.unwrap_or_default(),
        headers,
        snippet: msg.snippet,
    })
}
