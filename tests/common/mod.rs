//! Common test utilities and fixtures

#![allow(dead_code)]

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use gmail_autoresponder::client::MailClient;
use gmail_autoresponder::error::Result;
use gmail_autoresponder::models::{
    Header, Message, OutgoingMessage, SentMessage, Thread, ThreadSummary,
};
use mockall::mock;
use std::path::Path;

/// Create a message with the given labels and no headers
pub fn create_test_message(id: &str, thread_id: &str, labels: &[&str]) -> Message {
    Message {
        id: id.to_string(),
        thread_id: thread_id.to_string(),
        labels: labels.iter().map(|l| l.to_string()).collect(),
        headers: Vec::new(),
        snippet: None,
    }
}

/// Create an incoming message carrying the headers a reply is built from
pub fn create_incoming_message(id: &str, thread_id: &str, from: &str, subject: &str) -> Message {
    let mut message = create_test_message(id, thread_id, &["INBOX", "UNREAD"]);
    message.headers = vec![
        Header::new("From", from),
        Header::new("Subject", subject),
        Header::new("Message-ID", format!("<{}@mail.example.com>", id)),
    ];
    message
}

/// Create a thread whose messages carry the given label sets, in order
pub fn create_test_thread(id: &str, label_sets: &[&[&str]]) -> Thread {
    Thread {
        id: id.to_string(),
        messages: label_sets
            .iter()
            .enumerate()
            .map(|(i, labels)| create_test_message(&format!("{}_m{}", id, i), id, labels))
            .collect(),
    }
}

pub fn thread_summaries(ids: &[&str]) -> Vec<ThreadSummary> {
    ids.iter()
        .map(|id| ThreadSummary { id: id.to_string() })
        .collect()
}

/// Echo what the send API returns for a successful send
pub fn sent_response(outgoing: &OutgoingMessage) -> SentMessage {
    SentMessage {
        id: Some(format!("sent_{}", outgoing.thread_id)),
        thread_id: Some(outgoing.thread_id.clone()),
        labels: vec!["SENT".to_string()],
    }
}

/// Decode the `raw` field back into MIME text
pub fn decode_raw(outgoing: &OutgoingMessage) -> String {
    let bytes = URL_SAFE_NO_PAD
        .decode(outgoing.raw.as_bytes())
        .expect("raw should be base64url");
    String::from_utf8(bytes).expect("MIME should be ASCII")
}

/// Write an installed-app client secret like the one Google Cloud Console exports
pub async fn write_client_secret(path: &Path) {
    let secret = serde_json::json!({
        "installed": {
            "client_id": "test-client.apps.googleusercontent.com",
            "project_id": "autoresponder-test",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_secret": "test-secret",
            "redirect_uris": ["http://localhost"]
        }
    });
    tokio::fs::write(path, secret.to_string()).await.unwrap();
}

/// Write a stored authorized-user token
pub async fn write_token(path: &Path, refresh_token: &str) {
    let token = serde_json::json!({
        "type": "authorized_user",
        "client_id": "test-client.apps.googleusercontent.com",
        "client_secret": "test-secret",
        "refresh_token": refresh_token
    });
    tokio::fs::write(path, token.to_string()).await.unwrap();
}

// Mock implementation of MailClient for testing
mock! {
    pub MailClient {}

    #[async_trait::async_trait]
    impl MailClient for MailClient {
        async fn list_threads(&self) -> Result<Vec<ThreadSummary>>;
        async fn get_thread(&self, id: &str) -> Result<Thread>;
        async fn get_message(&self, id: &str) -> Result<Message>;
        async fn profile_address(&self) -> Result<String>;
        async fn send_message(&self, message: OutgoingMessage) -> Result<SentMessage>;
    }
}
