//! Gmail Auto-Responder
//!
//! Polls a Gmail mailbox and sends a canned reply to every thread that has
//! neither a sent message nor a draft in it.
//!
//! # Overview
//!
//! - **Authentication**: OAuth2 installed-app grant, refresh token stored as
//!   an authorized-user record
//! - **Reading**: thread list, thread and message fetches through `google-gmail1`
//! - **Decision**: SENT/DRAFT label check and From-address extraction
//! - **Composition**: multipart/alternative reply, base64url for the send API
//! - **Scheduling**: one cycle at startup, then a randomized fixed interval
//!
//! # Example Usage
//!
//! ```no_run
//! use gmail_autoresponder::{
//!     auth::Authenticator,
//!     config::Config,
//!     scheduler::{GmailConnector, Responder, Scheduler},
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("autoresponder.toml".as_ref()).await?;
//!
//!     let authenticator =
//!         Authenticator::installed(&config.auth.credentials_path, &config.auth.token_path);
//!     let connector = GmailConnector::new(authenticator, config.poll.clone());
//!     let responder = Responder::new(config.reply.clone(), config.poll.max_concurrent_replies);
//!
//!     let scheduler = Scheduler::new(connector, responder, &config.poll);
//!     scheduler.run(async { let _ = tokio::signal::ctrl_c().await; }).await;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 grant flow and Gmail hub construction
//! - [`cli`] - Command-line interface
//! - [`client`] - Gmail API calls behind the [`client::MailClient`] trait
//! - [`composer`] - MIME reply composition and base64url encoding
//! - [`config`] - Configuration management
//! - [`credentials`] - Authorized-user token file
//! - [`decision`] - Reply decision and sender extraction
//! - [`error`] - Error types and result aliases
//! - [`models`] - Core data structures
//! - [`scheduler`] - Polling loop and per-cycle processing

pub mod auth;
pub mod cli;
pub mod client;
pub mod composer;
pub mod config;
pub mod credentials;
pub mod decision;
pub mod error;
pub mod models;
pub mod scheduler;

// Re-export commonly used types for convenience
pub use error::{AutoReplyError, Result};

pub use models::{
    CycleReport, Header, Message, OutgoingMessage, ReplyOptions, SentMessage, TextEncoding,
    Thread, ThreadOutcome, ThreadSummary,
};

pub use auth::{Authenticator, GrantFlow, InstalledFlowGrant};
pub use client::{ClientOptions, GmailMailClient, MailClient};
pub use config::{AuthConfig, Config, PollConfig, ReplyConfig};
pub use credentials::Credential;
pub use scheduler::{Connector, GmailConnector, Responder, Scheduler};

pub use cli::{Cli, Commands};
