//! OAuth2 authorization for the Gmail API

use async_trait::async_trait;
use google_gmail1::{hyper_rustls, hyper_util, yup_oauth2, Gmail};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use yup_oauth2::storage::{TokenInfo, TokenStorage};

use crate::credentials::{self, Credential};
use crate::error::{AutoReplyError, Result};

/// Scopes requested by the interactive grant
///
/// - gmail.readonly: list and read threads
/// - mail.google.com: full mailbox access, needed to send
pub const REQUIRED_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://mail.google.com/",
];

/// Scope attached to every API call
pub const API_SCOPE: &str = "https://mail.google.com/";

/// Type alias for Gmail Hub to simplify type signatures
pub type GmailHub = Gmail<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>;

/// Interactive authorization grant
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GrantFlow: Send + Sync {
    /// Run the grant against the client secret file and return the refresh token it produced
    async fn run(&self, client_secret_path: &Path) -> Result<Option<String>>;
}

/// Authorization-code grant via the user's browser and a local redirect listener
pub struct InstalledFlowGrant {
    scopes: Vec<String>,
}

impl InstalledFlowGrant {
    pub fn new(scopes: &[&str]) -> Self {
        Self {
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for InstalledFlowGrant {
    fn default() -> Self {
        Self::new(REQUIRED_SCOPES)
    }
}

#[async_trait]
impl GrantFlow for InstalledFlowGrant {
    async fn run(&self, client_secret_path: &Path) -> Result<Option<String>> {
        let secret = yup_oauth2::read_application_secret(client_secret_path).await?;

        let captured = CapturedToken::default();
        let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
            secret,
            yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
        )
        .with_storage(Box::new(captured.clone()))
        .build()
        .await
        .map_err(|e| AutoReplyError::Auth(format!("Failed to build authenticator: {}", e)))?;

        let scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        auth.token(&scopes)
            .await
            .map_err(|e| AutoReplyError::Auth(format!("Authorization grant failed: {}", e)))?;

        Ok(captured.refresh_token())
    }
}

/// In-memory token storage that keeps whatever the grant hands back
#[derive(Clone, Default)]
struct CapturedToken {
    slot: Arc<Mutex<Option<TokenInfo>>>,
}

impl CapturedToken {
    fn store(&self, token: TokenInfo) -> anyhow::Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("token slot poisoned"))?;
        *slot = Some(token);
        Ok(())
    }

    fn load(&self) -> Option<TokenInfo> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    fn refresh_token(&self) -> Option<String> {
        self.load().and_then(|token| token.refresh_token)
    }
}

#[async_trait]
impl TokenStorage for CapturedToken {
    async fn set(&self, _scopes: &[&str], token: TokenInfo) -> anyhow::Result<()> {
        self.store(token)
    }

    async fn get(&self, _scopes: &[&str]) -> Option<TokenInfo> {
        self.load()
    }
}

/// Produces a credential from the token file, falling back to the grant flow
pub struct Authenticator {
    client_secret_path: PathBuf,
    token_path: PathBuf,
    grant: Box<dyn GrantFlow>,
}

impl Authenticator {
    pub fn new(
        client_secret_path: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
        grant: Box<dyn GrantFlow>,
    ) -> Self {
        Self {
            client_secret_path: client_secret_path.into(),
            token_path: token_path.into(),
            grant,
        }
    }

    /// Authenticator using the browser-based installed flow
    pub fn installed(client_secret_path: impl Into<PathBuf>, token_path: impl Into<PathBuf>) -> Self {
        Self::new(
            client_secret_path,
            token_path,
            Box::new(InstalledFlowGrant::default()),
        )
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// Return the saved credential, or run the grant and save what it produces
    ///
    /// A saved credential is returned without checking whether its refresh
    /// token is still valid; a revoked token surfaces on the next API call.
    pub async fn authorize(&self) -> Result<Credential> {
        if let Some(credential) = credentials::load_saved_credentials_if_exist(&self.token_path).await {
            debug!("Using saved credential from {:?}", self.token_path);
            return Ok(credential);
        }

        info!("No saved credential, starting authorization grant");
        let refresh_token = self.grant.run(&self.client_secret_path).await?;

        match refresh_token {
            Some(refresh_token) => {
                credentials::save_credentials(
                    &self.client_secret_path,
                    &self.token_path,
                    &refresh_token,
                )
                .await
            }
            None => Err(AutoReplyError::Auth(
                "Authorization grant returned no refresh token".to_string(),
            )),
        }
    }
}

/// Build a Gmail hub that refreshes access tokens from the stored credential
pub async fn build_gmail_hub(credential: &Credential) -> Result<GmailHub> {
    let secret = yup_oauth2::authorized_user::AuthorizedUserSecret {
        client_id: credential.client_id.clone(),
        client_secret: credential.client_secret.clone(),
        refresh_token: credential.refresh_token.clone(),
        key_type: credential.credential_type.clone(),
    };

    let auth = yup_oauth2::AuthorizedUserAuthenticator::builder(secret)
        .build()
        .await
        .map_err(|e| AutoReplyError::Auth(format!("Failed to build authenticator: {}", e)))?;

    // Use HTTP/1 for compatibility (HTTP/1 works better with google-gmail1)
    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| AutoReplyError::Auth(format!("Failed to load TLS roots: {}", e)))?
                .https_or_http()
                .enable_http1()
                .build(),
        );

    Ok(Gmail::new(client, auth))
}
