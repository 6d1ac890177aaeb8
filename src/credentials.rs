//! Persistent storage for the authorized-user credential
//!
//! The token file holds the record Google's client libraries call an
//! "authorized user": the OAuth client id and secret plus a long-lived
//! refresh token. It is written after an interactive grant and read on every
//! cycle, so a running service never has to open a browser again.

use google_gmail1::yup_oauth2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::error::Result;

/// Value of the `type` field for authorized-user records
pub const AUTHORIZED_USER: &str = "authorized_user";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "type")]
    pub credential_type: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl Credential {
    pub fn authorized_user(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            credential_type: AUTHORIZED_USER.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
        }
    }

    fn is_usable(&self) -> bool {
        self.credential_type == AUTHORIZED_USER
            && !self.client_id.is_empty()
            && !self.client_secret.is_empty()
            && !self.refresh_token.is_empty()
    }
}

// Secrets stay out of log output
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("credential_type", &self.credential_type)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Load the stored credential, or `None` if the file is missing or unusable
pub async fn load_saved_credentials_if_exist(token_path: &Path) -> Option<Credential> {
    let content = match tokio::fs::read_to_string(token_path).await {
        Ok(content) => content,
        Err(e) => {
            debug!("No saved credential at {:?}: {}", token_path, e);
            return None;
        }
    };

    match serde_json::from_str::<Credential>(&content) {
        Ok(credential) if credential.is_usable() => Some(credential),
        Ok(_) => {
            debug!("Saved credential at {:?} is not an authorized-user record", token_path);
            None
        }
        Err(e) => {
            debug!("Saved credential at {:?} is malformed: {}", token_path, e);
            None
        }
    }
}

/// Write an authorized-user record built from the client secret file and a refresh token
///
/// The client secret file may use either the `installed` or `web` layout.
/// Any existing token file is overwritten.
pub async fn save_credentials(
    client_secret_path: &Path,
    token_path: &Path,
    refresh_token: &str,
) -> Result<Credential> {
    let secret = yup_oauth2::read_application_secret(client_secret_path).await?;
    let credential = Credential::authorized_user(secret.client_id, secret.client_secret, refresh_token);

    if let Some(parent) = token_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let payload = serde_json::to_string(&credential)?;
    tokio::fs::write(token_path, payload).await?;
    secure_token_file(token_path).await?;

    info!("Saved credential to {:?}", token_path);
    Ok(credential)
}

/// Remove the stored credential so the next authorization runs the grant flow
pub async fn forget_credentials(token_path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(token_path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Sets file permissions to 0600 (read/write for owner only)
#[cfg(unix)]
pub async fn secure_token_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

/// Windows uses ACLs; the file inherits the directory's permissions
#[cfg(windows)]
pub async fn secure_token_file(_path: &Path) -> Result<()> {
    Ok(())
}
