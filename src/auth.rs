//! OAuth2 credential provider for the Gmail API
//!
//! Tokens are cached on disk by the installed-app authenticator: a valid
//! cached token is reused, an expired one is refreshed, and the interactive
//! consent flow runs only when neither is possible.

use google_gmail1::{hyper_rustls, hyper_util, yup_oauth2, Gmail};
use std::path::Path;

use crate::error::{CleanupError, Result};
use crate::models::{Rule, RuleAction};

/// List and move-to-trash access; cannot delete permanently
pub const MODIFY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";

/// Full mailbox access, required by `users.messages.batchDelete`
pub const FULL_ACCESS_SCOPE: &str = "https://mail.google.com/";

/// Type alias for Gmail Hub to simplify type signatures
pub type GmailHub =
    Gmail<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>;

/// Narrowest scope that covers every configured action
pub fn required_scope(rules: &[Rule]) -> &'static str {
    if rules.iter().any(|r| r.action == RuleAction::Delete) {
        FULL_ACCESS_SCOPE
    } else {
        MODIFY_SCOPE
    }
}

/// Initialize Gmail API hub with OAuth2 authentication
///
/// This function sets up the complete Gmail API client with:
/// - OAuth2 authentication using InstalledFlow (desktop app flow)
/// - Token persistence to `token_cache_path` for automatic refresh
/// - HTTP/1 client with TLS support
///
/// A token for `scope` is obtained eagerly so authentication problems
/// surface before any mailbox call.
pub async fn initialize_gmail_hub(
    credentials_path: &Path,
    token_cache_path: &Path,
    scope: &str,
) -> Result<GmailHub> {
    let secret = yup_oauth2::read_application_secret(credentials_path)
        .await
        .map_err(|e| {
            CleanupError::AuthError(format!(
                "Failed to read credentials from {:?}: {}",
                credentials_path, e
            ))
        })?;

    if let Some(parent) = token_cache_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    // HTTPRedirect opens a browser for user authorization
    let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
        secret,
        yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
    )
    .persist_tokens_to_disk(token_cache_path)
    .build()
    .await
    .map_err(|e| CleanupError::AuthError(format!("Failed to build authenticator: {}", e)))?;

    auth.token(&[scope])
        .await
        .map_err(|e| CleanupError::AuthError(format!("Failed to obtain token: {}", e)))?;

    if token_cache_path.exists() {
        secure_token_file(token_cache_path).await?;
    }
    tracing::debug!("Token for {} cached at {:?}", scope, token_cache_path);

    // HTTP/1 works better with google-gmail1 than the HTTP/2 default
    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| CleanupError::AuthError(format!("Failed to load TLS roots: {}", e)))?
                .https_or_http()
                .enable_http1()
                .build(),
        );

    Ok(Gmail::new(client, auth))
}

/// Restrict the token cache to its owner (0600)
#[cfg(unix)]
pub async fn secure_token_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

#[cfg(not(unix))]
pub async fn secure_token_file(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_required_scope_trash_only() {
        let rules = vec![Rule::new("promos", "category:promotions")];
        assert_eq!(required_scope(&rules), MODIFY_SCOPE);
        assert_eq!(required_scope(&[]), MODIFY_SCOPE);
    }

    #[test]
    fn test_required_scope_with_delete() {
        let rules = vec![
            Rule::new("promos", "category:promotions"),
            Rule::new("spam", "in:spam").with_action(RuleAction::Delete),
        ];
        assert_eq!(required_scope(&rules), FULL_ACCESS_SCOPE);
    }

    #[tokio::test]
    async fn test_secure_token_file() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "{}").await.unwrap();

        secure_token_file(temp_file.path()).await.unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = tokio::fs::metadata(temp_file.path()).await.unwrap();
            assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_missing_credentials_is_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = initialize_gmail_hub(
            &dir.path().join("missing-credentials.json"),
            &dir.path().join("token.json"),
            MODIFY_SCOPE,
        )
        .await;

        assert!(matches!(result, Err(CleanupError::AuthError(_))));
    }
}
