//! GitHub App JWT authentication, used by [`crate::github::GitHubForgeAdapter`]
//! to mint short-lived installation tokens.

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::Error;

#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    iat: u64,
    exp: u64,
    iss: u64,
}

/// Builds an authenticated client for a GitHub App, optionally exchanged for
/// an installation access token when `installation_id` is given.
pub async fn create_app_client(
    app_id: u64,
    private_key: &str,
    installation_id: Option<u64>,
) -> Result<Octocrab, Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::AuthError(e.to_string()))?
        .as_secs();

    let claims = JwtClaims {
        iat: now - 60,
        exp: now + (10 * 60),
        iss: app_id,
    };

    let encoding_key = EncodingKey::from_rsa_pem(private_key.as_bytes())
        .map_err(|e| Error::AuthError(format!("invalid private key: {e}")))?;

    let jwt = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| Error::AuthError(format!("failed to create JWT: {e}")))?;

    let app_client = Octocrab::builder()
        .personal_token(jwt)
        .build()
        .map_err(|e| Error::AuthError(format!("failed to build octocrab instance: {e}")))?;

    let Some(installation_id) = installation_id else {
        return Ok(app_client);
    };

    let installation_token = app_client
        .installation_and_token(octocrab::models::InstallationId(installation_id))
        .await
        .map_err(|e| {
            Error::AuthError(format!(
                "failed to create installation token for {installation_id}: {e}"
            ))
        })?
        .1;

    create_token_client(&installation_token.token)
}

/// Builds a client authenticated with a plain personal access token, used in
/// CLI/dev contexts where no GitHub App installation is configured.
pub fn create_token_client(token: &str) -> Result<Octocrab, Error> {
    Octocrab::builder()
        .personal_token(token.to_string())
        .build()
        .map_err(|e| Error::AuthError(format!("failed to build octocrab instance: {e}")))
}
