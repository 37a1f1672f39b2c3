//! Credential acquisition for session connects.
//!
//! The voice core never embeds long-lived secrets client-side: the
//! production path asks a trusted server-side collaborator for a
//! short-lived token at session start. Tokens are held in memory only
//! and never logged.

use async_trait::async_trait;
use serde::Deserialize;

use mkedev_live::Credential;

/// A credential plus the model the issuer wants the session to use.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub credential: Credential,
    pub model: String,
}

/// Source of connection credentials.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn issue(&self) -> anyhow::Result<IssuedCredential>;
}

/// Fetches an ephemeral token from a trusted token endpoint.
pub struct HttpCredentialProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpCredentialProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
    model: String,
}

#[async_trait]
impl CredentialProvider for HttpCredentialProvider {
    async fn issue(&self) -> anyhow::Result<IssuedCredential> {
        let response = self
            .client
            .post(&self.url)
            .send()
            .await?
            .error_for_status()?;
        let body: TokenResponse = response.json().await?;
        Ok(IssuedCredential {
            credential: Credential::ephemeral(body.token),
            model: body.model,
        })
    }
}

/// Reads a long-lived API key from the environment. Development only;
/// production sessions go through [`HttpCredentialProvider`].
pub struct EnvCredentialProvider {
    var: String,
    model: String,
}

impl EnvCredentialProvider {
    pub fn new(var: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn issue(&self) -> anyhow::Result<IssuedCredential> {
        let token = std::env::var(&self.var)
            .map_err(|_| anyhow::anyhow!("environment variable {} is not set", self.var))?;
        Ok(IssuedCredential {
            credential: Credential::long_lived(token),
            model: self.model.clone(),
        })
    }
}
