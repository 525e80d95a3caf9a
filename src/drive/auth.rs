//! Bearer tokens for Drive requests.
//!
//! Production servers authenticate as a service account: a JWT signed with the
//! account's private key is exchanged for a short-lived access token, which is
//! cached until shortly before it expires.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use super::{DriveError, DriveResult};

/// Default Google OAuth2 token URL.
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Tokens are refreshed this many seconds before they expire.
pub const TOKEN_EXPIRY_BUFFER_SECONDS: i64 = 300;

pub const JWT_LIFETIME_SECONDS: i64 = 3600;

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: SecretString,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(
        token: impl Into<String>,
        token_type: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token: SecretString::new(token.into()),
            token_type: token_type.into(),
            expires_at,
        }
    }

    pub fn needs_refresh(&self) -> bool {
        Utc::now() >= self.expires_at - Duration::seconds(TOKEN_EXPIRY_BUFFER_SECONDS)
    }

    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.token.expose_secret())
    }
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> DriveResult<AccessToken>;
}

/// Fixed bearer token, for tests and pre-issued tokens.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> DriveResult<AccessToken> {
        Ok(AccessToken::new(
            self.0.clone(),
            "Bearer",
            Utc::now() + Duration::seconds(JWT_LIFETIME_SECONDS),
        ))
    }
}

/// Fields read from a service-account key file.
#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: SecretString,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

pub struct ServiceAccountAuth {
    client_email: String,
    private_key: SecretString,
    private_key_id: Option<String>,
    scopes: Vec<String>,
    token_url: String,
    cached_token: Arc<RwLock<Option<AccessToken>>>,
    http_client: Client,
}

impl ServiceAccountAuth {
    pub fn new(
        client_email: impl Into<String>,
        private_key: SecretString,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            client_email: client_email.into(),
            private_key,
            private_key_id: None,
            scopes,
            token_url: TOKEN_URL.to_string(),
            cached_token: Arc::new(RwLock::new(None)),
            http_client: Client::new(),
        }
    }

    /// Loads a service-account JSON key file.
    pub async fn from_file(path: &Path, scopes: Vec<String>) -> DriveResult<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DriveError::Credentials(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&contents, scopes)
    }

    pub fn from_json(json: &str, scopes: Vec<String>) -> DriveResult<Self> {
        let key: ServiceAccountKey = serde_json::from_str(json)
            .map_err(|e| DriveError::Credentials(format!("malformed service account key: {}", e)))?;

        let mut auth = Self::new(key.client_email, key.private_key, scopes);
        auth.private_key_id = key.private_key_id;
        if let Some(token_uri) = key.token_uri {
            auth.token_url = token_uri;
        }
        Ok(auth)
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    fn create_jwt(&self) -> DriveResult<String> {
        #[derive(Serialize)]
        struct Claims<'a> {
            iss: &'a str,
            scope: String,
            aud: &'a str,
            exp: i64,
            iat: i64,
        }

        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: self.scopes.join(" "),
            aud: &self.token_url,
            exp: now + JWT_LIFETIME_SECONDS,
            iat: now,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.private_key.expose_secret().as_bytes())
            .map_err(|e| DriveError::Auth(format!("Invalid private key: {}", e)))?;

        encode(&header, &claims, &key)
            .map_err(|e| DriveError::Auth(format!("JWT encoding failed: {}", e)))
    }

    async fn exchange_jwt(&self) -> DriveResult<AccessToken> {
        #[derive(Serialize)]
        struct TokenRequest<'a> {
            grant_type: &'a str,
            assertion: &'a str,
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            #[serde(default = "bearer")]
            token_type: String,
            expires_in: i64,
        }

        fn bearer() -> String {
            "Bearer".to_string()
        }

        let jwt = self.create_jwt()?;
        let response = self
            .http_client
            .post(&self.token_url)
            .form(&TokenRequest {
                grant_type: "urn:ietf:params:oauth:grant-type:jwt-bearer",
                assertion: &jwt,
            })
            .send()
            .await
            .map_err(|e| DriveError::Auth(format!("token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(DriveError::Auth(format!(
                "token exchange failed with status {}: {}",
                status, text
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| DriveError::Auth(format!("failed to parse token response: {}", e)))?;

        debug!(
            account = %self.client_email,
            expires_in = token.expires_in,
            "Obtained access token"
        );

        let expires_at = Duration::try_seconds(token.expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                DriveError::Auth(format!("token lifetime out of range: {}", token.expires_in))
            })?;

        Ok(AccessToken::new(token.access_token, token.token_type, expires_at))
    }
}

#[async_trait]
impl TokenSource for ServiceAccountAuth {
    async fn access_token(&self) -> DriveResult<AccessToken> {
        if let Some(token) = self.cached_token.read().await.as_ref() {
            if !token.needs_refresh() {
                return Ok(token.clone());
            }
        }

        let mut cached = self.cached_token.write().await;
        if let Some(token) = cached.as_ref() {
            if !token.needs_refresh() {
                return Ok(token.clone());
            }
        }
        let token = self.exchange_jwt().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}
