use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME: Duration = Duration::from_secs(3600);
/// Tokens this close to expiry are replaced before use.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("could not read credentials file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid service account credentials: {0}")]
    Credentials(String),

    #[error("could not sign token assertion: {0}")]
    Sign(String),

    #[error("token request failed: {0}")]
    Request(String),

    #[error("token endpoint rejected the assertion: {0}")]
    Rejected(String),
}

/// The fields of a Google service account key file this crate uses.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.into()
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        serde_json::from_str(json).map_err(|e| AuthError::Credentials(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let json = std::fs::read_to_string(path).map_err(|source| AuthError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

/// Supplies bearer tokens for Drive API requests.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String, AuthError>;
}

/// A fixed bearer token.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait::async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + REFRESH_MARGIN < self.expires_at
    }
}

/// Exchanges a signed service-account assertion for access tokens and
/// caches each one until shortly before it expires.
pub struct ServiceAccountTokens {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    scope: String,
    client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokens {
    pub fn new(key: ServiceAccountKey) -> Result<Self, AuthError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| AuthError::Credentials(format!("private_key: {e}")))?;

        Ok(Self {
            key,
            signing_key,
            scope: DRIVE_READONLY_SCOPE.into(),
            client: reqwest::Client::new(),
            cached: Mutex::new(None),
        })
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn assertion(&self) -> Result<String, AuthError> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AuthError::Sign(e.to_string()))?
            .as_secs();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME.as_secs(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| AuthError::Sign(e.to_string()))
    }

    async fn exchange(&self) -> Result<CachedToken, AuthError> {
        let assertion = self.assertion()?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Rejected(format!(
                "HTTP {}: {}",
                response.status(),
                response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown".into())
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        tracing::debug!(
            account = %self.key.client_email,
            expires_in = token.expires_in,
            "obtained access token"
        );

        Ok(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }
}

#[async_trait::async_trait]
impl TokenSource for ServiceAccountTokens {
    async fn token(&self) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let fresh = self.exchange().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_defaults_token_uri() {
        let key = ServiceAccountKey::from_json(
            r#"{"client_email":"svc@example.iam.gserviceaccount.com","private_key":"pem"}"#,
        )
        .unwrap();

        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn key_missing_email_is_credentials_error() {
        let err = ServiceAccountKey::from_json(r#"{"private_key":"pem"}"#).unwrap_err();

        assert!(matches!(err, AuthError::Credentials(_)));
    }

    #[test]
    fn bad_private_key_is_rejected_up_front() {
        let key = ServiceAccountKey::from_json(
            r#"{"client_email":"svc@example.com","private_key":"not a pem"}"#,
        )
        .unwrap();

        assert!(matches!(
            ServiceAccountTokens::new(key),
            Err(AuthError::Credentials(_))
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = ServiceAccountKey::from_file(Path::new("/nonexistent/credentials.json"))
            .unwrap_err();

        assert!(matches!(err, AuthError::Read { .. }));
    }

    #[test]
    fn token_near_expiry_is_stale() {
        let stale = CachedToken {
            value: "t".into(),
            expires_at: Instant::now() + Duration::from_secs(30),
        };
        let fresh = CachedToken {
            value: "t".into(),
            expires_at: Instant::now() + Duration::from_secs(600),
        };

        assert!(!stale.is_fresh());
        assert!(fresh.is_fresh());
    }

    #[tokio::test]
    async fn static_token_is_returned_as_is() {
        assert_eq!(StaticToken::new("abc").token().await.unwrap(), "abc");
    }
}
