//! Access token provider.

use secrecy::ExposeSecret as _;

use crate::{CredentialError, Credentials, ServiceAccount};

/// OAuth2 scope for sending FCM messages.
pub const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertion lifetime in seconds, the maximum Google accepts.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// A cached token is reused only while it has more than this many seconds left.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Source of bearer tokens for the messaging transport.
#[trait_variant::make(Send)]
pub trait CredentialProvider: Send + Sync {
    /// Get a bearer token valid for at least the next minute.
    async fn access_token(&self) -> Result<String, CredentialError>;
}

#[derive(serde::Serialize)]
struct Claims<'a> {
    iss: &'a str,
    sub: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    access_token: String,
    expires_at: chrono::DateTime<chrono::Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.expires_at - now > chrono::Duration::seconds(EXPIRY_SKEW_SECS)
    }
}

/// Sign the RS256 JWT assertion exchanged for an access token.
pub fn sign_assertion(
    account: &ServiceAccount,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<String, CredentialError> {
    let key = jsonwebtoken::EncodingKey::from_rsa_pem(account.private_key().expose_secret().as_bytes())
        .map_err(|e| CredentialError::InvalidCredentials(format!("bad private key: {e}")))?;

    let claims = Claims {
        iss: &account.client_email,
        sub: &account.client_email,
        scope: FCM_SCOPE,
        aud: &account.token_uri,
        iat: now.timestamp(),
        exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
    };

    let header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
    jsonwebtoken::encode(&header, &claims, &key).map_err(|e| CredentialError::Signing(e.to_string()))
}

/// Credential provider backed by a service account key.
///
/// Holds one cached token; concurrent callers wait on the same refresh
/// instead of each exchanging their own assertion.
pub struct ServiceAccountProvider {
    credentials: Credentials,
    client: reqwest::Client,
    cache: tokio::sync::Mutex<Option<CachedToken>>,
}

impl ServiceAccountProvider {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_client(credentials, reqwest::Client::new())
    }

    pub fn with_client(credentials: Credentials, client: reqwest::Client) -> Self {
        Self {
            credentials,
            client,
            cache: tokio::sync::Mutex::new(None),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    async fn exchange(&self, account: &ServiceAccount) -> Result<CachedToken, CredentialError> {
        let now = chrono::Utc::now();
        let assertion = sign_assertion(account, now)?;

        let response = self
            .client
            .post(&account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| CredentialError::TokenRequest(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::TokenRequest(format!("HTTP {status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CredentialError::TokenResponse(e.to_string()))?;

        if token.access_token.is_empty() {
            return Err(CredentialError::TokenResponse("empty access_token".into()));
        }

        tracing::debug!(expires_in = token.expires_in, "obtained FCM access token");

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + chrono::Duration::seconds(token.expires_in),
        })
    }
}

impl CredentialProvider for ServiceAccountProvider {
    async fn access_token(&self) -> Result<String, CredentialError> {
        let account = self.credentials.account()?;

        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh(chrono::Utc::now())) {
            return Ok(cached.access_token.clone());
        }

        let fresh = self.exchange(account).await?;
        let token = fresh.access_token.clone();
        *cache = Some(fresh);

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PRIVATE_KEY: &str = include_str!("../tests/fixtures/test-key.pem");
    const PUBLIC_KEY: &str = include_str!("../tests/fixtures/test-key.pub.pem");

    fn account(token_uri: &str) -> ServiceAccount {
        ServiceAccount::new("push@cinema-app.iam.gserviceaccount.com", PRIVATE_KEY)
            .with_token_uri(token_uri)
    }

    async fn token_server(expires_in: i64, expected_calls: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains(
                "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
            ))
            .and(body_string_contains("assertion="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.test-token",
                "expires_in": expires_in,
                "token_type": "Bearer",
            })))
            .expect(expected_calls)
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn test_assertion_claims() {
        let account = account("https://oauth2.example/token");
        let now = chrono::Utc::now();
        let jwt = sign_assertion(&account, now).unwrap();

        let key = jsonwebtoken::DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap();
        let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::RS256);
        validation.set_audience(&["https://oauth2.example/token"]);
        let decoded = jsonwebtoken::decode::<serde_json::Value>(&jwt, &key, &validation).unwrap();

        let claims = decoded.claims;
        assert_eq!(claims["iss"], "push@cinema-app.iam.gserviceaccount.com");
        assert_eq!(claims["sub"], claims["iss"]);
        assert_eq!(claims["scope"], FCM_SCOPE);
        assert_eq!(claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap(), 3600);
    }

    #[test]
    fn test_bad_private_key() {
        let account = ServiceAccount::new("a@b", "not a key");
        let err = sign_assertion(&account, chrono::Utc::now()).unwrap_err();
        assert!(matches!(err, CredentialError::InvalidCredentials(_)));
    }

    #[tokio::test]
    async fn test_token_is_cached() {
        let server = token_server(3600, 1).await;
        let provider =
            ServiceAccountProvider::new(account(&format!("{}/token", server.uri())).into());

        assert_eq!(provider.access_token().await.unwrap(), "ya29.test-token");
        assert_eq!(provider.access_token().await.unwrap(), "ya29.test-token");
    }

    #[tokio::test]
    async fn test_nearly_expired_token_is_refreshed() {
        let server = token_server(30, 2).await;
        let provider =
            ServiceAccountProvider::new(account(&format!("{}/token", server.uri())).into());

        provider.access_token().await.unwrap();
        provider.access_token().await.unwrap();
    }

    #[tokio::test]
    async fn test_token_endpoint_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
            .mount(&server)
            .await;

        let provider =
            ServiceAccountProvider::new(account(&format!("{}/token", server.uri())).into());
        let err = provider.access_token().await.unwrap_err();

        match err {
            CredentialError::TokenRequest(msg) => assert!(msg.contains("invalid_grant")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unconfigured() {
        let provider = ServiceAccountProvider::new(Credentials::Missing);
        assert_eq!(
            provider.access_token().await.unwrap_err(),
            CredentialError::NotConfigured
        );

        let provider = ServiceAccountProvider::new(Credentials::Invalid("malformed JSON".into()));
        assert_eq!(
            provider.access_token().await.unwrap_err(),
            CredentialError::InvalidCredentials("malformed JSON".into())
        );
    }
}
