//! Authentication for the image annotation API.
//!
//! Either a static API key or a service account. Service account
//! authentication self-signs a JWT and exchanges it for a short lived
//! access token which is cached until it is about to expire.

use std::time::{Duration, Instant};

use config::ClassifierCredentials;
use error_stack::{Result, ResultExt};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use model::UnixTime;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;
use utils::ContextExt;

use crate::ClassifierError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const CLOUD_VISION_SCOPE: &str = "https://www.googleapis.com/auth/cloud-vision";
const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Validity time requested for the self-signed JWT. This is also the
/// maximum the token endpoint accepts.
const ASSERTION_VALIDITY_SECONDS: u32 = 60 * 60;

/// Cached access token is refreshed when less than this time is left.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    private_key_id: Option<String>,
    token_uri: Option<String>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    assertion: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    access_token: String,
    valid_until_this: Instant,
}

pub struct ServiceAccountTokenSource {
    client: reqwest::Client,
    client_email: String,
    key_id: Option<String>,
    key: EncodingKey,
    token_uri: Url,
    token: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    /// Parse service account JSON. Fails if `client_email` or
    /// `private_key` is missing or the key is not a RSA PEM key.
    pub fn new(
        service_account_json: &str,
        client: reqwest::Client,
    ) -> Result<Self, ClassifierError> {
        let account: ServiceAccountKey = serde_json::from_str(service_account_json)
            .change_context(ClassifierError::InvalidCredentials)
            .attach_printable("Service account JSON parsing failed")?;

        if account.client_email.trim().is_empty() {
            return Err(ClassifierError::InvalidCredentials.report())
                .attach_printable("Service account client_email is empty");
        }

        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .change_context(ClassifierError::InvalidCredentials)
            .attach_printable("Service account private_key is not a valid RSA PEM key")?;

        let token_uri = account
            .token_uri
            .as_deref()
            .unwrap_or(DEFAULT_TOKEN_URI);
        let token_uri = Url::parse(token_uri)
            .change_context(ClassifierError::InvalidCredentials)
            .attach_printable("Service account token_uri is invalid")?;

        Ok(Self {
            client,
            client_email: account.client_email,
            key_id: account.private_key_id,
            key,
            token_uri,
            token: Mutex::new(None),
        })
    }

    pub async fn access_token(&self) -> Result<String, ClassifierError> {
        let mut token = self.token.lock().await;
        if let Some(cached) = token.as_ref() {
            if Instant::now() < cached.valid_until_this {
                return Ok(cached.access_token.clone());
            }
        }

        let new_token = self.request_access_token().await?;
        let access_token = new_token.access_token.clone();
        *token = Some(new_token);
        Ok(access_token)
    }

    fn create_assertion(&self) -> Result<String, ClassifierError> {
        let now = UnixTime::current_time();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: CLOUD_VISION_SCOPE,
            aud: self.token_uri.as_str(),
            iat: now.ut,
            exp: now.add_seconds(ASSERTION_VALIDITY_SECONDS).ut,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();

        jsonwebtoken::encode(&header, &claims, &self.key)
            .change_context(ClassifierError::TokenRequest)
            .attach_printable("JWT signing failed")
    }

    async fn request_access_token(&self) -> Result<CachedToken, ClassifierError> {
        let assertion = self.create_assertion()?;
        let body = serde_urlencoded::to_string(TokenRequest {
            grant_type: JWT_BEARER_GRANT_TYPE,
            assertion: &assertion,
        })
        .change_context(ClassifierError::TokenRequest)?;

        let response = self
            .client
            .post(self.token_uri.clone())
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await
            .change_context(ClassifierError::TokenRequest)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::TokenRequest.report())
                .attach_printable(format!("Status: {status}, response: {text}"));
        }

        let token: TokenResponse = response
            .json()
            .await
            .change_context(ClassifierError::TokenRequest)?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        let valid_until_this = Instant::now()
            .checked_add(lifetime)
            .ok_or(ClassifierError::TokenRequest)?;

        debug!("New access token received, expires in {} seconds", token.expires_in);

        Ok(CachedToken {
            access_token: token.access_token,
            valid_until_this,
        })
    }
}

pub enum VisionAuth {
    ApiKey(String),
    ServiceAccount(ServiceAccountTokenSource),
}

impl VisionAuth {
    pub fn new(
        credentials: &ClassifierCredentials,
        client: reqwest::Client,
    ) -> Result<Self, ClassifierError> {
        match credentials {
            ClassifierCredentials::ApiKey(key) => {
                if key.trim().is_empty() {
                    Err(ClassifierError::InvalidCredentials.report())
                        .attach_printable("API key is empty")
                } else {
                    Ok(Self::ApiKey(key.clone()))
                }
            }
            ClassifierCredentials::ServiceAccountJson(json) => Ok(Self::ServiceAccount(
                ServiceAccountTokenSource::new(json, client)?,
            )),
        }
    }

    /// Add authentication to the annotation request.
    pub async fn authenticate(
        &self,
        mut url: Url,
        client: &reqwest::Client,
    ) -> Result<reqwest::RequestBuilder, ClassifierError> {
        match self {
            Self::ApiKey(key) => {
                url.query_pairs_mut().append_pair("key", key);
                Ok(client.post(url))
            }
            Self::ServiceAccount(source) => {
                let token = source.access_token().await?;
                Ok(client.post(url).bearer_auth(token))
            }
        }
    }
}
