use std::sync::Mutex;
use std::time::{Duration, Instant};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::sync::credentials::ServiceAccountKey;
use crate::sync::document;
use crate::utils::error::{AppError, Result};

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com";
const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: u64 = 3600;
// Refresh before the server-side expiry so in-flight requests never race it.
const TOKEN_SLACK_SECS: u64 = 60;

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
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

enum Auth {
    /// Sign a service-account JWT and trade it for a short-lived bearer
    /// token, cached until shortly before expiry.
    ServiceAccount {
        key: ServiceAccountKey,
        cached: Mutex<Option<CachedToken>>,
    },
    /// Fixed token, used by tests against a local stand-in server.
    Static(String),
}

/// Thin client for the Firestore documents REST API. Writes are
/// merge-upserts: only the fields present in the update are replaced.
pub struct FirestoreClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    auth: Auth,
}

impl FirestoreClient {
    pub fn new(key: ServiceAccountKey) -> Result<Self> {
        key.validate()?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: FIRESTORE_BASE_URL.to_string(),
            project_id: key.project_id.clone(),
            auth: Auth::ServiceAccount {
                key,
                cached: Mutex::new(None),
            },
        })
    }

    /// Client bound to an explicit endpoint and pre-issued token.
    pub fn with_static_token(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            project_id: project_id.into(),
            auth: Auth::Static(token.into()),
        }
    }

    /// Merge the given fields into `{collection}/{doc_id}`, creating the
    /// document if it does not exist.
    pub async fn upsert(
        &self,
        collection: &str,
        doc_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<()> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/v1/projects/{}/databases/(default)/documents/{}/{}",
            self.base_url, self.project_id, collection, doc_id
        );

        // updateMask restricts the write to our fields, giving merge
        // semantics instead of full-document replacement.
        let mask: Vec<(&str, &str)> = fields
            .keys()
            .map(|k| ("updateMask.fieldPaths", k.as_str()))
            .collect();
        let body = json!({ "fields": document::to_wire_fields(fields) });

        let response = self
            .http
            .patch(&url)
            .bearer_auth(token)
            .query(&mask)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("patched document {collection}/{doc_id}");
            Ok(())
        } else {
            let detail = response.text().await.unwrap_or_default();
            Err(AppError::Sync(format!(
                "document write for {doc_id} failed with status {status}: {detail}"
            )))
        }
    }

    /// Probe the target collection with a small page read. Used as a
    /// connection test before a batch.
    pub async fn check_connection(&self, collection: &str) -> Result<()> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/v1/projects/{}/databases/(default)/documents/{}",
            self.base_url, self.project_id, collection
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("pageSize", "1")])
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let detail = response.text().await.unwrap_or_default();
            Err(AppError::Sync(format!(
                "connection test failed with status {status}: {detail}"
            )))
        }
    }

    async fn access_token(&self) -> Result<String> {
        let (key, cached) = match &self.auth {
            Auth::Static(token) => return Ok(token.clone()),
            Auth::ServiceAccount { key, cached } => (key, cached),
        };

        {
            let guard = cached
                .lock()
                .map_err(|_| AppError::Sync("token cache poisoned".to_string()))?;
            if let Some(entry) = guard.as_ref() {
                if entry.expires_at > Instant::now() {
                    return Ok(entry.token.clone());
                }
            }
        }

        let assertion = sign_assertion(key)?;
        let response = self
            .http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Credentials(format!(
                "token exchange failed with status {status}: {detail}"
            )));
        }
        let token: TokenResponse = response.json().await?;

        let lifetime = token.expires_in.unwrap_or(TOKEN_LIFETIME_SECS);
        let expires_at =
            Instant::now() + Duration::from_secs(lifetime.saturating_sub(TOKEN_SLACK_SECS));
        let mut guard = cached
            .lock()
            .map_err(|_| AppError::Sync("token cache poisoned".to_string()))?;
        *guard = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at,
        });
        Ok(token.access_token)
    }
}

fn sign_assertion(key: &ServiceAccountKey) -> Result<String> {
    let now = chrono::Utc::now().timestamp() as u64;
    let claims = Claims {
        iss: &key.client_email,
        scope: DATASTORE_SCOPE,
        aud: &key.token_uri,
        iat: now,
        exp: now + TOKEN_LIFETIME_SECS,
    };

    let mut header = Header::new(Algorithm::RS256);
    if !key.private_key_id.is_empty() {
        header.kid = Some(key.private_key_id.clone());
    }
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| AppError::Credentials(format!("invalid service-account key: {e}")))?;
    encode(&header, &claims, &encoding_key)
        .map_err(|e| AppError::Credentials(format!("could not sign token request: {e}")))
}
