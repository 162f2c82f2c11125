//! Bearer token validation
//!
//! Tokens are GitHub access tokens; a token is valid when GitHub's
//! `/user` endpoint accepts it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};

use super::token_cache::TokenCache;

/// The account a bearer token belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub login: String,
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

/// Resolves a bearer token to an identity
#[async_trait]
pub trait IdentityValidator: Send + Sync {
    /// `None` when the token is not accepted
    async fn validate(&self, token: &str) -> Option<UserIdentity>;
}

/// Validates tokens against the GitHub REST API
pub struct GitHubValidator {
    client: reqwest::Client,
    api_url: String,
}

impl GitHubValidator {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("estante-server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IdentityValidator for GitHubValidator {
    async fn validate(&self, token: &str) -> Option<UserIdentity> {
        let response = match self
            .client
            .get(format!("{}/user", self.api_url))
            .bearer_auth(token)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("GitHub API error: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("GitHub rejected token with status {}", response.status());
            return None;
        }

        match response.json::<UserIdentity>().await {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::error!("Unexpected GitHub user payload: {}", e);
                None
            }
        }
    }
}

/// Wraps a validator with a [`TokenCache`]
///
/// Only successful validations are cached.
pub struct CachingValidator {
    inner: Arc<dyn IdentityValidator>,
    cache: TokenCache,
}

impl CachingValidator {
    pub fn new(inner: Arc<dyn IdentityValidator>, cache: TokenCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }
}

#[async_trait]
impl IdentityValidator for CachingValidator {
    async fn validate(&self, token: &str) -> Option<UserIdentity> {
        if let Some(identity) = self.cache.get(token) {
            return Some(identity);
        }

        let identity = self.inner.validate(token).await?;
        self.cache.insert(token, identity.clone());
        Some(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingValidator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IdentityValidator for CountingValidator {
        async fn validate(&self, token: &str) -> Option<UserIdentity> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (token == "good").then(|| UserIdentity {
                login: "octocat".to_string(),
                id: 583231,
                name: Some("The Octocat".to_string()),
            })
        }
    }

    #[tokio::test]
    async fn test_caches_successful_validation() {
        let inner = Arc::new(CountingValidator {
            calls: AtomicUsize::new(0),
        });
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let validator = CachingValidator::new(
            inner.clone(),
            TokenCache::new(chrono::Duration::seconds(300), clock.clone()),
        );

        assert_eq!(validator.validate("good").await.unwrap().login, "octocat");
        assert!(validator.validate("good").await.is_some());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        clock.advance(chrono::Duration::seconds(301));
        assert!(validator.validate("good").await.is_some());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rejections_are_not_cached() {
        let inner = Arc::new(CountingValidator {
            calls: AtomicUsize::new(0),
        });
        let validator = CachingValidator::new(
            inner.clone(),
            TokenCache::new(chrono::Duration::seconds(300), Arc::new(ManualClock::new(Utc::now()))),
        );

        assert!(validator.validate("bad").await.is_none());
        assert!(validator.validate("bad").await.is_none());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert!(validator.cache().is_empty());
    }

    #[test]
    fn test_user_payload_ignores_extra_fields() {
        let payload = r#"{"login":"octocat","id":1,"name":null,"avatar_url":"https://example.com"}"#;
        let identity: UserIdentity = serde_json::from_str(payload).unwrap();
        assert_eq!(identity.login, "octocat");
        assert_eq!(identity.name, None);
    }
}
