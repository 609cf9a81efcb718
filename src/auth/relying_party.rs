//! Relying-party handle consumed by the logout flow
//!
//! The logout redirect only needs two things from an OIDC client: the
//! provider's end-session endpoint and our client id. [`RelyingParty`] exposes
//! exactly that, so tests can substitute a plain struct for a full client.

use oauth2::ClientId;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::model::OidcProvider;

/// OAuth2 client settings visible to the logout flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub client_id: ClientId,
}

pub trait RelyingParty: Send + Sync {
    /// May be empty when the provider does not advertise one.
    fn end_session_endpoint(&self) -> String;

    fn oauth_config(&self) -> ClientConfig;
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("discovery request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("discovery request to {url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("invalid discovery document from {url}: {source}")]
    Document {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Subset of the OpenID Provider Metadata document we read.
#[derive(Debug, Deserialize)]
struct ProviderMetadata {
    #[serde(default)]
    end_session_endpoint: Option<String>,
}

/// Relying-party handle for the configured provider.
///
/// Immutable once built, so it can be shared across request handlers.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    client_id: ClientId,
    end_session_endpoint: String,
}

impl ProviderClient {
    pub fn new(client_id: impl Into<String>, end_session_endpoint: impl Into<String>) -> Self {
        Self {
            client_id: ClientId::new(client_id.into()),
            end_session_endpoint: end_session_endpoint.into(),
        }
    }

    /// Build the client for `provider`, fetching the discovery document unless
    /// the descriptor pins an end-session endpoint.
    pub async fn from_provider(provider: &OidcProvider) -> Result<Self, DiscoveryError> {
        if let Some(endpoint) = &provider.end_session_endpoint {
            tracing::info!(
                provider = %provider.slug_id,
                "Using end_session_endpoint from provider descriptor"
            );
            return Ok(Self::new(provider.client_id.clone(), endpoint.clone()));
        }

        let client = create_http_client(provider.http_timeout())?;
        let endpoint = discover_end_session_endpoint(&client, &provider.discovery_url()).await?;

        if endpoint.is_empty() {
            tracing::warn!(
                provider = %provider.slug_id,
                "Provider does not advertise an end_session_endpoint - logout redirects will be degenerate"
            );
        } else {
            tracing::info!(
                provider = %provider.slug_id,
                end_session_endpoint = %endpoint,
                "Discovered end_session_endpoint"
            );
        }

        Ok(Self::new(provider.client_id.clone(), endpoint))
    }
}

impl RelyingParty for ProviderClient {
    fn end_session_endpoint(&self) -> String {
        self.end_session_endpoint.clone()
    }

    fn oauth_config(&self) -> ClientConfig {
        ClientConfig {
            client_id: self.client_id.clone(),
        }
    }
}

fn create_http_client(timeout: Duration) -> Result<reqwest::Client, DiscoveryError> {
    reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .map_err(DiscoveryError::Client)
}

/// Fetch the discovery document and return its `end_session_endpoint`, or an
/// empty string when the provider does not publish one.
async fn discover_end_session_endpoint(
    client: &reqwest::Client,
    url: &str,
) -> Result<String, DiscoveryError> {
    tracing::debug!(discovery_url = %url, "Fetching OIDC discovery document");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| DiscoveryError::Request {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(DiscoveryError::Status {
            url: url.to_string(),
            status,
        });
    }

    let metadata: ProviderMetadata =
        response
            .json()
            .await
            .map_err(|source| DiscoveryError::Document {
                url: url.to_string(),
                source,
            })?;

    Ok(metadata.end_session_endpoint.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LogoutConfig;
    use axum::{routing::get, Json, Router};

    /// Serve `document` at `/.well-known/openid-configuration` on an ephemeral port.
    async fn spawn_discovery_server(document: serde_json::Value) -> String {
        let app = Router::new().route(
            "/.well-known/openid-configuration",
            get(move || {
                let document = document.clone();
                async move { Json(document) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn provider(issuer: &str, end_session_endpoint: Option<&str>) -> OidcProvider {
        OidcProvider {
            slug_id: "test".to_string(),
            name: "Test".to_string(),
            client_id: "client123".to_string(),
            issuer: issuer.to_string(),
            discovery_url: None,
            end_session_endpoint: end_session_endpoint.map(str::to_string),
            http_timeout: Default::default(),
            logout: LogoutConfig {
                enabled: true,
                logout_redirect_param_name: String::new(),
            },
        }
    }

    #[test]
    fn test_provider_client_exposes_capabilities() {
        let client = ProviderClient::new("c1", "https://p.example.com/logout");
        assert_eq!(client.end_session_endpoint(), "https://p.example.com/logout");
        assert_eq!(client.oauth_config().client_id.as_str(), "c1");
    }

    #[tokio::test]
    async fn test_pinned_endpoint_skips_discovery() {
        // Unroutable issuer: any network access would fail the test
        let provider = provider("http://127.0.0.1:9", Some("https://p.example.com/logout"));
        let client = ProviderClient::from_provider(&provider).await.unwrap();
        assert_eq!(client.end_session_endpoint(), "https://p.example.com/logout");
    }

    #[tokio::test]
    async fn test_discovers_end_session_endpoint() {
        let issuer = spawn_discovery_server(serde_json::json!({
            "issuer": "http://example",
            "end_session_endpoint": "https://provider.example.com/logout?existing=param"
        }))
        .await;

        let client = ProviderClient::from_provider(&provider(&issuer, None))
            .await
            .unwrap();
        assert_eq!(
            client.end_session_endpoint(),
            "https://provider.example.com/logout?existing=param"
        );
        assert_eq!(client.oauth_config().client_id.as_str(), "client123");
    }

    #[tokio::test]
    async fn test_missing_end_session_endpoint_is_empty() {
        let issuer = spawn_discovery_server(serde_json::json!({ "issuer": "http://example" })).await;

        let client = ProviderClient::from_provider(&provider(&issuer, None))
            .await
            .unwrap();
        assert_eq!(client.end_session_endpoint(), "");
    }

    #[tokio::test]
    async fn test_discovery_http_error() {
        let issuer = spawn_discovery_server(serde_json::json!({})).await;
        let mut provider = provider(&issuer, None);
        provider.discovery_url = Some(format!("{}/missing", issuer));

        let err = ProviderClient::from_provider(&provider).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Status { .. }));
    }
}
