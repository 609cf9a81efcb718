//! OIDC provider descriptor
//!
//! The provider is described by a small JSON document supplied through
//! `OIDC_PROVIDER_JSON` or `OIDC_PROVIDER_PATH`. Unknown fields are rejected so
//! that typos fail loudly at start-up.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::duration::DurationString;

/// Query parameter used by providers that follow OIDC RP-Initiated Logout.
pub const DEFAULT_LOGOUT_REDIRECT_PARAM: &str = "post_logout_redirect_uri";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogoutConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Name of the query parameter carrying the post-logout redirect URI.
    /// Some providers (e.g. AWS Cognito uses `logout_uri`) deviate from the standard name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logout_redirect_param_name: String,
}

impl LogoutConfig {
    pub fn redirect_param_name(&self) -> &str {
        if self.logout_redirect_param_name.is_empty() {
            DEFAULT_LOGOUT_REDIRECT_PARAM
        } else {
            &self.logout_redirect_param_name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OidcProvider {
    pub slug_id: String,
    pub name: String,
    pub client_id: String,
    pub issuer: String,
    /// Overrides `<issuer>/.well-known/openid-configuration`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_url: Option<String>,
    /// When set, discovery is skipped and this endpoint is used verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_session_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "DurationString::is_empty")]
    pub http_timeout: DurationString,
    #[serde(default)]
    pub logout: LogoutConfig,
}

impl OidcProvider {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let provider: OidcProvider = serde_json::from_str(json)
            .map_err(|e| anyhow::anyhow!("Invalid OIDC provider descriptor: {}", e))?;
        provider.validate()?;
        Ok(provider)
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read OIDC provider descriptor {}: {}", path, e)
        })?;
        Self::from_json(&json)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.slug_id.trim().is_empty() {
            anyhow::bail!("OIDC provider slug_id must not be empty");
        }
        if self.client_id.trim().is_empty() {
            anyhow::bail!("OIDC provider {} has an empty client_id", self.slug_id);
        }
        if self.issuer.trim().is_empty() && self.end_session_endpoint.is_none() {
            anyhow::bail!(
                "OIDC provider {} needs an issuer or an explicit end_session_endpoint",
                self.slug_id
            );
        }
        Ok(())
    }

    pub fn discovery_url(&self) -> String {
        match &self.discovery_url {
            Some(url) => url.clone(),
            None => format!(
                "{}/.well-known/openid-configuration",
                self.issuer.trim_end_matches('/')
            ),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        self.http_timeout.to_duration().unwrap_or(DEFAULT_HTTP_TIMEOUT)
    }
}
