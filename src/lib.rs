//! Logout gate library
//!
//! Reverse-proxy aware root URL resolution and the OIDC logout redirect of the
//! dashboard server.

#![deny(dead_code)]

pub mod auth;
pub mod config;
pub mod model;
pub mod web;

use auth::{build_logout_redirect, LogoutRedirect, ProviderClient, RootUrlResolver};
use config::ProviderSource;
use model::OidcProvider;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<OidcProvider>,
    /// `None` when logout is disabled for the provider
    pub logout: Option<Arc<LogoutRedirect>>,
}

/// Load the provider descriptor from the configured source
pub fn load_provider(source: &ProviderSource) -> anyhow::Result<OidcProvider> {
    let provider = match source {
        ProviderSource::Json(json) => OidcProvider::from_json(json)?,
        ProviderSource::File(path) => OidcProvider::from_file(path)?,
    };

    tracing::info!(
        provider = %provider.slug_id,
        name = %provider.name,
        logout_enabled = provider.logout.enabled,
        redirect_param = %provider.logout.redirect_param_name(),
        "OIDC provider loaded"
    );

    Ok(provider)
}

impl AppState {
    /// Build the shared state. Provider discovery only happens when logout is enabled.
    pub async fn build(provider: OidcProvider, root_url: RootUrlResolver) -> anyhow::Result<Self> {
        let logout = if provider.logout.enabled {
            let client = ProviderClient::from_provider(&provider)
                .await
                .map_err(|e| anyhow::anyhow!("OIDC provider {}: {}", provider.slug_id, e))?;
            build_logout_redirect(&provider.logout, Arc::new(client), Arc::new(root_url))
                .map(Arc::new)
        } else {
            tracing::info!(
                provider = %provider.slug_id,
                "Logout disabled for provider; /auth/logout will not be registered"
            );
            None
        };

        Ok(Self {
            provider: Arc::new(provider),
            logout,
        })
    }
}
