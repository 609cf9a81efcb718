//! RP-initiated logout redirect
//!
//! When logout is enabled for the provider, `/auth/logout` sends the browser to
//! the provider's end-session endpoint with our client id and a redirect back
//! to the dashboard root. Query parameters already present on the endpoint are
//! kept; only the redirect parameter and `client_id` are added or replaced.

use axum::{
    extract::{Request, State},
    http::{header::LOCATION, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use url::{form_urlencoded, Url};

use super::relying_party::RelyingParty;
use super::root_url::RootUrlResolver;
use crate::model::LogoutConfig;
use crate::AppState;

const CLIENT_ID_PARAM: &str = "client_id";

/// Builds the logout redirect for a provider.
///
/// Returns `None` when logout is disabled; no route should be registered then.
pub fn build_logout_redirect(
    config: &LogoutConfig,
    client: Arc<dyn RelyingParty>,
    resolver: Arc<RootUrlResolver>,
) -> Option<LogoutRedirect> {
    if !config.enabled {
        return None;
    }

    Some(LogoutRedirect {
        redirect_param: config.redirect_param_name().to_string(),
        client,
        resolver,
    })
}

/// Per-request logout redirect, shared by all logout requests.
#[derive(Clone)]
pub struct LogoutRedirect {
    redirect_param: String,
    client: Arc<dyn RelyingParty>,
    resolver: Arc<RootUrlResolver>,
}

impl std::fmt::Debug for LogoutRedirect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogoutRedirect")
            .field("redirect_param", &self.redirect_param)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl LogoutRedirect {
    pub fn redirect_param(&self) -> &str {
        &self.redirect_param
    }

    /// Location the browser is sent to for this request.
    pub fn location(&self, parts: &Parts) -> String {
        let root_url = self.resolver.resolve_parts(parts).to_string();
        let endpoint = self.client.end_session_endpoint();
        let client_id = self.client.oauth_config().client_id;

        if endpoint.trim().is_empty() {
            tracing::warn!(
                event = "logout_missing_end_session_endpoint",
                "Provider has no end_session_endpoint; issuing degenerate logout redirect"
            );
        }

        merge_query(
            &endpoint,
            &[
                (self.redirect_param.as_str(), root_url.as_str()),
                (CLIENT_ID_PARAM, client_id.as_str()),
            ],
        )
    }

    /// Answer with `302 Found` to the provider's end-session endpoint. Never fails.
    pub fn respond(&self, parts: &Parts) -> Response {
        let location = self.location(parts);

        let header = HeaderValue::from_str(&location).unwrap_or_else(|e| {
            // The merged query is always form-encoded, so only the provider's
            // base URL can carry bytes that are illegal in a header.
            tracing::error!(
                event = "logout_invalid_location",
                error = %e,
                "End-session endpoint is not a valid header value; redirecting with query only"
            );
            let query_only = location
                .find('?')
                .map(|i| &location[i..])
                .unwrap_or_default();
            HeaderValue::from_str(query_only).unwrap_or_else(|_| HeaderValue::from_static("/"))
        });

        tracing::info!(
            event = "oidc_logout_redirect",
            redirect_param = %self.redirect_param,
            "Redirecting to provider end-session endpoint"
        );

        (StatusCode::FOUND, [(LOCATION, header)]).into_response()
    }
}

/// `GET /auth/logout`
///
/// Only routed when logout is enabled; answers 404 if the state says otherwise.
pub async fn logout_handler(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();
    match &state.logout {
        Some(logout) => logout.respond(&parts),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Set `params` on the query string of `endpoint`, keeping every other pair.
///
/// An absolute endpoint is re-serialized through [`Url`], which percent-encodes
/// non-ASCII paths and IDN hosts. An empty or relative endpoint is split
/// textually instead, giving a degenerate location such as `?client_id=...`
/// rather than an error.
fn merge_query(endpoint: &str, params: &[(&str, &str)]) -> String {
    if let Ok(mut url) = Url::parse(endpoint) {
        let query = merged_query(url.query(), params);
        url.set_query(Some(&query));
        return url.into();
    }

    let (without_fragment, fragment) = match endpoint.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (endpoint, None),
    };
    let (base, query) = match without_fragment.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (without_fragment, None),
    };

    let mut location = format!("{}?{}", base, merged_query(query, params));
    if let Some(fragment) = fragment {
        location.push('#');
        location.push_str(fragment);
    }
    location
}

/// Existing pairs are copied byte for byte, in order, unless their key is one
/// of `params`; `params` are appended form-encoded.
fn merged_query(existing: Option<&str>, params: &[(&str, &str)]) -> String {
    let mut query = String::new();
    for segment in existing.unwrap_or_default().split('&') {
        if segment.is_empty() {
            continue;
        }
        let replaced = form_urlencoded::parse(segment.as_bytes())
            .next()
            .is_some_and(|(key, _)| params.iter().any(|(name, _)| *name == key));
        if replaced {
            continue;
        }
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(segment);
    }

    let mut serializer = form_urlencoded::Serializer::for_suffix(query, 0);
    for (key, value) in params {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}
