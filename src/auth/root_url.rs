//! External root URL resolution
//!
//! Behind a reverse proxy the server only sees its internal host and scheme.
//! URLs handed back to the browser (e.g. the post-logout redirect) must use the
//! address the user actually typed, so the proxy's `X-Forwarded-Host` and
//! `X-Forwarded-Proto` headers are honoured.
//!
//! Forwarded headers are trusted unconditionally. This is only correct when the
//! proxy in front of the server is trusted infrastructure that overwrites them;
//! set `ROOT_URL` otherwise.

use axum::http::{header::HOST, request::Parts, HeaderMap};
use std::fmt;
use thiserror::Error;

const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Request extension marking a connection with an established TLS session.
///
/// This server only listens on plain TCP and never sets it. A TLS-terminating
/// listener wrapped around the router must insert it on each request;
/// otherwise scheme detection relies on `X-Forwarded-Proto`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TlsSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("https") {
            Some(Scheme::Https)
        } else if value.eq_ignore_ascii_case("http") {
            Some(Scheme::Http)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Scheme and host of the server as seen from outside. Renders without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootUrl {
    pub scheme: Scheme,
    /// Host, optionally with a port.
    pub host: String,
}

impl RootUrl {
    fn new(scheme: Scheme, host: &str) -> Self {
        Self {
            scheme,
            host: host.trim_end_matches('/').to_string(),
        }
    }
}

impl fmt::Display for RootUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme.as_str(), self.host)
    }
}

#[derive(Debug, Error)]
pub enum RootUrlError {
    #[error("invalid root URL {value:?}: {source}")]
    Parse {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("root URL {0:?} must use http or https")]
    UnsupportedScheme(String),
    #[error("root URL {0:?} has no host")]
    MissingHost(String),
}

/// The parts of an inbound request consulted for root URL resolution.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub host: &'a str,
    pub scheme: Option<&'a str>,
    pub tls: bool,
    pub forwarded_host: Option<&'a str>,
    pub forwarded_proto: Option<&'a str>,
}

impl<'a> RequestContext<'a> {
    pub fn from_parts(parts: &'a Parts) -> Self {
        let headers = &parts.headers;
        let host = header_str(headers, HOST.as_str())
            .or_else(|| parts.uri.authority().map(|a| a.as_str()))
            .unwrap_or("");

        Self {
            host,
            scheme: parts.uri.scheme_str(),
            tls: parts.extensions.get::<TlsSession>().is_some(),
            forwarded_host: header_str(headers, X_FORWARDED_HOST),
            forwarded_proto: header_str(headers, X_FORWARDED_PROTO),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// First entry of a possibly comma-separated forwarded header, if non-empty.
///
/// Chained proxies append their own value, so the left-most one is the client-facing proxy.
fn first_forwarded(value: Option<&str>) -> Option<&str> {
    value
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Computes the external root URL of a request.
///
/// Built once at start-up. A configured override always wins; otherwise the
/// request's forwarded headers, TLS state and Host are consulted.
#[derive(Debug, Clone, Default)]
pub struct RootUrlResolver {
    root_override: Option<RootUrl>,
}

impl RootUrlResolver {
    /// An empty `root_override` means "derive from each request".
    pub fn new(root_override: &str) -> Result<Self, RootUrlError> {
        let root_override = root_override.trim();
        if root_override.is_empty() {
            return Ok(Self::default());
        }

        let parsed = url::Url::parse(root_override).map_err(|source| RootUrlError::Parse {
            value: root_override.to_string(),
            source,
        })?;
        let scheme = Scheme::parse(parsed.scheme())
            .ok_or_else(|| RootUrlError::UnsupportedScheme(root_override.to_string()))?;
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| RootUrlError::MissingHost(root_override.to_string()))?;
        let host = match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self {
            root_override: Some(RootUrl::new(scheme, &host)),
        })
    }

    pub fn root_override(&self) -> Option<&RootUrl> {
        self.root_override.as_ref()
    }

    pub fn resolve(&self, request: &RequestContext<'_>) -> RootUrl {
        if let Some(root) = &self.root_override {
            return root.clone();
        }

        let host = first_forwarded(request.forwarded_host).unwrap_or(request.host);

        let forwarded_scheme = first_forwarded(request.forwarded_proto).and_then(|proto| {
            let scheme = Scheme::parse(proto);
            if scheme.is_none() {
                tracing::debug!(
                    forwarded_proto = %proto,
                    "Ignoring unrecognised X-Forwarded-Proto value"
                );
            }
            scheme
        });

        let scheme = forwarded_scheme.unwrap_or_else(|| {
            if request.tls {
                Scheme::Https
            } else {
                request.scheme.and_then(Scheme::parse).unwrap_or(Scheme::Http)
            }
        });

        RootUrl::new(scheme, host)
    }

    pub fn resolve_parts(&self, parts: &Parts) -> RootUrl {
        self.resolve(&RequestContext::from_parts(parts))
    }
}
