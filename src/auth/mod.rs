//! Authentication module
//!
//! Builds the OIDC logout redirect that sits in front of the provider's
//! end-session endpoint.
//!
//! ## Structure
//!
//! - `root_url`: external root URL of a request (reverse-proxy aware)
//! - `relying_party`: the relying-party capabilities the logout flow needs, plus discovery
//! - `logout`: builder and handler for `/auth/logout`
//!
//! ## Logout Flow
//!
//! 1. At start-up the provider client is built (discovery if needed)
//! 2. If logout is enabled, `/auth/logout` is registered
//! 3. Each logout request resolves the root URL and redirects (302) to the
//!    end-session endpoint with `client_id` and the post-logout redirect URI

pub mod logout;
pub mod relying_party;
pub mod root_url;

pub use logout::{build_logout_redirect, logout_handler, LogoutRedirect};
pub use relying_party::{ClientConfig, DiscoveryError, ProviderClient, RelyingParty};
pub use root_url::{RequestContext, RootUrl, RootUrlError, RootUrlResolver, Scheme, TlsSession};
