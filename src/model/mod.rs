pub mod duration;
pub mod provider;

pub use duration::{parse_duration, DurationError, DurationString};
pub use provider::{LogoutConfig, OidcProvider, DEFAULT_LOGOUT_REDIRECT_PARAM};
