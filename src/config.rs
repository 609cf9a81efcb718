use std::env;

use crate::auth::RootUrlResolver;

/// Source for the OIDC provider descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderSource {
    /// Descriptor provided as JSON string via OIDC_PROVIDER_JSON env var
    Json(String),
    /// Descriptor loaded from file path via OIDC_PROVIDER_PATH env var
    File(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,

    // External root URL override (ROOT_URL). Validated here so a bad value
    // stops the process before it accepts traffic.
    pub root_url: RootUrlResolver,

    // OIDC provider descriptor
    pub provider: ProviderSource,
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a variable if set
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let server_port = match lookup("SERVER_PORT") {
            Some(port) => port
                .parse::<u16>()
                .map_err(|e| anyhow::anyhow!("Invalid SERVER_PORT {:?}: {}", port, e))?,
            None => 3000,
        };

        let root_url = RootUrlResolver::new(&lookup("ROOT_URL").unwrap_or_default())
            .map_err(|e| anyhow::anyhow!("Invalid ROOT_URL: {}", e))?;

        // Provider descriptor (primary: JSON env var, fallback: file path)
        let provider = if let Some(json) = lookup("OIDC_PROVIDER_JSON").filter(|s| !s.is_empty()) {
            ProviderSource::Json(json)
        } else if let Some(path) = lookup("OIDC_PROVIDER_PATH").filter(|s| !s.is_empty()) {
            ProviderSource::File(path)
        } else {
            return Err(anyhow::anyhow!(
                "Either OIDC_PROVIDER_JSON or OIDC_PROVIDER_PATH environment variable is required"
            ));
        };

        Ok(Config {
            server_host,
            server_port,
            root_url,
            provider,
        })
    }

    /// Get bind address for server
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("OIDC_PROVIDER_PATH", "/etc/provider.json")]).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert!(config.root_url.root_override().is_none());
        assert_eq!(
            config.provider,
            ProviderSource::File("/etc/provider.json".to_string())
        );
    }

    #[test]
    fn test_json_source_takes_precedence() {
        let config = load(&[
            ("OIDC_PROVIDER_JSON", "{}"),
            ("OIDC_PROVIDER_PATH", "/etc/provider.json"),
        ])
        .unwrap();
        assert_eq!(config.provider, ProviderSource::Json("{}".to_string()));
    }

    #[test]
    fn test_root_url_override() {
        let config = load(&[
            ("OIDC_PROVIDER_JSON", "{}"),
            ("ROOT_URL", "https://dash.example.com/"),
        ])
        .unwrap();
        assert_eq!(
            config.root_url.root_override().unwrap().to_string(),
            "https://dash.example.com"
        );
    }

    #[test]
    fn test_malformed_root_url_is_fatal() {
        let err = load(&[("OIDC_PROVIDER_JSON", "{}"), ("ROOT_URL", "dash.example.com")])
            .unwrap_err();
        assert!(err.to_string().contains("ROOT_URL"));
    }

    #[test]
    fn test_missing_provider_is_fatal() {
        assert!(load(&[]).is_err());
    }

    #[test]
    fn test_invalid_port_is_fatal() {
        assert!(load(&[("OIDC_PROVIDER_JSON", "{}"), ("SERVER_PORT", "http")]).is_err());
    }
}
