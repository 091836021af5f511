use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("SUPABASE_URL is not a valid URL")]
    InvalidProviderUrl,
}

/// Process configuration, read once at startup from the environment
/// (`.env` supported via dotenv).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider_url: String,
    pub anon_key: String,
    pub service_role_key: String,
    pub bind_addr: String,
    pub secure_cookies: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(AppConfig {
            provider_url: require("SUPABASE_URL")?,
            anon_key: require("SUPABASE_ANON_KEY")?,
            service_role_key: require("SUPABASE_SERVICE_ROLE_KEY")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            secure_cookies: env::var("SECURE_COOKIES")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }

    /// First dot-separated label of the provider URL host, e.g.
    /// `abcdefgh` for `https://abcdefgh.supabase.co`.
    pub fn project_ref(&self) -> Result<String, ConfigError> {
        let url = reqwest::Url::parse(&self.provider_url)
            .map_err(|_| ConfigError::InvalidProviderUrl)?;
        let host = url.host_str().ok_or(ConfigError::InvalidProviderUrl)?;
        let label = host.split('.').next().unwrap_or(host);
        if label.is_empty() {
            return Err(ConfigError::InvalidProviderUrl);
        }
        Ok(label.to_string())
    }

    /// Name of the session cookie the provider's browser SDK uses, which the
    /// login handler also sets: `sb-{project_ref}-auth-token`.
    pub fn auth_cookie_name(&self) -> Result<String, ConfigError> {
        Ok(format!("sb-{}-auth-token", self.project_ref()?))
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> AppConfig {
        AppConfig {
            provider_url: url.to_string(),
            anon_key: "anon".to_string(),
            service_role_key: "service".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            secure_cookies: false,
        }
    }

    #[test]
    fn cookie_name_uses_first_host_label() {
        let cfg = config("https://abcdefgh.supabase.co");
        assert_eq!(cfg.auth_cookie_name().unwrap(), "sb-abcdefgh-auth-token");
    }

    #[test]
    fn malformed_provider_url_is_rejected() {
        let cfg = config("not a url");
        assert!(cfg.project_ref().is_err());
    }
}
