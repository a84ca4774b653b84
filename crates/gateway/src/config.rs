use trek_core::error::CoreError;
use trek_core::types::DbId;

use crate::session::StaticSession;

const DEFAULT_API_URL: &str = "http://localhost:8080/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Gateway configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Backend base URL, without the `trek-resources` namespace.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    pub token: Option<String>,
    pub user_id: Option<DbId>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            token: None,
            user_id: None,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                     |
    /// |-------------------------|-----------------------------|
    /// | `TREK_API_URL`          | `http://localhost:8080/api` |
    /// | `TREK_API_TIMEOUT_SECS` | `30`                        |
    /// | `TREK_API_TOKEN`        | unset                       |
    /// | `TREK_API_USER_ID`      | unset                       |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Used by [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let base_url = lookup("TREK_API_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout_secs = match lookup("TREK_API_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                CoreError::Validation(format!(
                    "TREK_API_TIMEOUT_SECS must be a valid u64, got '{raw}'"
                ))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let token = lookup("TREK_API_TOKEN").filter(|t| !t.trim().is_empty());

        let user_id = match lookup("TREK_API_USER_ID") {
            Some(raw) => Some(raw.trim().parse::<DbId>().map_err(|_| {
                CoreError::Validation(format!("TREK_API_USER_ID must be an integer, got '{raw}'"))
            })?),
            None => None,
        };

        Ok(Self {
            base_url,
            timeout_secs,
            token,
            user_id,
        })
    }

    /// Session built from the configured token and user.
    pub fn session(&self) -> StaticSession {
        StaticSession::new(self.token.clone(), self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::session::SessionProvider;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = GatewayConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url, DEFAULT_API_URL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.token.is_none());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let config =
            GatewayConfig::from_lookup(lookup(&[("TREK_API_URL", "https://api.example/v1/")]))
                .unwrap();
        assert_eq!(config.base_url, "https://api.example/v1");
    }

    #[test]
    fn malformed_timeout_is_an_error() {
        assert!(GatewayConfig::from_lookup(lookup(&[("TREK_API_TIMEOUT_SECS", "soon")])).is_err());
    }

    #[test]
    fn session_carries_token_and_user() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("TREK_API_TOKEN", "abc"),
            ("TREK_API_USER_ID", "42"),
        ]))
        .unwrap();
        let session = config.session();
        assert_eq!(session.token().as_deref(), Some("abc"));
        assert_eq!(session.user_id(), Some(42));
    }
}
