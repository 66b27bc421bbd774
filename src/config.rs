//! Provider configuration.
//!
//! The host sends the provider block as a JSON object. Values set there take
//! precedence; unset values fall back to environment variables:
//!
//! | Attribute  | Environment variable | Default                  |
//! |------------|----------------------|--------------------------|
//! | `base_url` | `TSUGA_BASE_URL`     | `https://api.tsuga.com`  |
//! | `token`    | `TSUGA_TOKEN`        | none, required           |
//!
//! Empty or whitespace-only environment variables are treated as unset. An
//! explicitly empty `base_url` in configuration is an error rather than a
//! request for the default.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.tsuga.com";

/// Environment variable overriding the API endpoint.
pub const BASE_URL_ENV: &str = "TSUGA_BASE_URL";

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "TSUGA_TOKEN";

/// Raw provider configuration as written by the user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// API endpoint.
    #[serde(default)]
    pub base_url: Option<String>,
    /// API token.
    #[serde(default)]
    pub token: Option<String>,
}

/// Fully resolved settings used to build the API client.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Parsed API endpoint.
    pub base_url: Url,
    /// Bearer token. Never logged.
    pub token: SecretString,
}

impl ProviderConfig {
    /// Decode the configuration object sent by the host.
    ///
    /// `null` is accepted and means "everything from the environment".
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
            .map_err(|e| ProviderError::Configuration(format!("invalid provider block: {}", e)))
    }

    /// Resolve against the process environment.
    pub fn resolve(self) -> Result<ResolvedConfig, ProviderError> {
        self.resolve_with(env_var_or_none)
    }

    /// Resolve using `lookup` to read environment variables.
    pub fn resolve_with<F>(self, lookup: F) -> Result<ResolvedConfig, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = match self.base_url {
            Some(url) if url.trim().is_empty() => {
                return Err(ProviderError::Configuration(
                    "base_url must not be empty; remove it to use the default".to_string(),
                ))
            }
            Some(url) => url,
            None => lookup(BASE_URL_ENV).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        };
        let base_url = Url::parse(base_url.trim()).map_err(|e| {
            ProviderError::Configuration(format!("invalid base_url {:?}: {}", base_url, e))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ProviderError::Configuration(format!(
                "base_url must use http or https, got {}",
                base_url.scheme()
            )));
        }

        let token = self
            .token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| lookup(TOKEN_ENV))
            .ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "an API token is required: set `token` in the provider block or {}",
                    TOKEN_ENV
                ))
            })?;

        Ok(ResolvedConfig {
            base_url,
            token: SecretString::from(token),
        })
    }
}

impl ResolvedConfig {
    /// The token, for building the `Authorization` header.
    pub fn bearer_token(&self) -> &str {
        self.token.expose_secret()
    }
}

/// Schema of the provider block.
pub fn provider_schema() -> Schema {
    Schema::v0()
        .with_description("Configures access to the Tsuga API")
        .with_attribute(
            "base_url",
            Attribute::optional_string().with_description(format!(
                "API endpoint. Defaults to {} or the {} environment variable",
                DEFAULT_BASE_URL, BASE_URL_ENV
            )),
        )
        .with_attribute(
            "token",
            Attribute::optional_string()
                .sensitive()
                .with_description(format!("API token. Defaults to the {} environment variable", TOKEN_ENV)),
        )
}

/// Validate the provider block without touching the network.
pub fn validate_with<F>(value: serde_json::Value, lookup: F) -> Vec<Diagnostic>
where
    F: Fn(&str) -> Option<String>,
{
    let mut diagnostics = crate::validation::validate(&provider_schema(), &value);
    if !diagnostics.is_empty() {
        return diagnostics;
    }
    if let Err(e) = ProviderConfig::from_value(value).and_then(|c| c.resolve_with(lookup)) {
        diagnostics.push(e.to_diagnostic());
    }
    diagnostics
}

/// Read an environment variable, returning None if unset, empty, or whitespace-only.
pub fn env_var_or_none(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_base_url_and_reads_token_from_env() {
        let resolved = ProviderConfig::default()
            .resolve_with(env(&[(TOKEN_ENV, "secret")]))
            .unwrap();
        assert_eq!(resolved.base_url.as_str(), "https://api.tsuga.com/");
        assert_eq!(resolved.bearer_token(), "secret");
    }

    #[test]
    fn test_config_values_take_precedence_over_env() {
        let config = ProviderConfig::from_value(json!({
            "base_url": "https://eu.api.tsuga.com",
            "token": "from-config"
        }))
        .unwrap();
        let resolved = config
            .resolve_with(env(&[
                (BASE_URL_ENV, "https://us.api.tsuga.com"),
                (TOKEN_ENV, "from-env"),
            ]))
            .unwrap();
        assert_eq!(resolved.base_url.host_str(), Some("eu.api.tsuga.com"));
        assert_eq!(resolved.bearer_token(), "from-config");
    }

    #[test]
    fn test_env_base_url_used_when_unset() {
        let resolved = ProviderConfig::default()
            .resolve_with(env(&[
                (BASE_URL_ENV, "http://localhost:8080"),
                (TOKEN_ENV, "t"),
            ]))
            .unwrap();
        assert_eq!(resolved.base_url.port(), Some(8080));
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let err = ProviderConfig::default().resolve_with(env(&[])).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(err.to_string().contains(TOKEN_ENV));
    }

    #[test]
    fn test_empty_token_is_fatal() {
        let config = ProviderConfig::from_value(json!({"token": "  "})).unwrap();
        assert!(config.resolve_with(env(&[])).is_err());
    }

    #[test]
    fn test_explicitly_empty_base_url_is_fatal() {
        let config = ProviderConfig::from_value(json!({"base_url": "", "token": "t"})).unwrap();
        let err = config.resolve_with(env(&[])).unwrap_err();
        assert!(err.to_string().contains("base_url must not be empty"));
    }

    #[test]
    fn test_invalid_base_url_is_fatal() {
        let config =
            ProviderConfig::from_value(json!({"base_url": "not a url", "token": "t"})).unwrap();
        assert!(config.resolve_with(env(&[])).is_err());

        let config =
            ProviderConfig::from_value(json!({"base_url": "ftp://api.tsuga.com", "token": "t"}))
                .unwrap();
        assert!(config.resolve_with(env(&[])).is_err());
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        assert!(ProviderConfig::from_value(json!({"api_key": "t"})).is_err());
    }

    #[test]
    fn test_null_config_means_defaults() {
        let config = ProviderConfig::from_value(serde_json::Value::Null).unwrap();
        assert!(config.base_url.is_none());
        assert!(config.token.is_none());
    }

    #[test]
    fn test_token_is_redacted_in_debug_output() {
        let resolved = ProviderConfig::default()
            .resolve_with(env(&[(TOKEN_ENV, "super-secret")]))
            .unwrap();
        assert!(!format!("{:?}", resolved).contains("super-secret"));
    }

    #[test]
    fn test_validate_reports_missing_token() {
        let diagnostics = validate_with(json!({"base_url": "https://api.tsuga.com"}), env(&[]));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].is_error());

        assert!(validate_with(json!({}), env(&[(TOKEN_ENV, "t")])).is_empty());
    }

    #[test]
    fn test_validate_reports_wrong_types() {
        let diagnostics = validate_with(json!({"token": 42}), env(&[]));
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("token"));
    }

    #[test]
    fn test_provider_schema_marks_token_sensitive() {
        let schema = provider_schema();
        assert!(schema.attribute("token").unwrap().flags.sensitive);
        assert!(!schema.attribute("base_url").unwrap().flags.required);
    }
}
