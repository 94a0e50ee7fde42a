//! API key resolution for external services.
//!
//! Precedence (highest to lowest):
//! 1. Value in `devfusion.yml`
//! 2. Environment variable for the provider
//! 3. OS keychain entry under service `devfusion`

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

const KEYRING_SERVICE: &str = "devfusion";

/// An external service that needs an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Judge0,
    Firestore,
}

impl Provider {
    /// Environment variables checked for this provider, in order.
    pub fn env_vars(self) -> &'static [&'static str] {
        match self {
            Provider::Gemini => &["DEVFUSION_GEMINI_API_KEY", "GEMINI_API_KEY"],
            Provider::Judge0 => &["DEVFUSION_JUDGE0_API_KEY"],
            Provider::Firestore => &["DEVFUSION_FIRESTORE_API_KEY"],
        }
    }

    fn keyring_user(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Judge0 => "judge0",
            Provider::Firestore => "firestore",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyring_user())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "judge0" => Ok(Provider::Judge0),
            "firestore" => Ok(Provider::Firestore),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// Errors from keychain access.
#[derive(Debug, Error)]
#[error("keychain error for {provider}: {source}")]
pub struct CredentialError {
    provider: Provider,
    #[source]
    source: keyring::Error,
}

fn entry(provider: Provider) -> Result<keyring::Entry, CredentialError> {
    keyring::Entry::new(KEYRING_SERVICE, provider.keyring_user())
        .map_err(|source| CredentialError { provider, source })
}

/// Stores an API key in the OS keychain.
pub fn store_api_key(provider: Provider, key: &str) -> Result<(), CredentialError> {
    entry(provider)?
        .set_password(key.trim())
        .map_err(|source| CredentialError { provider, source })
}

/// Removes a stored API key. Missing entries are not an error.
pub fn clear_api_key(provider: Provider) -> Result<(), CredentialError> {
    match entry(provider)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(source) => Err(CredentialError { provider, source }),
    }
}

fn keychain_api_key(provider: Provider) -> Option<String> {
    match entry(provider).and_then(|e| {
        e.get_password()
            .map_err(|source| CredentialError { provider, source })
    }) {
        Ok(key) => Some(key),
        Err(e) => {
            debug!(%provider, error = %e, "No keychain entry");
            None
        }
    }
}

/// Resolves the API key for `provider` from config, environment, or keychain.
pub fn resolve_api_key(provider: Provider, configured: Option<&str>) -> Option<String> {
    resolve_with(
        provider,
        configured,
        |var| std::env::var(var).ok(),
        || keychain_api_key(provider),
    )
}

fn resolve_with(
    provider: Provider,
    configured: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
    keychain: impl FnOnce() -> Option<String>,
) -> Option<String> {
    let non_blank = |s: String| (!s.trim().is_empty()).then(|| s.trim().to_string());

    configured
        .map(str::to_string)
        .and_then(non_blank)
        .or_else(|| {
            provider
                .env_vars()
                .iter()
                .find_map(|var| env(var).and_then(non_blank))
        })
        .or_else(|| keychain().and_then(non_blank))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn configured_value_wins() {
        let key = resolve_with(
            Provider::Gemini,
            Some("from-config"),
            |_| Some("from-env".to_string()),
            || Some("from-keychain".to_string()),
        );
        assert_eq!(key.as_deref(), Some("from-config"));
    }

    #[test]
    fn env_checked_in_order_before_keychain() {
        let key = resolve_with(
            Provider::Gemini,
            None,
            |var| (var == "GEMINI_API_KEY").then(|| "plain".to_string()),
            || Some("from-keychain".to_string()),
        );
        assert_eq!(key.as_deref(), Some("plain"));
    }

    #[test]
    fn blank_values_fall_through_to_keychain() {
        let key = resolve_with(
            Provider::Judge0,
            Some("  "),
            |_| Some(String::new()),
            || Some(" stored \n".to_string()),
        );
        assert_eq!(key.as_deref(), Some("stored"));
    }

    #[test]
    fn nothing_configured_is_none() {
        assert!(resolve_with(Provider::Firestore, None, no_env, || None).is_none());
    }

    #[test]
    fn provider_names_round_trip() {
        for provider in [Provider::Gemini, Provider::Judge0, Provider::Firestore] {
            assert_eq!(provider.to_string().parse::<Provider>().unwrap(), provider);
        }
        assert!("openai".parse::<Provider>().is_err());
    }
}
