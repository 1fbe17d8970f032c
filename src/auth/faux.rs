//! Stub provider for tests and local development
//!
//! Performs no network I/O. The authorization URL points at a fixed
//! endpoint and completion returns a canned user for any `code`.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::provider::{Provider, ProviderError, User};
use crate::params::Params;

#[derive(Debug, Clone)]
pub struct FauxProvider {
    name: String,
    auth_endpoint: String,
    client_id: String,
    rejected_codes: HashSet<String>,
}

impl FauxProvider {
    pub fn new() -> Self {
        Self {
            name: "faux".to_string(),
            auth_endpoint: "http://example.com/auth".to_string(),
            client_id: "faux-client".to_string(),
            rejected_codes: HashSet::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_auth_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.auth_endpoint = endpoint.into();
        self
    }

    /// Make the exchange fail for `code`
    pub fn reject_code(mut self, code: impl Into<String>) -> Self {
        self.rejected_codes.insert(code.into());
        self
    }
}

impl Default for FauxProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for FauxProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn authorization_url(&self, state: &str) -> Result<String, ProviderError> {
        let url = url::Url::parse_with_params(
            &self.auth_endpoint,
            [
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("state", state),
            ],
        )
        .map_err(|e| ProviderError::new(format!("invalid authorization endpoint: {e}")))?;

        Ok(url.into())
    }

    async fn complete_exchange(&self, params: &Params) -> Result<User, ProviderError> {
        let code = params
            .get("code")
            .ok_or_else(|| ProviderError::new("missing authorization code"))?;

        if self.rejected_codes.contains(code) {
            return Err(ProviderError::new("invalid_grant: authorization code rejected"));
        }

        Ok(User {
            provider: self.name.clone(),
            user_id: "1234567890".to_string(),
            email: "homer@example.com".to_string(),
            name: "Homer Simpson".to_string(),
            first_name: "Homer".to_string(),
            last_name: "Simpson".to_string(),
            nick_name: "HomerJ".to_string(),
            description: "Safety inspector".to_string(),
            avatar_url: "http://example.com/avatar.png".to_string(),
            location: "Springfield".to_string(),
            access_token: format!("faux-access-{code}"),
            refresh_token: "faux-refresh".to_string(),
            expires_at: Some(Utc::now() + Duration::hours(1)),
            ..User::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_url_embeds_state() {
        let provider = FauxProvider::new();
        let url = provider.authorization_url("abc-_123").unwrap();
        assert!(url.starts_with("http://example.com/auth?"));
        assert!(url.contains("state=abc-_123"));
        assert!(url.contains("client_id=faux-client"));
    }

    #[tokio::test]
    async fn exchange_requires_code() {
        let provider = FauxProvider::new();
        let error = provider
            .complete_exchange(&Params::default())
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "missing authorization code");
    }

    #[tokio::test]
    async fn exchange_returns_user() {
        let provider = FauxProvider::new();
        let user = provider
            .complete_exchange(&Params::from_query("code=test-code"))
            .await
            .unwrap();
        assert_eq!(user.provider, "faux");
        assert_eq!(user.email, "homer@example.com");
        assert_eq!(user.access_token, "faux-access-test-code");
    }

    #[tokio::test]
    async fn rejected_code_fails() {
        let provider = FauxProvider::new().reject_code("bad");
        let error = provider
            .complete_exchange(&Params::from_query("code=bad"))
            .await
            .unwrap_err();
        assert!(error.to_string().starts_with("invalid_grant"));
    }
}
