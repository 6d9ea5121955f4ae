use std::sync::{Arc, PoisonError, RwLock};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::error::ConfigError;

const ORGANIZATION_HEADER: &str = "OpenAI-Organization";

/// The credentials attached to every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    organization: Option<String>,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            organization: None,
        }
    }

    /// Scopes requests to an organization via the `OpenAI-Organization` header.
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn organization(&self) -> Option<&str> {
        self.organization.as_deref()
    }

    pub(crate) fn headers(&self) -> Result<HeaderMap, ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        let mut headers = HeaderMap::new();

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| ConfigError::InvalidHeaderValue("Authorization"))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        if let Some(organization) = self.organization.as_deref().filter(|o| !o.is_empty()) {
            let value = HeaderValue::from_str(organization)
                .map_err(|_| ConfigError::InvalidHeaderValue(ORGANIZATION_HEADER))?;
            headers.insert(ORGANIZATION_HEADER, value);
        }

        Ok(headers)
    }
}

// keep the key out of logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("organization", &self.organization)
            .finish()
    }
}

/// Any type that can provide the credentials for a request.
///
/// Credentials are resolved once per request, before the request is built, so a
/// provider is free to hand out different credentials over time.
pub trait AuthTokenProvider: Clone {
    async fn resolve(&self) -> Option<Credentials>;
}

/// Auth provider that reads `OPENAI_API_KEY` and, optionally, `OPENAI_ORGANIZATION`
/// from the environment on every request.
#[derive(Clone)]
pub struct EnvironmentAuthTokenProvider;

impl EnvironmentAuthTokenProvider {
    const ENV_VAR: &'static str = "OPENAI_API_KEY";
    const ORGANIZATION_ENV_VAR: &'static str = "OPENAI_ORGANIZATION";
}

impl AuthTokenProvider for EnvironmentAuthTokenProvider {
    async fn resolve(&self) -> Option<Credentials> {
        let api_key = std::env::var(Self::ENV_VAR).ok()?;
        let credentials = Credentials::new(api_key);
        Some(match std::env::var(Self::ORGANIZATION_ENV_VAR) {
            Ok(organization) => credentials.with_organization(organization),
            Err(_) => credentials,
        })
    }
}

/// Auth provider with fixed credentials.
#[derive(Clone, Debug)]
pub struct StaticAuthTokenProvider(Credentials);

impl StaticAuthTokenProvider {
    pub fn new(credentials: Credentials) -> Self {
        Self(credentials)
    }
}

impl AuthTokenProvider for StaticAuthTokenProvider {
    async fn resolve(&self) -> Option<Credentials> {
        Some(self.0.clone())
    }
}

/// Auth provider whose credentials can be swapped while the client is in use.
///
/// Clones share the same slot, so rotating through any clone (including the one held
/// by an `OpenAI` handle) affects every subsequent request. Requests already in flight
/// keep the credentials they resolved.
#[derive(Clone, Debug, Default)]
pub struct RotatingAuthTokenProvider {
    current: Arc<RwLock<Option<Credentials>>>,
}

impl RotatingAuthTokenProvider {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            current: Arc::new(RwLock::new(Some(credentials))),
        }
    }

    /// Replaces the credentials used by subsequent requests.
    pub fn rotate(&self, credentials: Credentials) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(credentials);
        tracing::debug!("rotated OpenAI credentials");
    }

    /// Removes the credentials; requests fail with a configuration error until the next
    /// rotation.
    pub fn revoke(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl AuthTokenProvider for RotatingAuthTokenProvider {
    async fn resolve(&self) -> Option<Credentials> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
