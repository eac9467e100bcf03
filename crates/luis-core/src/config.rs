//! Endpoint configuration.

use std::time::Duration;

use crate::error::{LuisError, Result};
use crate::gate::DEFAULT_MAX_REQUESTS;

/// Default timeout for one physical HTTP call: two minutes.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Default `take` used when paging application sub-collections.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// Default delay between training-status polls.
pub const DEFAULT_TRAINING_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Identity and limits of one remote subscription.
#[derive(Clone)]
pub struct SubscriptionConfig {
    /// Host serving the authoring API, e.g. `westus.api.cognitive.microsoft.com`.
    pub domain: String,
    pub subscription_key: String,
    /// Optional `user:password` credential; switches the authoring base path.
    pub basic_auth: Option<String>,
    /// Permit count of the concurrency gate.
    pub max_requests: usize,
    pub request_timeout: Duration,
    /// Page size for application sub-collections; `None` lets the remote decide.
    pub page_size: Option<u32>,
    pub training_poll_interval: Duration,
}

impl std::fmt::Debug for SubscriptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionConfig")
            .field("domain", &self.domain)
            .field("basic_auth", &self.basic_auth.as_ref().map(|_| "<redacted>"))
            .field("max_requests", &self.max_requests)
            .field("request_timeout", &self.request_timeout)
            .field("page_size", &self.page_size)
            .field("training_poll_interval", &self.training_poll_interval)
            .finish_non_exhaustive()
    }
}

impl SubscriptionConfig {
    pub fn new(domain: impl Into<String>, subscription_key: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            subscription_key: subscription_key.into(),
            basic_auth: None,
            max_requests: DEFAULT_MAX_REQUESTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            page_size: Some(DEFAULT_PAGE_SIZE),
            training_poll_interval: DEFAULT_TRAINING_POLL_INTERVAL,
        }
    }

    /// Reads `LUIS_DOMAIN`, `LUIS_SUBSCRIPTION_KEY`, `LUIS_BASIC_AUTH` and
    /// `LUIS_MAX_REQUESTS` from the environment.
    pub fn from_env() -> Result<Self> {
        let domain = std::env::var("LUIS_DOMAIN")
            .map_err(|_| LuisError::InvalidConfig(String::from("LUIS_DOMAIN is not set")))?;
        let key = std::env::var("LUIS_SUBSCRIPTION_KEY").map_err(|_| {
            LuisError::InvalidConfig(String::from("LUIS_SUBSCRIPTION_KEY is not set"))
        })?;

        let mut config = Self::new(domain, key);
        if let Ok(basic_auth) = std::env::var("LUIS_BASIC_AUTH") {
            config = config.with_basic_auth(basic_auth);
        }
        if let Ok(raw) = std::env::var("LUIS_MAX_REQUESTS") {
            let max_requests = raw.parse::<usize>().map_err(|_| {
                LuisError::InvalidConfig(format!("LUIS_MAX_REQUESTS must be a number: '{raw}'"))
            })?;
            config = config.with_max_requests(max_requests);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_basic_auth(mut self, credential: impl Into<String>) -> Self {
        let credential = credential.into();
        self.basic_auth = (!credential.is_empty()).then_some(credential);
        self
    }

    pub fn with_max_requests(mut self, max_requests: usize) -> Self {
        self.max_requests = max_requests;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_training_poll_interval(mut self, interval: Duration) -> Self {
        self.training_poll_interval = interval;
        self
    }

    /// Returns the effective timeout, using the default if zero.
    pub fn effective_timeout(&self) -> Duration {
        if self.request_timeout.is_zero() {
            DEFAULT_REQUEST_TIMEOUT
        } else {
            self.request_timeout
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.domain.trim().is_empty() {
            return Err(LuisError::InvalidConfig(String::from(
                "domain cannot be empty",
            )));
        }
        if self.domain.contains("://") || self.domain.contains('/') {
            return Err(LuisError::InvalidConfig(format!(
                "domain must be a bare host name: '{}'",
                self.domain
            )));
        }
        if self.subscription_key.trim().is_empty() {
            return Err(LuisError::InvalidConfig(String::from(
                "subscription key cannot be empty",
            )));
        }
        if self.max_requests == 0 {
            return Err(LuisError::InvalidConfig(String::from(
                "max_requests must be at least 1",
            )));
        }
        if self.page_size == Some(0) {
            return Err(LuisError::InvalidConfig(String::from(
                "page_size must be greater than zero",
            )));
        }
        Ok(())
    }
}
