//! Configuration types for the synchronization layer

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the remote endpoint; every action is a GET against it
    pub endpoint: String,

    /// Transport settings
    #[serde(default)]
    pub transport: TransportConfig,

    /// Session settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Capacity of the notification channel
    ///
    /// When full, new notifications are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl SyncConfig {
    /// Create a configuration for `endpoint` with defaults everywhere else
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport: TransportConfig::default(),
            session: SessionConfig::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Use a specific session store
    pub fn with_session_store(mut self, store: SessionStoreConfig) -> Self {
        self.session.store = store;
        self
    }

    /// Use a specific request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport.timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.endpoint.is_empty() {
            return Err(crate::Error::config("Endpoint URL cannot be empty"));
        }
        if !self.endpoint.starts_with("https://") && !self.endpoint.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "Endpoint must use HTTP or HTTPS scheme. Got: {}",
                self.endpoint
            )));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        self.transport.validate()?;
        self.session.validate()?;

        Ok(())
    }
}

/// Transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Deadline for one request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl TransportConfig {
    /// Request deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the transport configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(1..=300).contains(&self.timeout_secs) {
            return Err(crate::Error::config(format!(
                "Transport timeout must be between 1 and 300 seconds. Got: {}",
                self.timeout_secs
            )));
        }
        Ok(())
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Where the authenticated session is persisted
    #[serde(default)]
    pub store: SessionStoreConfig,

    /// Key the session record is stored under
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// OTP validity window; also the resend cooldown
    #[serde(default = "default_otp_expiry_secs")]
    pub otp_expiry_secs: u64,

    /// Origin tag sent with login as the `ip` parameter
    #[serde(default = "default_origin")]
    pub origin: String,
}

impl SessionConfig {
    /// OTP validity window
    pub fn otp_expiry(&self) -> Duration {
        Duration::from_secs(self.otp_expiry_secs)
    }

    /// Validate the session configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.storage_key.is_empty() {
            return Err(crate::Error::config("Session storage key cannot be empty"));
        }
        if self.otp_expiry_secs == 0 {
            return Err(crate::Error::config("OTP expiry must be > 0"));
        }
        if let SessionStoreConfig::File { path } = &self.store
            && path.is_empty()
        {
            return Err(crate::Error::config("Session file path cannot be empty"));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store: SessionStoreConfig::default(),
            storage_key: default_storage_key(),
            otp_expiry_secs: default_otp_expiry_secs(),
            origin: default_origin(),
        }
    }
}

/// Session store configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionStoreConfig {
    /// File-based store
    File {
        /// Path to the session file
        path: String,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_storage_key() -> String {
    "bankUser".to_string()
}

fn default_otp_expiry_secs() -> u64 {
    300
}

fn default_origin() -> String {
    "Web Client".to_string()
}

fn default_event_channel_capacity() -> usize {
    1000
}
