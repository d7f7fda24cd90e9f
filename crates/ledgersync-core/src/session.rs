//! Authentication state machine
//!
//! ```text
//! Anonymous ──login──▶ CredentialsSubmitted ──"OTP sent"──▶ OtpPending
//!     ▲                        │ rejected                      │ verify ok
//!     │◀───────────────────────┘                               ▼
//!     └──────────────────────logout─────────────────── Authenticated(Session)
//! ```
//!
//! A [`Session`] exists in memory exactly while the state is
//! `Authenticated`. It is persisted through a [`SessionStore`] on
//! successful verification and restored on start; a persisted record that
//! does not decode is discarded, not reported.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::client::{ActionClient, LoginRequest, OtpRequest};
use crate::config::SessionConfig;
use crate::error::Error;
use crate::model::Session;
use crate::notify::{Notifier, SyncEvent};
use crate::traits::SessionStore;

/// Where the authentication flow currently stands
#[derive(Clone, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    /// Login request in flight
    CredentialsSubmitted { email: String },
    /// OTP issued and awaiting verification
    OtpPending {
        email: String,
        /// Kept in memory only, for resend
        password: String,
        origin: Option<String>,
        issued_at: DateTime<Utc>,
    },
    Authenticated(Session),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthState::Anonymous => f.write_str("Anonymous"),
            AuthState::CredentialsSubmitted { email } => f
                .debug_struct("CredentialsSubmitted")
                .field("email", email)
                .finish(),
            AuthState::OtpPending {
                email,
                origin,
                issued_at,
                ..
            } => f
                .debug_struct("OtpPending")
                .field("email", email)
                .field("password", &"<REDACTED>")
                .field("origin", origin)
                .field("issued_at", issued_at)
                .finish(),
            AuthState::Authenticated(session) => {
                f.debug_tuple("Authenticated").field(session).finish()
            }
        }
    }
}

/// Owns the authentication state and the persisted session record
pub struct SessionManager {
    client: Arc<ActionClient>,
    store: Arc<dyn SessionStore>,
    storage_key: String,
    otp_expiry: Duration,
    origin: Option<String>,
    state: RwLock<AuthState>,
    last_error: RwLock<Option<String>>,
    notifier: Notifier,
}

impl SessionManager {
    /// Create a manager in the `Anonymous` state; call [`restore`](Self::restore) next
    pub fn new(
        client: Arc<ActionClient>,
        store: Arc<dyn SessionStore>,
        config: &SessionConfig,
        notifier: Notifier,
    ) -> Self {
        Self {
            client,
            store,
            storage_key: config.storage_key.clone(),
            otp_expiry: config.otp_expiry(),
            origin: Some(config.origin.clone()).filter(|o| !o.is_empty()),
            state: RwLock::new(AuthState::Anonymous),
            last_error: RwLock::new(None),
            notifier,
        }
    }

    /// Load the persisted session, if any
    ///
    /// A record that is missing is no session. A record that does not
    /// decode is removed and reported as an expired session.
    pub async fn restore(&self) -> Option<Session> {
        let raw = match self.store.get(&self.storage_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No persisted session");
                return None;
            }
            Err(e) => {
                warn!("Failed to read persisted session: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => {
                info!("Restored session for {}", session.email);
                *self.state.write().await = AuthState::Authenticated(session.clone());
                Some(session)
            }
            Err(e) => {
                warn!("Discarding malformed persisted session: {}", e);
                if let Err(e) = self.store.remove(&self.storage_key).await {
                    warn!("Failed to clear malformed session: {}", e);
                }
                self.notifier.emit(SyncEvent::SessionExpired);
                None
            }
        }
    }

    /// Submit credentials; true when the server issued an OTP
    ///
    /// `origin` overrides the configured origin tag.
    pub async fn login(&self, email: &str, password: &str, origin: Option<&str>) -> bool {
        {
            let mut state = self.state.write().await;
            if state.is_authenticated() {
                drop(state);
                self.fail("already signed in; log out first").await;
                return false;
            }
            *state = AuthState::CredentialsSubmitted {
                email: email.to_string(),
            };
        }
        self.set_error(None).await;

        let origin = origin.map(str::to_string).or_else(|| self.origin.clone());
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            origin: origin.clone(),
        };

        match self.client.login(&request).await {
            Ok(outcome) if outcome.is_success() => {
                info!("OTP issued for {}", email);
                *self.state.write().await = AuthState::OtpPending {
                    email: email.to_string(),
                    password: password.to_string(),
                    origin,
                    issued_at: Utc::now(),
                };
                self.notifier.success("OTP sent to your email");
                true
            }
            Ok(outcome) => {
                *self.state.write().await = AuthState::Anonymous;
                self.fail(outcome.message()).await;
                false
            }
            Err(e) => {
                *self.state.write().await = AuthState::Anonymous;
                self.set_error(Some(e.to_string())).await;
                false
            }
        }
    }

    /// Verify the OTP; on success the session is created and persisted
    pub async fn verify_otp(&self, email: &str, code: &str) -> bool {
        if self.is_authenticated().await {
            self.fail("already signed in; log out first").await;
            return false;
        }
        self.set_error(None).await;

        let request = OtpRequest {
            email: email.to_string(),
            otp: code.to_string(),
        };

        match self.client.verify_otp(&request).await {
            Ok(outcome) if outcome.is_success() => {
                let session = Session::admin(email);
                self.persist(&session).await;
                *self.state.write().await = AuthState::Authenticated(session.clone());

                info!("Signed in as {}", email);
                self.notifier.success("Login successful");
                self.notifier.emit(SyncEvent::Authenticated { session });
                true
            }
            Ok(outcome) => {
                self.fail(outcome.message()).await;
                false
            }
            Err(e) => {
                self.set_error(Some(e.to_string())).await;
                false
            }
        }
    }

    /// Ask for a new OTP with the credentials of the pending login
    ///
    /// Allowed only while an OTP is pending and its cooldown has run out.
    pub async fn resend_otp(&self) -> bool {
        self.resend_otp_at(Utc::now()).await
    }

    /// [`resend_otp`](Self::resend_otp) as of `now`; a sent OTP restarts
    /// the cooldown from `now`
    pub async fn resend_otp_at(&self, now: DateTime<Utc>) -> bool {
        let pending = match &*self.state.read().await {
            AuthState::OtpPending {
                email,
                password,
                origin,
                ..
            } => Some((email.clone(), password.clone(), origin.clone())),
            _ => None,
        };
        let Some((email, password, origin)) = pending else {
            self.fail("no OTP is pending").await;
            return false;
        };

        if let Some(remaining) = self.otp_cooldown_remaining(now).await {
            self.fail(format!(
                "OTP can be resent in {} second(s)",
                remaining.as_secs().max(1)
            ))
            .await;
            return false;
        }

        let request = LoginRequest {
            email: email.clone(),
            password: password.clone(),
            origin: origin.clone(),
        };

        match self.client.login(&request).await {
            Ok(outcome) if outcome.is_success() => {
                self.set_error(None).await;
                *self.state.write().await = AuthState::OtpPending {
                    email,
                    password,
                    origin,
                    issued_at: now,
                };
                self.notifier.success("OTP sent to your email");
                true
            }
            Ok(outcome) => {
                self.fail(outcome.message()).await;
                false
            }
            Err(e) => {
                self.set_error(Some(e.to_string())).await;
                false
            }
        }
    }

    /// Time left before a resend is allowed, derived from the issue time
    ///
    /// `None` when nothing is pending or the window has passed.
    pub async fn otp_cooldown_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let AuthState::OtpPending { issued_at, .. } = &*self.state.read().await else {
            return None;
        };

        let elapsed = now.signed_duration_since(*issued_at).to_std().unwrap_or_default();
        self.otp_expiry
            .checked_sub(elapsed)
            .filter(|remaining| !remaining.is_zero())
    }

    /// End the session
    ///
    /// The remote call is best effort; local state and the persisted
    /// record are cleared regardless of its outcome.
    pub async fn logout(&self) {
        let email = self.current().await.map(|s| s.email);

        if let Some(email) = &email {
            match self.client.logout(email).await {
                Ok(outcome) => debug!("Remote logout: {}", outcome.message()),
                Err(e) => warn!("Remote logout failed: {}", e),
            }
        }

        *self.state.write().await = AuthState::Anonymous;
        if let Err(e) = self.store.remove(&self.storage_key).await {
            warn!("Failed to clear persisted session: {}", e);
        }
        self.set_error(None).await;

        info!("Signed out");
        self.notifier.success("Logged out successfully");
        self.notifier.emit(SyncEvent::SessionExpired);
    }

    /// Current state
    pub async fn state(&self) -> AuthState {
        self.state.read().await.clone()
    }

    /// Authenticated session, if any
    pub async fn current(&self) -> Option<Session> {
        match &*self.state.read().await {
            AuthState::Authenticated(session) => Some(session.clone()),
            _ => None,
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_authenticated()
    }

    /// Message of the last failed attempt; cleared by the next attempt
    pub async fn error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    async fn persist(&self, session: &Session) {
        let stored = match serde_json::to_string(session) {
            Ok(json) => self.store.set(&self.storage_key, &json).await,
            Err(e) => Err(Error::from(e)),
        };
        if let Err(e) = stored {
            warn!("Failed to persist session: {}", e);
        }
    }

    async fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        self.notifier.failure(message.clone());
        self.set_error(Some(message)).await;
    }

    async fn set_error(&self, error: Option<String>) {
        *self.last_error.write().await = error;
    }
}
