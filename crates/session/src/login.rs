//! Login state machine.
//!
//! ```text
//!            bootstrap()                 token verified
//! Unconfigured ──────────► Pending ─────────────────────► Authenticated
//!      ▲                      │
//!      └──────────────────────┘  not addressable / rejected / error
//!
//! logout() goes back to Unconfigured from any phase.
//! ```
//!
//! Login with an existing token is a single identity check. Without one (or
//! when the check fails) the user is sent on a delegated login: the server
//! hands out an approval URL, the user approves it in a browser, and the
//! session polls until the server settles the request.
//!
//! The credential record is written to the [`CredentialSlot`] after every
//! change made by the protocol, and every change is announced to observers.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use opalview_api::{DelegatedLoginRequest, PollOutcome};
use opalview_api_client::{ApiClient, ClientError};
use opalview_core::{Credentials, CredentialsPatch};
use opalview_runtime_config::LoginSettings;
use tracing::{debug, info, warn};

use crate::observers::{Observers, SubscriptionId};
use crate::store::CredentialSlot;

pub const LOGIN_NEEDED: &str = "Login needed";
pub const LOGGED_OUT: &str = "Logged Out";
pub const LOGIN_FAILED: &str = "Login failed";
pub const DELEGATED_LOGIN_FAILED: &str = "Delegated login failed";
pub const NOT_LOGGED_IN: &str = "Not logged in";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionPhase {
    /// Some of tenant id, site, or email is missing, or the user logged out.
    #[default]
    Unconfigured,
    /// The login protocol is running.
    Pending,
    /// The token was verified and the user resolved.
    Authenticated,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Pending => "pending",
            Self::Authenticated => "authenticated",
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What observers are told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged {
        phase: SessionPhase,
        error: Option<String>,
    },
    CredentialsChanged(Credentials),
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SessionError {
    /// Not enough credential fields to attempt a login.
    #[error("{0}")]
    Configuration(String),
    /// The token or the delegated login was refused.
    #[error("{0}")]
    Authentication(String),
    #[error(transparent)]
    Transport(#[from] ClientError),
    #[error("Failed to persist credentials: {0}")]
    Storage(#[from] std::io::Error),
}

/// Opens the delegated login approval URL for the user. Fire-and-forget.
pub trait ApprovalOpener: Send + Sync {
    fn open(&self, url: &str);
}

impl<F: Fn(&str) + Send + Sync> ApprovalOpener for F {
    fn open(&self, url: &str) {
        self(url)
    }
}

#[derive(Debug, Clone)]
pub struct LoginOptions {
    pub poll_interval: Duration,
    pub integration: String,
    pub client_name: String,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self::from(&LoginSettings::default())
    }
}

impl From<&LoginSettings> for LoginOptions {
    fn from(settings: &LoginSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            integration: settings.integration.clone(),
            client_name: settings.client_name.clone(),
        }
    }
}

/// One delegated login attempt. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegatedTicket {
    pub client_token: String,
    pub server_token: String,
}

/// Client nonce for delegated logins: `{client_name} {YYYY-MM-DD} {6 chars}`.
pub fn make_client_token(client_name: &str) -> String {
    let date = chrono::Utc::now().format("%Y-%m-%d");
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{client_name} {date} {}", &suffix[..6])
}

#[derive(Debug, Default)]
struct State {
    creds: Credentials,
    phase: SessionPhase,
    error: Option<String>,
}

enum Step {
    Settled,
    /// A fresh token arrived; verify it.
    Restart,
}

/// Owns the credential record and drives the login protocol.
///
/// All mutation goes through this type; observers and callers only get
/// clones of the record.
pub struct LoginSession {
    api: ApiClient,
    slot: Box<dyn CredentialSlot>,
    opener: Box<dyn ApprovalOpener>,
    options: LoginOptions,
    client_token: String,
    state: Mutex<State>,
    observers: Observers<SessionEvent>,
}

impl std::fmt::Debug for LoginSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("LoginSession")
            .field("phase", &state.phase)
            .field("error", &state.error)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl LoginSession {
    /// Create a session starting from `creds`.
    pub fn new(
        api: ApiClient,
        slot: impl CredentialSlot + 'static,
        opener: impl ApprovalOpener + 'static,
        options: LoginOptions,
        creds: Credentials,
    ) -> Self {
        let client_token = make_client_token(&options.client_name);
        Self {
            api,
            slot: Box::new(slot),
            opener: Box::new(opener),
            options,
            client_token,
            state: Mutex::new(State {
                creds,
                ..State::default()
            }),
            observers: Observers::default(),
        }
    }

    /// Create a session from whatever the slot holds. Unreadable content
    /// yields an empty record.
    pub fn restore(
        api: ApiClient,
        slot: impl CredentialSlot + 'static,
        opener: impl ApprovalOpener + 'static,
        options: LoginOptions,
    ) -> Self {
        let creds = slot
            .load()
            .map(|text| Credentials::restore(&text))
            .unwrap_or_default();
        debug!(addressable = creds.is_addressable(), "restored credentials");
        Self::new(api, slot, opener, options, creds)
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn phase(&self) -> SessionPhase {
        self.state().phase
    }

    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    pub fn credentials(&self) -> Credentials {
        self.state().creds.clone()
    }

    pub fn client_token(&self) -> &str {
        &self.client_token
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn subscribe(
        &self,
        observer: impl Fn(&SessionEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    // ── Operations ────────────────────────────────────────────────────────

    /// Merge `patch` into the record. Does not change the phase; call
    /// [`bootstrap`](Self::bootstrap) to re-validate.
    pub fn set_credentials(&self, patch: CredentialsPatch) {
        if patch.is_empty() {
            return;
        }
        let creds = {
            let mut state = self.state();
            state.creds.apply(patch);
            state.creds.clone()
        };
        self.observers.notify(&SessionEvent::CredentialsChanged(creds));
    }

    /// Forget the token and email, and persist that.
    pub fn logout(&self) -> Result<(), SessionError> {
        self.set_credentials(CredentialsPatch {
            token: Some(String::new()),
            email: Some(String::new()),
            ..CredentialsPatch::default()
        });
        self.set_phase(SessionPhase::Unconfigured, Some(LOGGED_OUT.to_string()));
        self.persist()
    }

    /// Run the login protocol until it settles in `Authenticated` or
    /// `Unconfigured`, and return that phase.
    ///
    /// Safe to call again after it returns. Callers must not run two
    /// `bootstrap` calls on the same session at once; the protocol has no
    /// cancellation of its own. Dropping the future abandons the attempt.
    pub async fn bootstrap(&self) -> SessionPhase {
        loop {
            match self.bootstrap_once().await {
                Ok(Step::Settled) => break,
                Ok(Step::Restart) => continue,
                Err(e) => {
                    match &e {
                        SessionError::Configuration(_) => debug!("{e}"),
                        _ => warn!("Login failed: {e}"),
                    }
                    self.set_phase(SessionPhase::Unconfigured, Some(e.to_string()));
                    break;
                }
            }
        }
        self.phase()
    }

    /// Check the stored token and settle in `Authenticated` or
    /// `Unconfigured`. Unlike [`bootstrap`](Self::bootstrap) this never
    /// starts a delegated login.
    pub async fn verify(&self) -> SessionPhase {
        let outcome = async {
            let creds = self.credentials();
            if !creds.is_addressable() {
                return Err(SessionError::Configuration(LOGIN_NEEDED.to_string()));
            }
            if !creds.has_token() {
                return Ok(false);
            }
            self.set_phase(SessionPhase::Pending, None);
            self.check_token(&creds).await
        }
        .await;
        match outcome {
            Ok(true) => {}
            Ok(false) => {
                self.set_phase(SessionPhase::Unconfigured, Some(NOT_LOGGED_IN.to_string()))
            }
            Err(e) => self.set_phase(SessionPhase::Unconfigured, Some(e.to_string())),
        }
        self.phase()
    }

    async fn bootstrap_once(&self) -> Result<Step, SessionError> {
        debug!("bootstrap");
        self.persist()?;
        let creds = self.credentials();
        if !creds.is_addressable() {
            return Err(SessionError::Configuration(LOGIN_NEEDED.to_string()));
        }
        self.set_phase(SessionPhase::Pending, None);

        if creds.has_token() && self.check_token(&creds).await? {
            return Ok(Step::Settled);
        }

        // Don't hang on to a token that failed verification.
        self.set_credentials(CredentialsPatch::token(""));
        self.persist()?;

        let ticket = self.start_delegated_login().await?;
        self.poll_delegated_login(&ticket).await
    }

    /// Resolve the user behind the token. On success the user is stored and
    /// the phase becomes `Authenticated`.
    async fn check_token(&self, creds: &Credentials) -> Result<bool, SessionError> {
        let Some(user) = self.api.current_user(creds).await? else {
            debug!("stored token was not accepted");
            return Ok(false);
        };
        info!(user = %user.name, "token verified");
        self.set_credentials(CredentialsPatch::user(user));
        self.persist()?;
        self.set_phase(SessionPhase::Authenticated, None);
        Ok(true)
    }

    async fn start_delegated_login(&self) -> Result<DelegatedTicket, SessionError> {
        let creds = self.credentials();
        let req = DelegatedLoginRequest {
            user_email: creds.email.clone(),
            client_token: self.client_token.clone(),
            integration: self.options.integration.clone(),
        };
        let resp = self.api.start_delegated_login(&creds, &req).await?;

        let url = resp.url.filter(|u| !u.is_empty());
        let server_token = resp.server_token.filter(|t| !t.is_empty());
        let (Some(url), Some(server_token)) = (url, server_token) else {
            let message = resp
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DELEGATED_LOGIN_FAILED.to_string());
            return Err(SessionError::Authentication(message));
        };

        info!("waiting for delegated login approval");
        self.opener.open(&url);
        Ok(DelegatedTicket {
            client_token: req.client_token,
            server_token,
        })
    }

    /// Poll until the server settles the request. There is no client-side
    /// cap; the server expires stale requests and reports them as settled.
    async fn poll_delegated_login(&self, ticket: &DelegatedTicket) -> Result<Step, SessionError> {
        loop {
            tokio::time::sleep(self.options.poll_interval).await;
            let creds = self.credentials();
            let status = self
                .api
                .delegated_login_status(&creds, &ticket.server_token)
                .await?;
            match status.outcome() {
                PollOutcome::Unsettled => debug!("delegated login not settled yet"),
                PollOutcome::Rejected(message) => {
                    return Err(SessionError::Authentication(
                        message.unwrap_or_else(|| LOGIN_FAILED.to_string()),
                    ));
                }
                PollOutcome::Accepted(key) => {
                    info!("delegated login accepted");
                    self.set_credentials(CredentialsPatch::token(key));
                    self.persist()?;
                    return Ok(Step::Restart);
                }
            }
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn set_phase(&self, phase: SessionPhase, error: Option<String>) {
        {
            let mut state = self.state();
            if state.phase != phase {
                info!(from = %state.phase, to = %phase, "login phase");
            }
            state.phase = phase;
            state.error = error.clone();
        }
        self.observers.notify(&SessionEvent::PhaseChanged { phase, error });
    }

    fn persist(&self) -> Result<(), SessionError> {
        let text = self.state().creds.to_json();
        self.slot.save(&text)?;
        Ok(())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
