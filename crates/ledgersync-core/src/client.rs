//! Remote action catalog
//!
//! One method per remote action. Command actions (login, deposit, ...)
//! answer with free text whose success is recognised by a marker
//! substring; query actions answer with one of the three list formats and
//! go through the matching parser.
//!
//! The substring contract is fragile and lives only here: each action has
//! a [`SuccessRule`], replaceable with [`ActionClient::with_success_rule`]
//! if the remote wording changes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::model::{Admin, Holder, LogEntry, Penalty};
use crate::notify::Notifier;
use crate::parse::{self, Parsed};
use crate::traits::{Params, Transport};

/// Remote actions understood by the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Login,
    VerifyOtp,
    Logout,
    AddHolder,
    ListHolders,
    Deposit,
    Withdraw,
    AddPenalty,
    GetPenalties,
    ReadLogs,
    ReadAdmins,
}

impl Action {
    /// Every action, commands first
    pub const ALL: [Action; 11] = [
        Action::Login,
        Action::VerifyOtp,
        Action::Logout,
        Action::AddHolder,
        Action::Deposit,
        Action::Withdraw,
        Action::AddPenalty,
        Action::ListHolders,
        Action::GetPenalties,
        Action::ReadLogs,
        Action::ReadAdmins,
    ];

    /// Value of the `action` query parameter
    pub fn wire_name(self) -> &'static str {
        match self {
            Action::Login => "login",
            Action::VerifyOtp => "verifyOTP",
            Action::Logout => "logout",
            Action::AddHolder => "addholder",
            Action::ListHolders => "tget",
            Action::Deposit => "deposit",
            Action::Withdraw => "withdraw",
            Action::AddPenalty => "addPenalty",
            Action::GetPenalties => "getPenalty",
            Action::ReadLogs => "readlogs",
            Action::ReadAdmins => "readadmin",
        }
    }

    /// Command actions mutate server state and answer with free text
    pub fn is_command(self) -> bool {
        !matches!(
            self,
            Action::ListHolders | Action::GetPenalties | Action::ReadLogs | Action::ReadAdmins
        )
    }

    /// Success rule used unless overridden
    pub fn default_success_rule(self) -> SuccessRule {
        match self {
            Action::Login => SuccessRule::contains("OTP sent"),
            Action::VerifyOtp | Action::Deposit | Action::Withdraw => {
                SuccessRule::contains("successful")
            }
            Action::AddHolder | Action::AddPenalty => SuccessRule::contains("successfully"),
            _ => SuccessRule::Any,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// How a command response is recognised as a success
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessRule {
    /// The text contains this marker
    Contains(String),
    /// The text contains at least one of these markers
    ContainsAny(Vec<String>),
    /// Any response counts as success
    Any,
}

impl SuccessRule {
    pub fn contains(marker: impl Into<String>) -> Self {
        SuccessRule::Contains(marker.into())
    }

    /// Whether `text` signals success
    pub fn accepts(&self, text: &str) -> bool {
        match self {
            SuccessRule::Contains(marker) => text.contains(marker.as_str()),
            SuccessRule::ContainsAny(markers) => markers.iter().any(|m| text.contains(m.as_str())),
            SuccessRule::Any => true,
        }
    }
}

/// Decoded result of a command action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The response carried the success marker
    Success { message: String },
    /// Anything else; `message` is the server's text, unchanged
    Rejected { message: String },
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Success { .. })
    }

    /// The server's text
    pub fn message(&self) -> &str {
        match self {
            CommandOutcome::Success { message } | CommandOutcome::Rejected { message } => message,
        }
    }

    /// `Rejected` becomes [`Error::RemoteRejected`]
    pub fn into_result(self) -> Result<String> {
        match self {
            CommandOutcome::Success { message } => Ok(message),
            CommandOutcome::Rejected { message } => Err(Error::rejected(message)),
        }
    }
}

/// Credentials for the `login` action
#[derive(Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Free-form origin tag, sent as `ip`
    pub origin: Option<String>,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<REDACTED>")
            .field("origin", &self.origin)
            .finish()
    }
}

/// One-time code for the `verifyOTP` action
#[derive(Clone)]
pub struct OtpRequest {
    pub email: String,
    pub otp: String,
}

impl fmt::Debug for OtpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpRequest")
            .field("email", &self.email)
            .field("otp", &"<REDACTED>")
            .finish()
    }
}

/// Input for the `addholder` action
#[derive(Debug, Clone, PartialEq)]
pub struct NewHolder {
    /// May be empty to let the server assign one
    pub hid: String,
    pub full_name: String,
    pub mobile: String,
    pub email: String,
}

/// Input for the `deposit` action; `email` is the acting user
#[derive(Debug, Clone, PartialEq)]
pub struct DepositRequest {
    pub hid: String,
    pub amount: f64,
    pub note: String,
    pub email: String,
}

/// Input for the `withdraw` action; `email` is the acting user
#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawRequest {
    pub hid: String,
    pub amount: f64,
    /// Withdrawal fee
    pub charges: f64,
    pub note: String,
    pub email: String,
}

/// Input for the `addPenalty` action; `email` is the acting user
#[derive(Debug, Clone, PartialEq)]
pub struct PenaltyRequest {
    pub hid: String,
    pub amount: f64,
    pub reason: String,
    pub email: String,
}

/// Typed client over a [`Transport`]
pub struct ActionClient {
    transport: Arc<dyn Transport>,
    rules: HashMap<Action, SuccessRule>,
    notifier: Notifier,
}

impl ActionClient {
    /// Create a client with the default success rules
    pub fn new(transport: Arc<dyn Transport>, notifier: Notifier) -> Self {
        let rules = Action::ALL
            .iter()
            .filter(|a| a.is_command())
            .map(|&a| (a, a.default_success_rule()))
            .collect();

        Self {
            transport,
            rules,
            notifier,
        }
    }

    /// Replace the success rule of one command action
    pub fn with_success_rule(mut self, action: Action, rule: SuccessRule) -> Self {
        self.rules.insert(action, rule);
        self
    }

    /// Route transport failures to `notifier` instead
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// Rule currently applied to `action`
    pub fn success_rule(&self, action: Action) -> SuccessRule {
        self.rules
            .get(&action)
            .cloned()
            .unwrap_or_else(|| action.default_success_rule())
    }

    pub async fn login(&self, req: &LoginRequest) -> Result<CommandOutcome> {
        let mut params = vec![("email", req.email.clone()), ("password", req.password.clone())];
        if let Some(origin) = &req.origin {
            params.push(("ip", origin.clone()));
        }
        self.command(Action::Login, &params).await
    }

    pub async fn verify_otp(&self, req: &OtpRequest) -> Result<CommandOutcome> {
        self.command(
            Action::VerifyOtp,
            &[("email", req.email.clone()), ("otp", req.otp.clone())],
        )
        .await
    }

    pub async fn logout(&self, email: &str) -> Result<CommandOutcome> {
        self.command(Action::Logout, &[("email", email.to_string())])
            .await
    }

    pub async fn add_holder(&self, holder: &NewHolder) -> Result<CommandOutcome> {
        self.command(
            Action::AddHolder,
            &[
                ("hid", holder.hid.clone()),
                ("fullname", holder.full_name.clone()),
                ("mob", holder.mobile.clone()),
                ("email", holder.email.clone()),
            ],
        )
        .await
    }

    pub async fn deposit(&self, req: &DepositRequest) -> Result<CommandOutcome> {
        self.command(
            Action::Deposit,
            &[
                ("hid", req.hid.clone()),
                ("damount", req.amount.to_string()),
                ("note", req.note.clone()),
                ("email", req.email.clone()),
            ],
        )
        .await
    }

    pub async fn withdraw(&self, req: &WithdrawRequest) -> Result<CommandOutcome> {
        self.command(
            Action::Withdraw,
            &[
                ("hid", req.hid.clone()),
                ("wamount", req.amount.to_string()),
                ("camount", req.charges.to_string()),
                ("note", req.note.clone()),
                ("email", req.email.clone()),
            ],
        )
        .await
    }

    pub async fn add_penalty(&self, req: &PenaltyRequest) -> Result<CommandOutcome> {
        self.command(
            Action::AddPenalty,
            &[
                ("hid", req.hid.clone()),
                ("pamount", req.amount.to_string()),
                ("reason", req.reason.clone()),
                ("email", req.email.clone()),
            ],
        )
        .await
    }

    /// Full holder snapshot; empty when the transport fails
    pub async fn list_holders(&self) -> Parsed<Holder> {
        self.query(Action::ListHolders, &[], parse::parse_holders)
            .await
    }

    /// Penalties of one holder; empty when the transport fails
    pub async fn list_penalties(&self, hid: &str) -> Parsed<Penalty> {
        self.query(Action::GetPenalties, &[("hid", hid.to_string())], |text| {
            parse::parse_penalties(text, hid)
        })
        .await
    }

    /// Audit log; empty when the transport fails
    pub async fn read_logs(&self) -> Parsed<LogEntry> {
        self.query(Action::ReadLogs, &[], parse::parse_logs).await
    }

    /// Admin list; empty when the transport fails
    pub async fn read_admins(&self) -> Parsed<Admin> {
        self.query(Action::ReadAdmins, &[], parse::parse_admins)
            .await
    }

    async fn command(&self, action: Action, params: &Params) -> Result<CommandOutcome> {
        let text = self.send(action, params).await?;

        if self.success_rule(action).accepts(&text) {
            debug!("{} accepted", action);
            Ok(CommandOutcome::Success { message: text })
        } else {
            debug!("{} rejected by remote", action);
            Ok(CommandOutcome::Rejected { message: text })
        }
    }

    async fn query<T>(
        &self,
        action: Action,
        params: &Params,
        decode: impl FnOnce(&str) -> Parsed<T>,
    ) -> Parsed<T> {
        match self.send(action, params).await {
            Ok(text) => decode(&text),
            Err(_) => Parsed::empty(),
        }
    }

    /// Send through the transport; failures also go to the notifier
    async fn send(&self, action: Action, params: &Params) -> Result<String> {
        debug!("Sending {} via {}", action, self.transport.name());

        self.transport
            .request(action.wire_name(), params)
            .await
            .inspect_err(|e| {
                error!("{} failed: {}", action, e);
                self.notifier.failure(e.to_string());
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::SyncEvent;
    use async_trait::async_trait;
    use std::sync::Mutex;

    type Calls = Arc<Mutex<Vec<(String, Vec<(&'static str, String)>)>>>;

    /// Answers every action with the same reply and records the calls
    struct FixedTransport {
        reply: std::result::Result<String, &'static str>,
        calls: Calls,
    }

    impl FixedTransport {
        fn ok(body: &str) -> (Arc<Self>, Calls) {
            Self::with(Ok(body.to_string()))
        }

        fn failing() -> (Arc<Self>, Calls) {
            Self::with(Err("connection refused"))
        }

        fn with(reply: std::result::Result<String, &'static str>) -> (Arc<Self>, Calls) {
            let calls = Calls::default();
            (
                Arc::new(Self {
                    reply,
                    calls: calls.clone(),
                }),
                calls,
            )
        }
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn request(&self, action: &str, params: &Params) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((action.to_string(), params.to_vec()));
            self.reply.clone().map_err(Error::transport)
        }
    }

    #[test]
    fn wire_names_and_kinds() {
        let names: Vec<&str> = Action::ALL.iter().map(|a| a.wire_name()).collect();
        assert_eq!(
            names,
            [
                "login",
                "verifyOTP",
                "logout",
                "addholder",
                "deposit",
                "withdraw",
                "addPenalty",
                "tget",
                "getPenalty",
                "readlogs",
                "readadmin"
            ]
        );
        assert_eq!(Action::ALL.iter().filter(|a| a.is_command()).count(), 7);
    }

    #[test]
    fn default_markers() {
        assert!(Action::Login.default_success_rule().accepts("OTP sent to a@b.com"));
        assert!(!Action::Login.default_success_rule().accepts("Invalid password"));
        assert!(Action::Deposit.default_success_rule().accepts("Deposit successful"));
        assert!(!Action::AddHolder.default_success_rule().accepts("Holder added successful"));
        assert!(Action::AddPenalty.default_success_rule().accepts("Penalty added successfully"));
        assert!(Action::Logout.default_success_rule().accepts(""));
    }

    #[tokio::test]
    async fn deposit_builds_params_and_decodes_success() {
        let (transport, calls) = FixedTransport::ok("Deposit successful. New balance: 5000");
        let client = ActionClient::new(transport, Notifier::disabled());

        let outcome = client
            .deposit(&DepositRequest {
                hid: "H1".into(),
                amount: 500.0,
                note: "cash".into(),
                email: "admin@bank.com".into(),
            })
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.message(), "Deposit successful. New balance: 5000");

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0].0, "deposit");
        assert_eq!(
            calls[0].1,
            vec![
                ("hid", "H1".to_string()),
                ("damount", "500".to_string()),
                ("note", "cash".to_string()),
                ("email", "admin@bank.com".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn rejection_keeps_server_text() {
        let (transport, _) = FixedTransport::ok("Insufficient balance");
        let client = ActionClient::new(transport, Notifier::disabled());

        let outcome = client
            .withdraw(&WithdrawRequest {
                hid: "H1".into(),
                amount: 12.5,
                charges: 1.0,
                note: String::new(),
                email: "admin@bank.com".into(),
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CommandOutcome::Rejected {
                message: "Insufficient balance".into()
            }
        );
        let err = outcome.into_result().unwrap_err();
        assert!(matches!(err, Error::RemoteRejected(ref m) if m == "Insufficient balance"));
    }

    #[tokio::test]
    async fn login_sends_origin_only_when_present() {
        let (transport, calls) = FixedTransport::ok("OTP sent");
        let client = ActionClient::new(transport, Notifier::disabled());

        let mut req = LoginRequest {
            email: "a@b.com".into(),
            password: "pw".into(),
            origin: Some("Web Client".into()),
        };
        client.login(&req).await.unwrap();
        req.origin = None;
        client.login(&req).await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0].1.len(), 3);
        assert_eq!(calls[0].1[2], ("ip", "Web Client".to_string()));
        assert_eq!(calls[1].1.len(), 2);
    }

    #[tokio::test]
    async fn overridden_rule_applies() {
        let (transport, _) = FixedTransport::ok("Code dispatched");
        let client = ActionClient::new(transport, Notifier::disabled()).with_success_rule(
            Action::Login,
            SuccessRule::ContainsAny(vec!["OTP sent".into(), "Code dispatched".into()]),
        );

        let outcome = client
            .login(&LoginRequest {
                email: "a@b.com".into(),
                password: "pw".into(),
                origin: None,
            })
            .await
            .unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn transport_failure_notifies_and_errors() {
        let (transport, _) = FixedTransport::failing();
        let (notifier, mut rx) = Notifier::channel(8);
        let client = ActionClient::new(transport, notifier);

        let err = client.logout("a@b.com").await.unwrap_err();
        assert!(err.is_transport_failure());

        let holders = client.list_holders().await;
        assert!(holders.is_empty());

        for _ in 0..2 {
            assert!(matches!(rx.recv().await, Some(SyncEvent::Failure { .. })));
        }
    }

    #[tokio::test]
    async fn penalties_query_passes_hid_to_parser() {
        let (transport, calls) =
            FixedTransport::ok("Penalty Details:\nDate: 2024-01-05, Amount: 200, Reason: late fee");
        let client = ActionClient::new(transport, Notifier::disabled());

        let parsed = client.list_penalties("H42").await;
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.records[0].hid, "H42");
        assert_eq!(calls.lock().unwrap()[0].1, vec![("hid", "H42".to_string())]);
    }

    #[test]
    fn secrets_are_redacted() {
        let login = LoginRequest {
            email: "a@b.com".into(),
            password: "hunter2".into(),
            origin: None,
        };
        let otp = OtpRequest {
            email: "a@b.com".into(),
            otp: "123456".into(),
        };
        assert!(!format!("{login:?}").contains("hunter2"));
        assert!(!format!("{otp:?}").contains("123456"));
    }
}
