// # ledgersync - Ledger Command-Line Client
//
// Thin integration layer over ledgersync-core: every ledger rule lives in
// the library. This binary is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Building a `SyncContext` with the HTTP transport
// 4. Running one command and printing its result
//
// ## Configuration
//
// - `LEDGERSYNC_ENDPOINT`: Base URL of the ledger endpoint (required)
// - `LEDGERSYNC_TIMEOUT_SECS`: Request timeout in seconds (default 10)
// - `LEDGERSYNC_SESSION_PATH`: Session file (default .ledgersync/session.json)
// - `LEDGERSYNC_STORAGE_KEY`: Key of the session record (default bankUser)
// - `LEDGERSYNC_ORIGIN`: Origin tag sent with login (default "Web Client")
// - `LEDGERSYNC_LOG_LEVEL`: trace, debug, info, warn or error (default info)
//
// ## Example
//
// ```bash
// export LEDGERSYNC_ENDPOINT=https://ledger.example.com/api.php
//
// ledgersync login admin@bank.com 's3cret'
// ledgersync verify admin@bank.com 123456
// ledgersync deposit H1 500 --note cash
// ledgersync holders --query ravi --limit 5
// ```
//
// Lists and records are printed as JSON on stdout; notifications and logs
// go to stderr.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use ledgersync_core::{
    DepositRequest, NewHolder, PenaltyRequest, SessionStoreConfig, SyncConfig, SyncContext,
    SyncEvent, WithdrawRequest,
};
use ledgersync_http::HttpTransport;
use serde::Serialize;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_SESSION_PATH: &str = ".ledgersync/session.json";

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy)]
enum CliExitCode {
    /// Command completed
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// The command failed or was rejected
    RuntimeError = 2,
}

impl From<CliExitCode> for ExitCode {
    fn from(code: CliExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Parser)]
#[command(name = "ledgersync")]
#[command(about = "Client for a text-based ledger endpoint", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit credentials; the server emails an OTP
    Login { email: String, password: String },
    /// Verify the OTP and persist the session
    Verify { email: String, otp: String },
    /// Ask for a fresh OTP by submitting the credentials again
    Resend { email: String, password: String },
    /// End the session
    Logout,
    /// Show the persisted session
    Whoami,
    /// List holders, optionally filtered and ranked by balance
    Holders {
        #[arg(short, long)]
        query: Option<String>,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Totals over all holders
    Summary,
    /// Register a new holder
    AddHolder {
        /// Leave empty to let the server assign one
        #[arg(long, default_value = "")]
        hid: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        mobile: String,
        #[arg(long)]
        email: String,
    },
    /// Deposit into a holder's account
    Deposit {
        hid: String,
        amount: f64,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Withdraw from a holder's account
    Withdraw {
        hid: String,
        amount: f64,
        #[arg(long, default_value_t = 0.0)]
        charges: f64,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Charge a penalty to a holder
    Penalty {
        hid: String,
        amount: f64,
        reason: String,
    },
    /// List the penalties of a holder
    Penalties { hid: String },
    /// Show the audit log
    Logs,
    /// List administrators
    Admins,
}

/// Application configuration
#[derive(Debug)]
struct Config {
    endpoint: String,
    timeout_secs: Option<u64>,
    session_path: String,
    storage_key: Option<String>,
    origin: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            endpoint: lookup("LEDGERSYNC_ENDPOINT").ok_or_else(|| {
                anyhow!(
                    "LEDGERSYNC_ENDPOINT is required. \
                    Set it via: export LEDGERSYNC_ENDPOINT=https://ledger.example.com/api.php"
                )
            })?,
            timeout_secs: lookup("LEDGERSYNC_TIMEOUT_SECS")
                .map(|s| s.trim().parse())
                .transpose()
                .context("LEDGERSYNC_TIMEOUT_SECS must be a whole number of seconds")?,
            session_path: lookup("LEDGERSYNC_SESSION_PATH")
                .unwrap_or_else(|| DEFAULT_SESSION_PATH.to_string()),
            storage_key: lookup("LEDGERSYNC_STORAGE_KEY"),
            origin: lookup("LEDGERSYNC_ORIGIN"),
            log_level: lookup("LEDGERSYNC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "LEDGERSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        if self.endpoint.starts_with("http://") {
            eprintln!(
                "WARNING: LEDGERSYNC_ENDPOINT uses HTTP (not HTTPS). \
                Credentials and OTP codes are sent as query parameters."
            );
        }

        self.sync_config().validate()?;
        Ok(())
    }

    /// Library configuration derived from the environment
    fn sync_config(&self) -> SyncConfig {
        let mut config =
            SyncConfig::new(self.endpoint.clone()).with_session_store(SessionStoreConfig::File {
                path: self.session_path.clone(),
            });
        if let Some(secs) = self.timeout_secs {
            config.transport.timeout_secs = secs;
        }
        if let Some(key) = &self.storage_key {
            config.session.storage_key = key.clone();
        }
        if let Some(origin) = &self.origin {
            config.session.origin = origin.clone();
        }
        config
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return CliExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return CliExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return CliExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return CliExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run(config, cli.command).await {
            error!("{:#}", e);
            CliExitCode::RuntimeError
        } else {
            CliExitCode::Success
        }
    });

    result.into()
}

/// Build the context, run one command, then flush notifications
async fn run(config: Config, command: Command) -> Result<()> {
    let sync_config = config.sync_config();
    debug!(
        "Endpoint {} (timeout {:?})",
        sync_config.endpoint,
        Duration::from_secs(sync_config.transport.timeout_secs)
    );

    let transport = HttpTransport::from_config(&sync_config)?;
    let (ctx, mut events) = SyncContext::from_config(sync_config, Arc::new(transport)).await?;

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            report(&event);
        }
    });

    let result = execute(&ctx, command).await;

    // Dropping the context closes the channel and ends the printer.
    drop(ctx);
    if let Err(e) = printer.await {
        warn!("Notification task failed: {}", e);
    }

    result
}

fn report(event: &SyncEvent) {
    match event {
        SyncEvent::Success { message } => eprintln!("{}", message),
        SyncEvent::Failure { message } => eprintln!("error: {}", message),
        SyncEvent::Authenticated { session } => info!("Signed in as {}", session.email),
        SyncEvent::SessionExpired => debug!("Session ended"),
    }
}

async fn execute(ctx: &SyncContext, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } | Command::Resend { email, password } => {
            let ok = ctx.session().login(&email, &password, None).await;
            session_outcome(ctx, ok, "login").await
        }
        Command::Verify { email, otp } => {
            let ok = ctx.session().verify_otp(&email, &otp).await;
            session_outcome(ctx, ok, "verification").await
        }
        Command::Logout => {
            ctx.logout().await;
            Ok(())
        }
        Command::Whoami => {
            let session = ctx
                .session()
                .current()
                .await
                .ok_or_else(|| anyhow!("not signed in"))?;
            print_json(&session)
        }
        Command::Holders { query, limit } => {
            acting_email(ctx).await?;
            ctx.ledger().fetch_holders().await;
            if query.is_none() && limit.is_none() {
                print_json(&ctx.ledger().holders().await)
            } else {
                let query = query.unwrap_or_default();
                let limit = limit.unwrap_or(usize::MAX);
                print_json(&ctx.ledger().top_holders(&query, limit).await)
            }
        }
        Command::Summary => {
            acting_email(ctx).await?;
            ctx.ledger().fetch_holders().await;
            print_json(&ctx.ledger().summary().await)
        }
        Command::AddHolder {
            hid,
            name,
            mobile,
            email,
        } => {
            acting_email(ctx).await?;
            let holder = NewHolder {
                hid,
                full_name: name,
                mobile,
                email,
            };
            let ok = ctx.ledger().add_holder(&holder).await;
            ledger_outcome(ctx, ok, "add holder").await
        }
        Command::Deposit { hid, amount, note } => {
            let email = acting_email(ctx).await?;
            let req = DepositRequest {
                hid,
                amount,
                note,
                email,
            };
            let ok = ctx.ledger().make_deposit(&req).await;
            ledger_outcome(ctx, ok, "deposit").await
        }
        Command::Withdraw {
            hid,
            amount,
            charges,
            note,
        } => {
            let email = acting_email(ctx).await?;
            let req = WithdrawRequest {
                hid,
                amount,
                charges,
                note,
                email,
            };
            let ok = ctx.ledger().make_withdrawal(&req).await;
            ledger_outcome(ctx, ok, "withdrawal").await
        }
        Command::Penalty {
            hid,
            amount,
            reason,
        } => {
            let email = acting_email(ctx).await?;
            let req = PenaltyRequest {
                hid,
                amount,
                reason,
                email,
            };
            let ok = ctx.ledger().add_penalty(&req).await;
            ledger_outcome(ctx, ok, "penalty").await
        }
        Command::Penalties { hid } => {
            ctx.ledger().fetch_penalties_for_holder(&hid).await;
            print_json(&ctx.ledger().penalties().await)
        }
        Command::Logs => {
            acting_email(ctx).await?;
            ctx.ledger().fetch_logs().await;
            print_json(&ctx.ledger().logs().await)
        }
        Command::Admins => {
            acting_email(ctx).await?;
            ctx.ledger().fetch_admins().await;
            print_json(&ctx.ledger().admins().await)
        }
    }
}

/// Email of the restored session; commands acting on the ledger need one
async fn acting_email(ctx: &SyncContext) -> Result<String> {
    ctx.session()
        .current()
        .await
        .map(|session| session.email)
        .ok_or_else(|| anyhow!("not signed in; run `ledgersync login` then `verify` first"))
}

async fn session_outcome(ctx: &SyncContext, ok: bool, what: &str) -> Result<()> {
    if ok {
        return Ok(());
    }
    let reason = ctx.session().error().await.unwrap_or_default();
    Err(anyhow!("{} failed: {}", what, reason))
}

async fn ledger_outcome(ctx: &SyncContext, ok: bool, what: &str) -> Result<()> {
    if ok {
        return Ok(());
    }
    let reason = ctx.ledger().error().await.unwrap_or_default();
    Err(anyhow!("{} failed: {}", what, reason))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
