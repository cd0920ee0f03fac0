use anyhow::{bail, Result};
use clap::Args;
use opalview_core::CredentialsPatch;
use opalview_session::login::{LOGIN_FAILED, LOGIN_NEEDED};
use opalview_session::{SessionEvent, SessionPhase};

use crate::context::AppContext;

#[derive(Debug, Clone, Args)]
pub struct LoginArgs {
    /// Customer id of the tenant, e.g. 137646103412.
    #[arg(long)]
    pub tenant_id: Option<String>,
    /// Tenant domain, e.g. observeinc.com or eu-1.observeinc.com.
    #[arg(long)]
    pub site: Option<String>,
    /// Email address used to log in.
    #[arg(long)]
    pub email: Option<String>,
}

pub async fn run_login(ctx: &AppContext, args: LoginArgs) -> Result<()> {
    ctx.session.set_credentials(CredentialsPatch {
        tenant_id: args.tenant_id,
        tenant_site: args.site,
        email: args.email,
        ..CredentialsPatch::default()
    });

    ctx.session.subscribe(|event| {
        if let SessionEvent::PhaseChanged {
            phase: SessionPhase::Pending,
            ..
        } = event
        {
            eprintln!("Logging in…");
        }
    });

    match ctx.session.bootstrap().await {
        SessionPhase::Authenticated => {
            let creds = ctx.session.credentials();
            let name = creds.user.as_ref().map(|u| u.name.as_str()).unwrap_or_default();
            println!("Logged in as {name} <{}> on {}", creds.email, creds.base_url());
            Ok(())
        }
        _ => bail!(
            "{}",
            ctx.session
                .error()
                .unwrap_or_else(|| LOGIN_FAILED.to_string())
        ),
    }
}

pub fn run_logout(ctx: &AppContext) -> Result<()> {
    ctx.session.logout()?;
    println!("Logged out");
    Ok(())
}

/// Show the stored credentials and whether the token still works. Never
/// starts a delegated login.
pub async fn run_status(ctx: &AppContext) -> Result<()> {
    let creds = ctx.session.credentials();
    println!("tenant:        {}", or_dash(&creds.tenant_id));
    println!("site:          {}", or_dash(&creds.tenant_site));
    println!("email:         {}", or_dash(&creds.email));
    println!("addressable:   {}", creds.is_addressable());
    println!("has token:     {}", creds.has_token());

    let (phase, error) = if !creds.is_addressable() {
        (SessionPhase::Unconfigured, Some(LOGIN_NEEDED.to_string()))
    } else if !creds.has_token() {
        (SessionPhase::Unconfigured, Some("No token".to_string()))
    } else {
        match ctx.api.current_user(&creds).await {
            Ok(Some(user)) => {
                println!("user:          {} ({})", user.name, user.id);
                (SessionPhase::Authenticated, None)
            }
            Ok(None) => (SessionPhase::Unconfigured, Some("Token rejected".to_string())),
            Err(e) => (SessionPhase::Unconfigured, Some(e.to_string())),
        }
    };
    println!("phase:         {phase}");
    if let Some(error) = error {
        println!("error:         {error}");
    }
    Ok(())
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}
