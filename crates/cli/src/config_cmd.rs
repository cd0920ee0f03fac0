use anyhow::{Context, Result};
use clap::Args;
use opalview_runtime_config::OpalviewConfig;

use crate::context::AppContext;

#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Default customer id.
    #[arg(long)]
    pub tenant_id: Option<String>,
    /// Default tenant domain.
    #[arg(long)]
    pub site: Option<String>,
    /// Default login email.
    #[arg(long)]
    pub email: Option<String>,
    /// Default row limit for queries.
    #[arg(long)]
    pub row_limit: Option<u32>,
    /// Default query window, e.g. 1h.
    #[arg(long)]
    pub interval: Option<String>,
    /// Send API requests here instead of the tenant URL.
    #[arg(long)]
    pub endpoint: Option<String>,
}

impl ConfigArgs {
    fn is_empty(&self) -> bool {
        self.tenant_id.is_none()
            && self.site.is_none()
            && self.email.is_none()
            && self.row_limit.is_none()
            && self.interval.is_none()
            && self.endpoint.is_none()
    }
}

pub fn run_config(ctx: &AppContext, args: ConfigArgs) -> Result<()> {
    if args.is_empty() {
        return show_config(ctx);
    }
    let mut config = ctx.config.clone();
    apply(&mut config, args);
    config
        .save(&ctx.config_path)
        .with_context(|| format!("write {}", ctx.config_path.display()))?;
    println!("Saved {}", ctx.config_path.display());
    Ok(())
}

fn show_config(ctx: &AppContext) -> Result<()> {
    println!("# config:      {}", ctx.config_path.display());
    println!("# credentials: {}", ctx.credentials_path.display());
    print!("{}", toml::to_string_pretty(&ctx.config)?);
    Ok(())
}

fn apply(config: &mut OpalviewConfig, args: ConfigArgs) {
    if let Some(id) = args.tenant_id {
        config.tenant.id = id;
    }
    if let Some(site) = args.site {
        config.tenant.site = site;
    }
    if let Some(email) = args.email {
        config.tenant.email = email;
    }
    if let Some(limit) = args.row_limit {
        config.query.row_limit = limit;
    }
    if let Some(interval) = args.interval {
        config.query.interval = Some(interval);
    }
    if let Some(endpoint) = args.endpoint {
        config.http.endpoint_override = (!endpoint.is_empty()).then_some(endpoint);
    }
}
