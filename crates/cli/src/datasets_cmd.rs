use anyhow::{Context, Result};
use opalview_session::DatasetCatalog;

use crate::context::AppContext;
use crate::output::render_datasets;

pub async fn run_datasets(ctx: &AppContext, filter: Option<&str>) -> Result<()> {
    ctx.require_login().await?;
    let catalog = DatasetCatalog::new(ctx.api.clone());
    catalog
        .refresh_from(&ctx.session)
        .await
        .context("list datasets")?;

    let shown = catalog.filter(filter.unwrap_or_default());
    if shown.is_empty() {
        eprintln!("No datasets found.");
        return Ok(());
    }
    print!("{}", render_datasets(&shown));
    Ok(())
}
