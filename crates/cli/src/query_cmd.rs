use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use opalview_api::QueryWindow;
use opalview_core::DatasetTable;
use opalview_session::{DatasetCatalog, QueryParams, QueryRunner};

use crate::context::AppContext;
use crate::output::{render_table, table_status};

#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    /// Dataset id or name to query.
    #[arg(long, short)]
    pub dataset: String,
    /// Input name the dataset is bound to inside the pipeline.
    #[arg(long, default_value = "in")]
    pub input: String,
    /// Maximum number of rows to return.
    #[arg(long)]
    pub limit: Option<u32>,
    /// Time window ending now, e.g. 20m or 4h.
    #[arg(long)]
    pub interval: Option<String>,
    /// Print rows as NDJSON instead of a table.
    #[arg(long)]
    pub json: bool,
    /// OPAL pipeline, e.g. 'filter status >= 500'.
    pub pipeline: String,
}

pub async fn run_query(ctx: &AppContext, args: QueryArgs) -> Result<()> {
    let creds = ctx.require_login().await?;

    let catalog = DatasetCatalog::new(ctx.api.clone());
    catalog
        .refresh_from(&ctx.session)
        .await
        .context("list datasets")?;
    let dataset = catalog
        .find(&args.dataset)
        .ok_or_else(|| anyhow!("No dataset named or numbered '{}'", args.dataset))?;

    let mut params = QueryParams::single(&args.input, dataset, &args.pipeline);
    params.row_limit = Some(args.limit.unwrap_or(ctx.config.query.row_limit));
    params.window = QueryWindow {
        interval: args.interval.or_else(|| ctx.config.query.interval.clone()),
        ..QueryWindow::default()
    };

    let runner = QueryRunner::new(ctx.api.clone());
    let table = runner
        .run(&creds, &params)
        .await
        .ok_or_else(|| anyhow!("Query was cancelled"))?;

    match &table {
        DatasetTable::Ready { schema, rows } if args.json => {
            for row in rows {
                let obj: serde_json::Map<String, serde_json::Value> =
                    schema.names().map(str::to_string).zip(row.iter().cloned()).collect();
                println!("{}", serde_json::Value::Object(obj));
            }
        }
        DatasetTable::Ready { schema, rows } => {
            print!("{}", render_table(schema, rows));
            eprintln!("{} row(s)", rows.len());
        }
        other => bail!(table_status(other).unwrap_or_default()),
    }
    Ok(())
}
