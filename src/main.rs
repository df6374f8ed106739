use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::Decimal;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use networth::clock::SystemClock;
use networth::config::{default_config_path, ResolvedConfig};
use networth::format::Formatter;
use networth::inventory::Inventory;
use networth::providers::ProviderSet;
use networth::report::{aggregate, render_json, render_text, GroupBy, ReportOptions};
use networth::valuation::Valuator;

#[derive(Parser, Debug)]
#[command(name = "networth")]
#[command(about = "Report net worth across every declared holding")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Inventory file (overrides the config)
    #[arg(short = 'f', long = "file", value_name = "ASSETS")]
    inventory: Option<PathBuf>,

    /// Section key: group or category
    #[arg(short, long, value_name = "KEY")]
    group_by: Option<GroupBy>,

    /// Drop a group before valuation (repeatable)
    #[arg(short = 'X', long = "exclude-group", value_name = "GROUP")]
    exclude_groups: Vec<String>,

    /// Hide rows worth less than this
    #[arg(short, long, value_name = "MIN")]
    min_balance: Option<Decimal>,

    /// Mask amounts; allocations stay visible
    #[arg(long)]
    hide_values: bool,

    /// List every source behind each row
    #[arg(short, long)]
    verbose: bool,

    /// Debug logging
    #[arg(short, long)]
    debug: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(debug: bool, json: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(layer.json()).init();
    } else {
        registry.with(layer).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug, cli.log_json);

    let mut config = ResolvedConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load networth config: {}", cli.config.display()))?;
    if let Some(inventory) = cli.inventory {
        config.inventory = inventory;
    }
    if let Some(group_by) = cli.group_by {
        config.report.group_by = group_by;
    }
    if let Some(min_balance) = cli.min_balance {
        config.report.min_balance = min_balance;
    }
    config.report.exclude_groups.extend(cli.exclude_groups);
    debug!(?config, "resolved configuration");

    let mut inventory = Inventory::load(&config.inventory)?;
    inventory.exclude_groups(&config.report.exclude_groups);

    let providers = ProviderSet::from_config(&config.providers, &config.reporting_currency).await;
    let valuator = Valuator::new(providers).with_concurrency(config.report.concurrency);
    let run = valuator.value_all(inventory.into_assets()).await;
    info!(
        valued = run.valued.len(),
        unvalued = run.unvalued.len(),
        "valuation finished"
    );

    let options = ReportOptions {
        group_by: config.report.group_by,
        min_balance: config.report.min_balance,
        currency: config.reporting_currency.clone(),
    };
    let report = aggregate(&run, &options, &SystemClock);

    if cli.json {
        println!("{}", render_json(&report)?);
    } else {
        let formatter = Formatter::new(config.display.clone()).hiding_values(cli.hide_values);
        print!("{}", render_text(&report, &formatter, cli.verbose)?);
    }

    Ok(())
}
