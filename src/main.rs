use std::{
    fs,
    io::{self, BufWriter, Write},
    path::Path,
    sync::Arc,
};

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use incentive::{
    cli::cli_options_from_args,
    config::Config,
    logging::init_tracing,
    notify::{NdjsonNotificationSink, dispatch_notifications},
    pipeline::IncentivePipeline,
    store::JsonFileAggregateStore,
};

fn main() -> Result<()> {
    let options = cli_options_from_args()?;
    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "failed to load config from {}",
            options.config_path.display()
        )
    })?;
    let registry = config.activity_registry()?;
    let activity = registry
        .resolve(&options.activity_code)
        .context("cannot start batch")?;

    let logging = init_tracing(&config.logging, &activity.activity_code)?;
    let contracts = read_contracts(&options.contracts_path)?;

    let mut store = JsonFileAggregateStore::open(&config.store.state_path)
        .context("failed to open incentive store")?;
    let report = IncentivePipeline::with_activity(Arc::clone(&activity), &mut store)
        .run(&contracts)
        .context("batch aborted")?;
    store.flush().context("failed to flush incentive store")?;

    let delivered = match &options.notifications_path {
        Some(path) => {
            let file = fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut sink = NdjsonNotificationSink::new(BufWriter::new(file));
            let delivered = dispatch_notifications(&activity, &report.records, &mut sink)?;
            sink.into_inner().flush()?;
            delivered
        }
        None => {
            let mut sink = NdjsonNotificationSink::new(io::stdout().lock());
            dispatch_notifications(&activity, &report.records, &mut sink)?
        }
    };

    eprintln!(
        "batch {} for {}: processed={} skipped={} errored={} rewards={} notifications={} (log run {})",
        report.run_id,
        report.activity_code,
        report.processed_count(),
        report.skipped_count(),
        report.errored_count(),
        report.granted_reward_count(),
        delivered,
        logging.run_id(),
    );
    for failure in &report.failures {
        eprintln!(
            "  contract #{} ({}): {}",
            failure.index,
            failure.contract_id.as_deref().unwrap_or("unknown id"),
            failure.error
        );
    }
    Ok(())
}

/// Accepts a JSON array of contracts or an object with a `contracts` array.
fn read_contracts(path: &Path) -> Result<Vec<Value>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    match value {
        Value::Array(contracts) => Ok(contracts),
        Value::Object(mut object) => match object.remove("contracts") {
            Some(Value::Array(contracts)) => Ok(contracts),
            _ => Err(anyhow!(
                "{} must contain a `contracts` array",
                path.display()
            )),
        },
        _ => Err(anyhow!("{} must be a JSON array of contracts", path.display())),
    }
}
