use serde::Serialize;
use serde_json::Value;
use storefront_orchestrator::{Transaction, TransactionSnapshot};

use crate::error::{CliError, Result};

/// What `storefront run` prints on stdout.
#[derive(Debug, Serialize)]
pub(crate) struct RunReport {
    result: Option<Value>,
    transaction: TransactionSnapshot,
    #[serde(skip)]
    summary: String,
}

impl RunReport {
    pub(crate) fn new(result: Option<Value>, transaction: &Transaction) -> Self {
        Self {
            result,
            transaction: transaction.snapshot(),
            summary: transaction.log().summary(),
        }
    }
}

/// JSON report on stdout, execution summary on stderr.
pub(crate) fn print_report(report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).map_err(CliError::Report)?;
    println!("{json}");

    if !report.summary.is_empty() {
        eprintln!("{}", report.summary);
    }
    Ok(())
}
