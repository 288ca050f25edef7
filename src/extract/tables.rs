//! Concurrent listing of all configured tables

use crate::client::{PageFetcher, list_all_records};
use crate::config::TableSelection;
use crate::error::{AggregateError, Error, Result, TableFailure};
use crate::types::Tables;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// List every configured table
///
/// Runs one task per base; the tables of a base are listed one after another
/// and the worker stops at its first failure. Every worker is joined before
/// anything is returned. The result is either every table, or an
/// [`Error::Extraction`] holding one entry per failed base. Records from
/// successful workers are dropped when any worker fails.
pub async fn extract_all_tables<F>(fetcher: Arc<F>, selection: &TableSelection) -> Result<Tables>
where
    F: PageFetcher + ?Sized + 'static,
{
    let handles: Vec<_> = selection
        .app_tables
        .iter()
        .map(|(base, tables)| {
            let worker = list_base(Arc::clone(&fetcher), base.clone(), tables.clone());
            (base.clone(), tokio::spawn(worker))
        })
        .collect();

    let mut merged = Tables::new();
    let mut failures = AggregateError::new();
    for (base, handle) in handles {
        match handle.await {
            Ok(Ok(listed)) => {
                for (table, records) in listed {
                    if merged.insert(table.clone(), records).is_some() {
                        failures.push(TableFailure {
                            base: base.clone(),
                            table: Some(table.clone()),
                            error: Error::config(
                                format!("table {table} was listed by more than one base"),
                                Some("app-tables"),
                            ),
                        });
                    }
                }
            }
            Ok(Err(failure)) => failures.push(failure),
            Err(join_error) => {
                debug!(base = %base, error = %join_error, "extraction worker did not finish");
                failures.push(TableFailure {
                    base: base.clone(),
                    table: None,
                    error: Error::WorkerPanicked { base },
                });
            }
        }
    }

    failures.into_result()?;
    Ok(merged)
}

/// Worker for one base: list its tables in order, stop at the first error
async fn list_base<F>(
    fetcher: Arc<F>,
    base: String,
    tables: Vec<String>,
) -> std::result::Result<Tables, TableFailure>
where
    F: PageFetcher + ?Sized,
{
    let mut listed = Tables::new();
    for table in tables {
        let started = Instant::now();
        match list_all_records(fetcher.as_ref(), &base, &table).await {
            Ok(records) => {
                let elapsed_secs = started.elapsed().as_secs_f64();
                info!(
                    base = %base,
                    table = %table,
                    records = records.len(),
                    elapsed_secs,
                    "listed {} records in {:.3} seconds",
                    records.len(),
                    elapsed_secs
                );
                listed.insert(table, records);
            }
            Err(error) => {
                debug!(base = %base, table = %table, error = %error, "listing failed, skipping remaining tables of this base");
                return Err(TableFailure {
                    base,
                    table: Some(table),
                    error,
                });
            }
        }
    }
    Ok(listed)
}
