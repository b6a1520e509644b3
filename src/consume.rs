//! Consumer loop.

use std::future::Future;
use std::io::Write;

use log::*;

use crate::broker::{FetchError, RecordSource};
use crate::error::{AppError, AppResult};
use crate::output::RecordPrinter;

/// Polls `source` and prints every record until `shutdown` completes.
///
/// Records are printed in the order the source returns them, which within a
/// partition is increasing offset order. Retriable fetch errors are logged
/// and polling continues; a non-retriable one ends the loop with
/// [`AppError::Fetch`]. Returns the number of records printed.
pub async fn run_consumer<S, F, W>(
    source: &S,
    shutdown: F,
    printer: &mut RecordPrinter<W>,
) -> AppResult<usize>
where
    S: RecordSource,
    F: Future<Output = ()>,
    W: Write,
{
    tokio::pin!(shutdown);
    let mut consumed = 0;
    loop {
        let batch = tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Consumer stopped after {} records", consumed);
                return Ok(consumed);
            }
            batch = source.poll() => batch,
        };
        match batch {
            Ok(records) => {
                trace!("Poll returned {} records", records.len());
                for record in &records {
                    printer.consumed(record)?;
                    consumed += 1;
                }
            }
            Err(FetchError {
                error,
                retriable: true,
            }) => warn!("Retriable fetch error: {}", error),
            Err(FetchError { error, .. }) => return Err(AppError::Fetch(error)),
        }
    }
}
