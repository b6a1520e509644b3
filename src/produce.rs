//! Producer burst.

use std::io::Write;

use log::*;

use crate::broker::RecordSink;
use crate::config::BurstSpec;
use crate::error::AppResult;
use crate::output::RecordPrinter;
use crate::record::OutboundRecord;

/// Delivery counts of one burst.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BurstSummary {
    pub delivered: usize,
    pub failed: usize,
}

/// Sends `burst.count` records to `topic`, one at a time.
///
/// Record `i` carries `burst.key` and the value `"{value_prefix} {i}"`. Each
/// send is acknowledged before the next record is built. A failed send is
/// printed and the burst moves on to the next record.
pub async fn run_producer<S, W>(
    sink: &S,
    topic: &str,
    burst: &BurstSpec,
    printer: &mut RecordPrinter<W>,
) -> AppResult<BurstSummary>
where
    S: RecordSink,
    W: Write,
{
    let mut summary = BurstSummary::default();
    for i in 0..burst.count {
        let value = format!("{} {}", burst.value_prefix, i);
        let record = OutboundRecord {
            topic,
            key: burst.key.as_bytes(),
            value: value.as_bytes(),
        };
        match sink.send(record).await {
            Ok(sent) => {
                printer.sent(&sent)?;
                summary.delivered += 1;
            }
            Err(e) => {
                printer.send_failed(topic, &e)?;
                summary.failed += 1;
            }
        }
    }
    info!(
        "Burst to {} finished: {} delivered, {} failed",
        topic, summary.delivered, summary.failed
    );
    Ok(summary)
}
