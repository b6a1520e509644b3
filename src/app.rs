//! Entry point logic: provision the topic, then consume or produce.

use std::future::Future;
use std::io::Write;

use log::*;

use crate::broker::Broker;
use crate::config::{AppConfig, OperatingMode};
use crate::consume::run_consumer;
use crate::error::AppResult;
use crate::output::RecordPrinter;
use crate::produce::{run_producer, BurstSummary};
use crate::provision::{ensure_topic, Provisioned};

/// What a consumer or producer run did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The consumer loop was shut down after printing this many records.
    Consumed(usize),
    /// The producer burst completed.
    Produced(BurstSummary),
}

/// Result of [`run`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub provisioned: Provisioned,
    pub outcome: Outcome,
}

/// Provisions the configured topic, then runs the configured mode.
///
/// The admin client is released before the consumer or producer is created.
/// In consumer mode this only returns once `shutdown` completes or a fatal
/// error occurs; `shutdown` is ignored in producer mode.
pub async fn run<B, F, W>(
    broker: &B,
    config: &AppConfig,
    shutdown: F,
    printer: &mut RecordPrinter<W>,
) -> AppResult<RunReport>
where
    B: Broker,
    F: Future<Output = ()>,
    W: Write,
{
    let provisioned = {
        let admin = broker.admin()?;
        ensure_topic(&admin, &config.topic).await?
    };

    let outcome = match config.mode {
        OperatingMode::Consumer { ref group_id } => {
            info!("Consuming from {} as group {}", config.topic.name, group_id);
            let source = broker.consumer(&config.topic.name, group_id)?;
            Outcome::Consumed(run_consumer(&source, shutdown, printer).await?)
        }
        OperatingMode::Producer(ref burst) => {
            info!(
                "Producing {} records to {} with key {}",
                burst.count, config.topic.name, burst.key
            );
            let sink = broker.producer()?;
            Outcome::Produced(run_producer(&sink, &config.topic.name, burst, printer).await?)
        }
    };

    Ok(RunReport {
        provisioned,
        outcome,
    })
}
