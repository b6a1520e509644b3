//! A small Kafka client built on [rdkafka].
//!
//! On startup the client makes sure one topic exists, creating it with the
//! configured partition count and replication factor when the cluster does
//! not list it. It then either joins a consumer group and prints every record
//! of the topic until shut down, or sends a fixed number of numbered records
//! and prints the offset the broker assigned to each.
//!
//! Configuration comes from `APP_*` environment variables, see [`config`].
//! The broker itself is reached through the traits in [`broker`]: [`Session`]
//! implements them with rdkafka clients and [`mock::MemoryBroker`] in memory.
//!
//! [rdkafka]: https://docs.rs/rdkafka

pub mod app;
pub mod broker;
pub mod config;
pub mod consume;
pub mod error;
pub mod logging;
pub mod mock;
pub mod output;
pub mod produce;
pub mod provision;
pub mod record;
pub mod session;

pub use crate::app::{run, Outcome, RunReport};
pub use crate::config::{AppConfig, BurstSpec, OperatingMode};
pub use crate::error::{AppError, AppResult};
pub use crate::output::{OutputFormat, RecordPrinter};
pub use crate::provision::Provisioned;
pub use crate::record::{BrokerEndpoints, Record, TopicSpec};
pub use crate::session::Session;
