//! The broker operations the client relies on.
//!
//! Components never talk to rdkafka directly: they receive an owned handle
//! implementing one of the traits below. [`crate::session::Session`] provides
//! the rdkafka-backed implementations, [`crate::mock::MemoryBroker`] an
//! in-process one.

use std::future::Future;

use rdkafka::admin::TopicResult;
use rdkafka::error::KafkaError;

use crate::error::AppResult;
use crate::record::{OutboundRecord, Record, TopicSpec};

/// Cluster administration: metadata and topic creation.
pub trait TopicAdmin {
    /// Names of the topics currently known to the cluster.
    fn topic_names(&self) -> impl Future<Output = AppResult<Vec<String>>>;

    /// Issues one create-topics request for `topic`.
    ///
    /// The outer error means the request itself failed; per-topic failures
    /// are reported in the returned results.
    fn create_topic(&self, topic: &TopicSpec) -> impl Future<Output = AppResult<Vec<TopicResult>>>;
}

/// A fetch failure reported by a poll.
#[derive(Clone, Debug)]
pub struct FetchError {
    pub error: KafkaError,
    pub retriable: bool,
}

/// A group member subscribed to one topic.
pub trait RecordSource {
    /// Blocks until records are available or a fetch error is reported.
    ///
    /// Records of one partition are returned in increasing offset order.
    fn poll(&self) -> impl Future<Output = Result<Vec<Record>, FetchError>>;
}

/// Synchronous record delivery.
pub trait RecordSink {
    /// Sends one record and waits for the broker acknowledgement. On success
    /// the returned record carries the assigned partition and offset.
    fn send(&self, record: OutboundRecord<'_>) -> impl Future<Output = Result<Record, KafkaError>>;
}

/// Hands out the clients of one cluster.
pub trait Broker {
    type Admin: TopicAdmin;
    type Source: RecordSource;
    type Sink: RecordSink;

    /// Connects an administration client.
    fn admin(&self) -> AppResult<Self::Admin>;

    /// Joins `group_id` and subscribes to `topic`, starting from the earliest
    /// offset when the group has no committed position.
    fn consumer(&self, topic: &str, group_id: &str) -> AppResult<Self::Source>;

    /// Connects a producer.
    fn producer(&self) -> AppResult<Self::Sink>;
}
