//! Values exchanged with the broker.

use std::borrow::Cow;
use std::fmt;

use rdkafka::error::RDKafkaErrorCode;

/// Seed addresses used to discover the cluster, in configuration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokerEndpoints(Vec<String>);

impl BrokerEndpoints {
    /// Splits a `;`-separated endpoint list. Blank entries are dropped.
    pub fn parse(list: &str) -> BrokerEndpoints {
        BrokerEndpoints(
            list.split(';')
                .map(str::trim)
                .filter(|endpoint| !endpoint.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// The endpoints, in configuration order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Returns true when no endpoint survived parsing.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value of the `bootstrap.servers` client property.
    pub fn bootstrap_servers(&self) -> String {
        self.0.join(",")
    }
}

impl fmt::Display for BrokerEndpoints {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0.join(";"))
    }
}

/// Topic to provision. Partition count and replication factor only matter
/// when the topic has to be created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicSpec {
    pub name: String,
    pub partitions: i64,
    pub replication: i64,
}

impl TopicSpec {
    /// Partition count and replication factor as sent in a create request.
    ///
    /// Values below 1 or beyond `i32::MAX` are rejected with the error code
    /// a broker would answer them with.
    pub fn creation_counts(&self) -> Result<(i32, i32), RDKafkaErrorCode> {
        let partitions = positive_i32(self.partitions).ok_or(RDKafkaErrorCode::InvalidPartitions)?;
        let replication =
            positive_i32(self.replication).ok_or(RDKafkaErrorCode::InvalidReplicationFactor)?;
        Ok((partitions, replication))
    }
}

fn positive_i32(n: i64) -> Option<i32> {
    i32::try_from(n).ok().filter(|n| *n >= 1)
}

/// A record received from the broker, or a sent record once the broker has
/// assigned its partition and offset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Record {
    /// Key as text, with invalid UTF-8 replaced.
    pub fn key_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }

    /// Value as text, with invalid UTF-8 replaced.
    pub fn value_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

/// A record about to be sent. The broker picks partition and offset.
#[derive(Clone, Copy, Debug)]
pub struct OutboundRecord<'a> {
    pub topic: &'a str,
    pub key: &'a [u8],
    pub value: &'a [u8],
}
