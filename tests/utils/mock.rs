use std::time::Duration;

use anyhow::Context;
use rdkafka::mocking::MockCluster;
use rdkafka::producer::DefaultProducerContext;

use kafka_demo::{BrokerEndpoints, Session};

pub type Cluster = MockCluster<'static, DefaultProducerContext>;

/// Starts an in-process mock cluster with one topic already created.
pub fn mock_cluster_with_topic(
    broker_count: i32,
    topic: &str,
    partitions: i32,
) -> anyhow::Result<Cluster> {
    let cluster = MockCluster::new(broker_count).context("Failed to start mock cluster")?;
    cluster
        .create_topic(topic, partitions, 1)
        .context("Failed to create topic on mock cluster")?;
    Ok(cluster)
}

/// A session pointed at the mock cluster's listeners.
pub fn session_for(cluster: &Cluster) -> Session {
    let endpoints = BrokerEndpoints::parse(&cluster.bootstrap_servers().replace(',', ";"));
    Session::new(endpoints, Duration::from_secs(10))
}
