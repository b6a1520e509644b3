//! Topic provisioning.

use log::*;

use rdkafka::error::RDKafkaErrorCode;

use crate::broker::TopicAdmin;
use crate::error::AppResult;
use crate::record::TopicSpec;

/// Outcome of [`ensure_topic`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provisioned {
    /// The topic was listed in the metadata, or another client created it
    /// between the metadata fetch and the create request.
    AlreadyExists,
    /// The topic was created by this call.
    Created,
    /// The broker rejected the creation of the topic.
    Failed(RDKafkaErrorCode),
    /// The create response did not mention the topic.
    Unconfirmed,
}

/// Creates `topic` unless the cluster already has a topic with that name.
///
/// Metadata and whole-request failures are returned as errors. A per-topic
/// creation error is logged and reported through [`Provisioned::Failed`];
/// `TopicAlreadyExists` in that position is not an error.
pub async fn ensure_topic<A: TopicAdmin>(admin: &A, topic: &TopicSpec) -> AppResult<Provisioned> {
    let names = admin.topic_names().await?;
    if names.iter().any(|name| *name == topic.name) {
        info!("Topic already exists: {}", topic.name);
        return Ok(Provisioned::AlreadyExists);
    }

    if let Err(code) = topic.creation_counts() {
        error!(
            "Unable to create topic '{}' with {} partitions, replication factor {}: {}",
            topic.name, topic.partitions, topic.replication, code
        );
        return Ok(Provisioned::Failed(code));
    }
    debug!(
        "Creating topic '{}' with {} partitions, replication factor {}",
        topic.name, topic.partitions, topic.replication
    );
    let mut outcome = Provisioned::Unconfirmed;
    for result in admin.create_topic(topic).await? {
        let (name, current) = match result {
            Ok(name) => {
                info!("Created topic '{}'", name);
                (name, Provisioned::Created)
            }
            Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                info!("Topic already exists: {}", name);
                (name, Provisioned::AlreadyExists)
            }
            Err((name, code)) => {
                error!("Unable to create topic '{}': {}", name, code);
                (name, Provisioned::Failed(code))
            }
        };
        if name == topic.name {
            outcome = current;
        }
    }
    if outcome == Provisioned::Unconfirmed {
        warn!("Create response did not mention topic '{}'", topic.name);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::mock::MemoryBroker;

    fn spec() -> TopicSpec {
        TopicSpec {
            name: "topic".to_string(),
            partitions: 3,
            replication: 2,
        }
    }

    #[tokio::test]
    async fn test_creates_missing_topic() {
        let broker = MemoryBroker::new(3);

        let outcome = ensure_topic(&broker, &spec()).await.unwrap();

        assert_eq!(outcome, Provisioned::Created);
        assert_eq!(broker.partition_count("topic"), Some(3));
        assert_eq!(broker.create_requests(), 1);
    }

    #[tokio::test]
    async fn test_second_call_finds_topic() {
        let broker = MemoryBroker::new(3);

        let first = ensure_topic(&broker, &spec()).await.unwrap();
        let second = ensure_topic(&broker, &spec()).await.unwrap();

        assert_eq!(first, Provisioned::Created);
        assert_eq!(second, Provisioned::AlreadyExists);
        assert_eq!(broker.create_requests(), 1);
    }

    #[tokio::test]
    async fn test_existing_topic_is_left_alone() {
        let broker = MemoryBroker::new(3);
        broker.add_topic("topic", 1);

        let outcome = ensure_topic(&broker, &spec()).await.unwrap();

        assert_eq!(outcome, Provisioned::AlreadyExists);
        assert_eq!(broker.create_requests(), 0);
        assert_eq!(broker.partition_count("topic"), Some(1));
    }

    #[tokio::test]
    async fn test_concurrent_creation_is_not_an_error() {
        let broker = MemoryBroker::new(3);
        broker.fail_next_create(RDKafkaErrorCode::TopicAlreadyExists);

        let outcome = ensure_topic(&broker, &spec()).await.unwrap();

        assert_eq!(outcome, Provisioned::AlreadyExists);
    }

    #[tokio::test]
    async fn test_per_topic_error_is_reported() {
        let broker = MemoryBroker::new(1);

        let outcome = ensure_topic(&broker, &spec()).await.unwrap();

        assert_eq!(
            outcome,
            Provisioned::Failed(RDKafkaErrorCode::InvalidReplicationFactor)
        );
        assert_eq!(broker.partition_count("topic"), None);
    }

    #[tokio::test]
    async fn test_counts_only_checked_on_creation() {
        let broker = MemoryBroker::new(3);
        broker.add_topic("topic", 1);
        let bad_counts = TopicSpec {
            partitions: -1,
            replication: 0,
            ..spec()
        };

        let existing = ensure_topic(&broker, &bad_counts).await.unwrap();
        assert_eq!(existing, Provisioned::AlreadyExists);

        let missing = TopicSpec {
            name: "missing".to_string(),
            ..bad_counts
        };
        let outcome = ensure_topic(&broker, &missing).await.unwrap();
        assert_eq!(
            outcome,
            Provisioned::Failed(RDKafkaErrorCode::InvalidPartitions)
        );
        assert_eq!(broker.create_requests(), 0);
        assert_eq!(broker.partition_count("missing"), None);
    }

    #[tokio::test]
    async fn test_metadata_failure_is_fatal() {
        let broker = MemoryBroker::new(3);
        broker.fail_metadata(Some(RDKafkaErrorCode::AllBrokersDown));

        let result = ensure_topic(&broker, &spec()).await;

        assert!(matches!(result, Err(AppError::Connection(_))));
        assert_eq!(broker.create_requests(), 0);
    }
}
