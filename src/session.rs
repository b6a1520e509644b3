//! rdkafka-backed broker clients.

use std::panic;
use std::sync::Arc;
use std::time::Duration;

use log::*;

use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication, TopicResult};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tokio::task;

use crate::broker::{Broker, FetchError, RecordSink, RecordSource, TopicAdmin};
use crate::error::{is_retriable, AppError, AppResult};
use crate::record::{BrokerEndpoints, OutboundRecord, Record, TopicSpec};

/// Connection settings shared by every client of one cluster.
#[derive(Clone, Debug)]
pub struct Session {
    endpoints: BrokerEndpoints,
    timeout: Duration,
}

impl Session {
    /// `timeout` bounds metadata requests, admin operations and deliveries.
    pub fn new(endpoints: BrokerEndpoints, timeout: Duration) -> Session {
        Session { endpoints, timeout }
    }

    pub fn endpoints(&self) -> &BrokerEndpoints {
        &self.endpoints
    }

    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", self.endpoints.bootstrap_servers());
        config
    }
}

impl Broker for Session {
    type Admin = KafkaAdmin;
    type Source = KafkaSource;
    type Sink = KafkaSink;

    fn admin(&self) -> AppResult<KafkaAdmin> {
        let client: AdminClient<DefaultClientContext> = self
            .client_config()
            .create()
            .map_err(AppError::Connection)?;
        trace!("Admin client created for {}", self.endpoints);
        Ok(KafkaAdmin {
            client: Arc::new(client),
            timeout: self.timeout,
        })
    }

    fn consumer(&self, topic: &str, group_id: &str) -> AppResult<KafkaSource> {
        let consumer: StreamConsumer = self
            .client_config()
            .set("group.id", group_id)
            .set("auto.offset.reset", "earliest")
            .set("enable.partition.eof", "false")
            .set("enable.auto.commit", "true")
            .set("session.timeout.ms", "6000")
            .create()
            .map_err(AppError::Connection)?;
        consumer
            .subscribe(&[topic])
            .map_err(AppError::Subscription)?;
        info!("Subscribed to topic {} as group {}", topic, group_id);
        Ok(KafkaSource { consumer })
    }

    fn producer(&self) -> AppResult<KafkaSink> {
        let producer: FutureProducer = self
            .client_config()
            .set("message.timeout.ms", self.timeout.as_millis().to_string())
            .create()
            .map_err(AppError::Connection)?;
        trace!("Producer created for {}", self.endpoints);
        Ok(KafkaSink { producer })
    }
}

pub struct KafkaAdmin {
    client: Arc<AdminClient<DefaultClientContext>>,
    timeout: Duration,
}

impl TopicAdmin for KafkaAdmin {
    async fn topic_names(&self) -> AppResult<Vec<String>> {
        // fetch_metadata blocks until the broker answers or the timeout expires.
        let client = Arc::clone(&self.client);
        let timeout = self.timeout;
        let fetched = task::spawn_blocking(move || {
            let metadata = client.inner().fetch_metadata(None, timeout)?;
            debug!(
                "Metadata from broker {}: {} brokers, {} topics",
                metadata.orig_broker_name(),
                metadata.brokers().len(),
                metadata.topics().len()
            );
            Ok::<_, KafkaError>(
                metadata
                    .topics()
                    .iter()
                    .map(|topic| topic.name().to_string())
                    .collect::<Vec<_>>(),
            )
        })
        .await
        .unwrap_or_else(|e| panic::resume_unwind(e.into_panic()));
        fetched.map_err(AppError::from_metadata)
    }

    async fn create_topic(&self, topic: &TopicSpec) -> AppResult<Vec<TopicResult>> {
        let (partitions, replication) = match topic.creation_counts() {
            Ok(counts) => counts,
            Err(code) => return Ok(vec![Err((topic.name.clone(), code))]),
        };
        let new_topic = NewTopic::new(
            &topic.name,
            partitions,
            TopicReplication::Fixed(replication),
        );
        let opts = AdminOptions::new().operation_timeout(Some(self.timeout));
        self.client
            .create_topics(&[new_topic], &opts)
            .await
            .map_err(AppError::CreateTopics)
    }
}

pub struct KafkaSource {
    consumer: StreamConsumer,
}

impl RecordSource for KafkaSource {
    async fn poll(&self) -> Result<Vec<Record>, FetchError> {
        match self.consumer.recv().await {
            Ok(message) => Ok(vec![Record {
                topic: message.topic().to_string(),
                partition: message.partition(),
                offset: message.offset(),
                key: message.key().map(<[u8]>::to_vec).unwrap_or_default(),
                value: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            }]),
            Err(error) => Err(FetchError {
                retriable: is_retriable(&error),
                error,
            }),
        }
    }
}

pub struct KafkaSink {
    producer: FutureProducer,
}

impl RecordSink for KafkaSink {
    async fn send(&self, record: OutboundRecord<'_>) -> Result<Record, KafkaError> {
        let delivery = self
            .producer
            .send(
                FutureRecord::to(record.topic)
                    .key(record.key)
                    .payload(record.value),
                Timeout::Never,
            )
            .await
            .map_err(|(error, _message)| error)?;
        Ok(Record {
            topic: record.topic.to_string(),
            partition: delivery.partition,
            offset: delivery.offset,
            key: record.key.to_vec(),
            value: record.value.to_vec(),
        })
    }
}

impl Drop for KafkaSink {
    fn drop(&mut self) {
        if let Err(e) = self.producer.flush(Timeout::After(Duration::from_secs(1))) {
            warn!("Producer flush on close failed: {}", e);
        }
    }
}
