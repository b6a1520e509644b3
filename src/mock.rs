//! In-process broker.
//!
//! [`MemoryBroker`] implements the [`Broker`] traits without any network I/O,
//! so that provisioning, the consumer loop and the producer burst can be
//! exercised deterministically. It keeps topics as lists of partitions, assigns
//! offsets from 0, tracks committed positions per consumer group and supports
//! a small amount of error injection.
//!
//! Every clone of a `MemoryBroker` refers to the same cluster.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rdkafka::admin::TopicResult;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use tokio::sync::Notify;

use crate::broker::{Broker, FetchError, RecordSink, RecordSource, TopicAdmin};
use crate::error::{AppError, AppResult};
use crate::record::{OutboundRecord, Record, TopicSpec};

struct StoredRecord {
    key: Vec<u8>,
    value: Vec<u8>,
}

#[derive(Default)]
struct ClusterState {
    topics: BTreeMap<String, Vec<Vec<StoredRecord>>>,
    // group -> (topic, partition) -> next offset to deliver
    positions: HashMap<String, HashMap<(String, i32), i64>>,
    create_requests: usize,
    create_errors: VecDeque<RDKafkaErrorCode>,
    send_errors: VecDeque<RDKafkaErrorCode>,
    fetch_errors: VecDeque<FetchError>,
    metadata_error: Option<RDKafkaErrorCode>,
    refuse_clients: bool,
}

impl ClusterState {
    fn append(&mut self, topic: &str, partition: Option<i32>, key: &[u8], value: &[u8]) -> Option<Record> {
        let partitions = self.topics.get_mut(topic)?;
        let partition = match partition {
            Some(p) => p,
            None => partition_for(key, partitions.len()),
        };
        let log = partitions.get_mut(usize::try_from(partition).ok()?)?;
        log.push(StoredRecord {
            key: key.to_vec(),
            value: value.to_vec(),
        });
        Some(Record {
            topic: topic.to_string(),
            partition,
            offset: log.len() as i64 - 1,
            key: key.to_vec(),
            value: value.to_vec(),
        })
    }

    /// Returns every record of `topic` past the group's position and commits
    /// the new position.
    fn take_unread(&mut self, group: &str, topic: &str) -> Vec<Record> {
        let Some(partitions) = self.topics.get(topic) else {
            return Vec::new();
        };
        let positions = self.positions.entry(group.to_string()).or_default();
        let mut batch = Vec::new();
        for (partition, log) in partitions.iter().enumerate() {
            let partition = partition as i32;
            let position = positions.entry((topic.to_string(), partition)).or_insert(0);
            for (offset, stored) in log.iter().enumerate().skip(*position as usize) {
                batch.push(Record {
                    topic: topic.to_string(),
                    partition,
                    offset: offset as i64,
                    key: stored.key.clone(),
                    value: stored.value.clone(),
                });
            }
            *position = log.len() as i64;
        }
        batch
    }
}

fn partition_for(key: &[u8], partition_count: usize) -> i32 {
    if key.is_empty() || partition_count == 0 {
        return 0;
    }
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % partition_count as u64) as i32
}

struct Shared {
    broker_count: i32,
    state: Mutex<ClusterState>,
    appended: Notify,
}

/// An in-memory cluster of `broker_count` brokers.
#[derive(Clone)]
pub struct MemoryBroker {
    shared: Arc<Shared>,
}

impl MemoryBroker {
    /// Creates an empty cluster. The broker count caps the replication factor
    /// of created topics.
    pub fn new(broker_count: i32) -> MemoryBroker {
        MemoryBroker {
            shared: Arc::new(Shared {
                broker_count,
                state: Mutex::new(ClusterState::default()),
                appended: Notify::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ClusterState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a topic directly, bypassing the admin API.
    pub fn add_topic(&self, name: &str, partitions: i32) {
        let partitions = (0..partitions.max(1)).map(|_| Vec::new()).collect();
        self.state().topics.insert(name.to_string(), partitions);
    }

    /// Appends a record to one partition of an existing topic, as another
    /// producer would.
    pub fn append(&self, topic: &str, partition: i32, key: &str, value: &str) -> Option<Record> {
        let record = self
            .state()
            .append(topic, Some(partition), key.as_bytes(), value.as_bytes());
        self.shared.appended.notify_waiters();
        record
    }

    /// All records of `topic`, ordered by partition then offset.
    pub fn records(&self, topic: &str) -> Vec<Record> {
        let state = self.state();
        let mut records = Vec::new();
        if let Some(partitions) = state.topics.get(topic) {
            for (partition, log) in partitions.iter().enumerate() {
                for (offset, stored) in log.iter().enumerate() {
                    records.push(Record {
                        topic: topic.to_string(),
                        partition: partition as i32,
                        offset: offset as i64,
                        key: stored.key.clone(),
                        value: stored.value.clone(),
                    });
                }
            }
        }
        records
    }

    /// Partition count of `topic`, if it exists.
    pub fn partition_count(&self, topic: &str) -> Option<usize> {
        self.state().topics.get(topic).map(Vec::len)
    }

    /// Number of create-topics requests received so far.
    pub fn create_requests(&self) -> usize {
        self.state().create_requests
    }

    /// The next create-topics request reports `code` for its topic.
    pub fn fail_next_create(&self, code: RDKafkaErrorCode) {
        self.state().create_errors.push_back(code);
    }

    /// The next `count` sends fail with `code`.
    pub fn fail_next_sends(&self, count: usize, code: RDKafkaErrorCode) {
        self.state()
            .send_errors
            .extend(std::iter::repeat(code).take(count));
    }

    /// The next poll of any consumer reports `code`.
    pub fn fail_next_poll(&self, code: RDKafkaErrorCode, retriable: bool) {
        self.state().fetch_errors.push_back(FetchError {
            error: KafkaError::MessageConsumption(code),
            retriable,
        });
        self.shared.appended.notify_waiters();
    }

    /// Metadata requests fail with `code` until cleared with `None`.
    pub fn fail_metadata(&self, code: Option<RDKafkaErrorCode>) {
        self.state().metadata_error = code;
    }

    /// Client creation fails while set.
    pub fn refuse_clients(&self, refuse: bool) {
        self.state().refuse_clients = refuse;
    }

    fn check_clients(&self) -> AppResult<()> {
        if self.state().refuse_clients {
            return Err(AppError::Connection(KafkaError::ClientCreation(
                "memory broker refused the client".to_string(),
            )));
        }
        Ok(())
    }
}

impl Broker for MemoryBroker {
    type Admin = MemoryBroker;
    type Source = MemorySource;
    type Sink = MemoryBroker;

    fn admin(&self) -> AppResult<MemoryBroker> {
        self.check_clients()?;
        Ok(self.clone())
    }

    fn consumer(&self, topic: &str, group_id: &str) -> AppResult<MemorySource> {
        self.check_clients()?;
        Ok(MemorySource {
            broker: self.clone(),
            topic: topic.to_string(),
            group_id: group_id.to_string(),
        })
    }

    fn producer(&self) -> AppResult<MemoryBroker> {
        self.check_clients()?;
        Ok(self.clone())
    }
}

impl TopicAdmin for MemoryBroker {
    async fn topic_names(&self) -> AppResult<Vec<String>> {
        let state = self.state();
        if let Some(code) = state.metadata_error {
            return Err(AppError::from_metadata(KafkaError::MetadataFetch(code)));
        }
        Ok(state.topics.keys().cloned().collect())
    }

    async fn create_topic(&self, topic: &TopicSpec) -> AppResult<Vec<TopicResult>> {
        let mut state = self.state();
        state.create_requests += 1;
        let result = if let Some(code) = state.create_errors.pop_front() {
            Err((topic.name.clone(), code))
        } else if state.topics.contains_key(&topic.name) {
            Err((topic.name.clone(), RDKafkaErrorCode::TopicAlreadyExists))
        } else {
            match topic.creation_counts() {
                Err(code) => Err((topic.name.clone(), code)),
                Ok((_, replication)) if replication > self.shared.broker_count => Err((
                    topic.name.clone(),
                    RDKafkaErrorCode::InvalidReplicationFactor,
                )),
                Ok((partitions, _)) => {
                    let partitions = (0..partitions).map(|_| Vec::new()).collect();
                    state.topics.insert(topic.name.clone(), partitions);
                    Ok(topic.name.clone())
                }
            }
        };
        Ok(vec![result])
    }
}

impl RecordSink for MemoryBroker {
    async fn send(&self, record: OutboundRecord<'_>) -> Result<Record, KafkaError> {
        let sent = {
            let mut state = self.state();
            if let Some(code) = state.send_errors.pop_front() {
                return Err(KafkaError::MessageProduction(code));
            }
            state.append(record.topic, None, record.key, record.value)
        };
        match sent {
            Some(sent) => {
                self.shared.appended.notify_waiters();
                Ok(sent)
            }
            None => Err(KafkaError::MessageProduction(
                RDKafkaErrorCode::UnknownTopicOrPartition,
            )),
        }
    }
}

/// A consumer group member of a [`MemoryBroker`].
pub struct MemorySource {
    broker: MemoryBroker,
    topic: String,
    group_id: String,
}

impl RecordSource for MemorySource {
    async fn poll(&self) -> Result<Vec<Record>, FetchError> {
        loop {
            // Registered before inspecting the state so an append between the
            // check and the await still wakes us.
            let appended = self.broker.shared.appended.notified();
            {
                let mut state = self.broker.state();
                if let Some(error) = state.fetch_errors.pop_front() {
                    return Err(error);
                }
                let batch = state.take_unread(&self.group_id, &self.topic);
                if !batch.is_empty() {
                    return Ok(batch);
                }
            }
            appended.await;
        }
    }
}
