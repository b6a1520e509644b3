//! Error manipulations.

use std::{error, fmt, io};

use rdkafka::error::{KafkaError, RDKafkaErrorCode};

/// Application result.
pub type AppResult<T> = Result<T, AppError>;

/// Represents every fatal failure of the client.
///
/// Per-record send failures are not errors at this level; they are printed
/// and the burst continues.
#[derive(Debug)]
pub enum AppError {
    /// A setting could not be parsed or is out of range.
    InvalidSetting {
        /// Environment variable name.
        name: String,
        /// Raw value that was rejected.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// A broker client could not be created or the cluster is unreachable.
    Connection(KafkaError),
    /// Cluster metadata fetch failed.
    Metadata(KafkaError),
    /// The create-topics request as a whole failed.
    CreateTopics(KafkaError),
    /// The consumer could not subscribe to the topic.
    Subscription(KafkaError),
    /// A non-retriable fetch error was reported by the consumer.
    Fetch(KafkaError),
    /// Writing a record line failed.
    Output(io::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            AppError::InvalidSetting {
                ref name,
                ref value,
                ref reason,
            } => write!(f, "Invalid setting {}={:?}: {}", name, value, reason),
            AppError::Connection(ref err) => write!(f, "Connection error: {}", err),
            AppError::Metadata(ref err) => write!(f, "Metadata fetch error: {}", err),
            AppError::CreateTopics(ref err) => write!(f, "Create topics error: {}", err),
            AppError::Subscription(ref err) => write!(f, "Subscription error: {}", err),
            AppError::Fetch(ref err) => write!(f, "Fetch error: {}", err),
            AppError::Output(ref err) => write!(f, "Output error: {}", err),
        }
    }
}

impl error::Error for AppError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            AppError::InvalidSetting { .. } => None,
            AppError::Connection(ref err)
            | AppError::Metadata(ref err)
            | AppError::CreateTopics(ref err)
            | AppError::Subscription(ref err)
            | AppError::Fetch(ref err) => Some(err),
            AppError::Output(ref err) => Some(err),
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> AppError {
        AppError::Output(err)
    }
}

impl AppError {
    /// Wraps a metadata failure, promoting it to a connection error when the
    /// brokers could not be reached at all.
    pub fn from_metadata(err: KafkaError) -> AppError {
        if is_unreachable(&err) {
            AppError::Connection(err)
        } else {
            AppError::Metadata(err)
        }
    }
}

/// Reports whether the error means that no broker answered.
pub fn is_unreachable(err: &KafkaError) -> bool {
    matches!(
        err.rdkafka_error_code(),
        Some(RDKafkaErrorCode::AllBrokersDown)
            | Some(RDKafkaErrorCode::BrokerTransportFailure)
            | Some(RDKafkaErrorCode::Resolve)
    )
}

/// Reports whether a consumer error can be left to the client's own retries.
///
/// Only authorization failures and errors librdkafka flags as fatal stop the
/// consumer loop.
pub fn is_retriable(err: &KafkaError) -> bool {
    !matches!(
        err.rdkafka_error_code(),
        Some(RDKafkaErrorCode::Fatal)
            | Some(RDKafkaErrorCode::Authentication)
            | Some(RDKafkaErrorCode::TopicAuthorizationFailed)
            | Some(RDKafkaErrorCode::GroupAuthorizationFailed)
            | Some(RDKafkaErrorCode::ClusterAuthorizationFailed)
            | Some(RDKafkaErrorCode::SaslAuthenticationFailed)
            | Some(RDKafkaErrorCode::InvalidGroupId)
    )
}
