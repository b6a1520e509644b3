//! Process configuration, resolved from environment variables.
//!
//! Every setting has a default which applies when the variable is unset or
//! set to the empty string. Integer settings that do not parse are an error,
//! never a silent fallback. Range checks are left to the code using a value:
//! partition count and replication factor only matter when a topic has to be
//! created, and a negative repeat count sends nothing.
//!
//! | Variable | Default |
//! |---|---|
//! | `APP_KAFKA_BROKER` | `localhost:19092` |
//! | `APP_KAFKA_TOPIC` | `topic` |
//! | `APP_KAFKA_TOPIC_PARTITION` | `3` |
//! | `APP_KAFKA_TOPIC_REPLICATION` | `2` |
//! | `APP_MODE` | `consumer` |
//! | `APP_CONSUMER_GROUP` | `default` |
//! | `APP_MESSAGE_KEY` | `default` |
//! | `APP_MESSAGE_VALUE` | `message` |
//! | `APP_MESSAGE_REPEAT` | `5` |

use std::env;
use std::fmt::Display;

use log::*;

use crate::error::{AppError, AppResult};
use crate::record::{BrokerEndpoints, TopicSpec};

pub const BROKER_VAR: &str = "APP_KAFKA_BROKER";
pub const TOPIC_VAR: &str = "APP_KAFKA_TOPIC";
pub const PARTITION_VAR: &str = "APP_KAFKA_TOPIC_PARTITION";
pub const REPLICATION_VAR: &str = "APP_KAFKA_TOPIC_REPLICATION";
pub const MODE_VAR: &str = "APP_MODE";
pub const GROUP_VAR: &str = "APP_CONSUMER_GROUP";
pub const KEY_VAR: &str = "APP_MESSAGE_KEY";
pub const VALUE_VAR: &str = "APP_MESSAGE_VALUE";
pub const REPEAT_VAR: &str = "APP_MESSAGE_REPEAT";

/// Reads named settings from a lookup function, applying defaults.
pub struct Resolver<F> {
    lookup: F,
}

impl Resolver<fn(&str) -> Option<String>> {
    /// Resolver over the process environment.
    pub fn from_env() -> Self {
        Resolver {
            lookup: |name| env::var(name).ok(),
        }
    }
}

impl<F> Resolver<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Resolver over an arbitrary lookup, e.g. a map in tests.
    pub fn new(lookup: F) -> Resolver<F> {
        Resolver { lookup }
    }

    /// Returns the value of `name` if set to a non-empty string, else `default`.
    pub fn resolve(&self, name: &str, default: &str) -> String {
        match (self.lookup)(name) {
            Some(value) if !value.is_empty() => value,
            _ => default.to_string(),
        }
    }

    /// Same as [`Resolver::resolve`], then parses the value as a base-10 integer.
    pub fn resolve_int(&self, name: &str, default: i64) -> AppResult<i64> {
        let value = self.resolve(name, "");
        if value.is_empty() {
            return Ok(default);
        }
        value
            .parse::<i64>()
            .map_err(|e| invalid_setting(name, &value, e))
    }
}

fn invalid_setting<E: Display>(name: &str, value: &str, reason: E) -> AppError {
    AppError::InvalidSetting {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn repeat_count(repeat: i64) -> usize {
    usize::try_from(repeat).unwrap_or_else(|_| {
        warn!("{} is {}, no records will be sent", REPEAT_VAR, repeat);
        0
    })
}

/// Settings of the producer burst.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BurstSpec {
    pub key: String,
    pub value_prefix: String,
    pub count: usize,
}

/// What the process does once the topic is provisioned. Fixed at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperatingMode {
    /// Poll the topic as a member of `group_id`, until shut down.
    Consumer { group_id: String },
    /// Send one burst of records, then exit.
    Producer(BurstSpec),
}

/// Snapshot of all settings, resolved once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub brokers: BrokerEndpoints,
    pub topic: TopicSpec,
    pub mode: OperatingMode,
}

impl AppConfig {
    /// Resolves the configuration from the process environment.
    pub fn from_env() -> AppResult<AppConfig> {
        AppConfig::resolve(&Resolver::from_env())
    }

    /// Resolves the configuration. Settings of the mode that was not selected
    /// are not read, so they cannot fail.
    pub fn resolve<F>(resolver: &Resolver<F>) -> AppResult<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let broker_list = resolver.resolve(BROKER_VAR, "localhost:19092");
        let brokers = BrokerEndpoints::parse(&broker_list);
        if brokers.is_empty() {
            return Err(invalid_setting(
                BROKER_VAR,
                &broker_list,
                "no broker endpoint",
            ));
        }

        let topic = TopicSpec {
            name: resolver.resolve(TOPIC_VAR, "topic"),
            partitions: resolver.resolve_int(PARTITION_VAR, 3)?,
            replication: resolver.resolve_int(REPLICATION_VAR, 2)?,
        };

        let mode = if resolver.resolve(MODE_VAR, "consumer") == "consumer" {
            OperatingMode::Consumer {
                group_id: resolver.resolve(GROUP_VAR, "default"),
            }
        } else {
            OperatingMode::Producer(BurstSpec {
                key: resolver.resolve(KEY_VAR, "default"),
                value_prefix: resolver.resolve(VALUE_VAR, "message"),
                count: repeat_count(resolver.resolve_int(REPEAT_VAR, 5)?),
            })
        };

        Ok(AppConfig {
            brokers,
            topic,
            mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn resolver(vars: &[(&str, &str)]) -> Resolver<impl Fn(&str) -> Option<String>> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        Resolver::new(move |name: &str| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::resolve(&resolver(&[])).unwrap();

        assert_eq!(config.brokers.as_slice(), &["localhost:19092"]);
        assert_eq!(
            config.topic,
            TopicSpec {
                name: "topic".to_string(),
                partitions: 3,
                replication: 2,
            }
        );
        assert_eq!(
            config.mode,
            OperatingMode::Consumer {
                group_id: "default".to_string()
            }
        );
    }

    #[test]
    fn test_empty_values_use_defaults() {
        let all_empty = [
            BROKER_VAR,
            TOPIC_VAR,
            PARTITION_VAR,
            REPLICATION_VAR,
            MODE_VAR,
            GROUP_VAR,
        ]
        .iter()
        .map(|name| (*name, ""))
        .collect::<Vec<_>>();

        let config = AppConfig::resolve(&resolver(&all_empty)).unwrap();
        assert_eq!(config, AppConfig::resolve(&resolver(&[])).unwrap());
    }

    #[test]
    fn test_empty_producer_values_use_defaults() {
        let config = AppConfig::resolve(&resolver(&[
            (MODE_VAR, "producer"),
            (KEY_VAR, ""),
            (VALUE_VAR, ""),
            (REPEAT_VAR, ""),
        ]))
        .unwrap();

        assert_eq!(
            config.mode,
            OperatingMode::Producer(BurstSpec {
                key: "default".to_string(),
                value_prefix: "message".to_string(),
                count: 5,
            })
        );
    }

    #[test]
    fn test_producer_settings() {
        let config = AppConfig::resolve(&resolver(&[
            (BROKER_VAR, "localhost:19092;localhost:29092"),
            (TOPIC_VAR, "payment"),
            (MODE_VAR, "producer"),
            (KEY_VAR, "k"),
            (VALUE_VAR, "v"),
            (REPEAT_VAR, "3"),
        ]))
        .unwrap();

        assert_eq!(config.brokers.bootstrap_servers(), "localhost:19092,localhost:29092");
        assert_eq!(config.topic.name, "payment");
        assert_eq!(
            config.mode,
            OperatingMode::Producer(BurstSpec {
                key: "k".to_string(),
                value_prefix: "v".to_string(),
                count: 3,
            })
        );
    }

    #[test]
    fn test_any_other_mode_is_producer() {
        let config = AppConfig::resolve(&resolver(&[(MODE_VAR, "Consumer")])).unwrap();
        assert!(matches!(config.mode, OperatingMode::Producer(_)));
    }

    #[test]
    fn test_resolve_int() {
        let resolver = resolver(&[("GOOD", "42"), ("NEGATIVE", "-7"), ("BAD", "4x2")]);

        assert_eq!(resolver.resolve_int("GOOD", 1).unwrap(), 42);
        assert_eq!(resolver.resolve_int("NEGATIVE", 1).unwrap(), -7);
        assert_eq!(resolver.resolve_int("MISSING", 9).unwrap(), 9);
        match resolver.resolve_int("BAD", 1) {
            Err(AppError::InvalidSetting { name, value, .. }) => {
                assert_eq!(name, "BAD");
                assert_eq!(value, "4x2");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_integer_is_fatal() {
        let result = AppConfig::resolve(&resolver(&[(PARTITION_VAR, "three")]));
        assert!(matches!(result, Err(AppError::InvalidSetting { .. })));
    }

    #[test]
    fn test_out_of_range_settings() {
        let config = AppConfig::resolve(&resolver(&[
            (PARTITION_VAR, "0"),
            (REPLICATION_VAR, "-1"),
        ]))
        .unwrap();
        assert_eq!((config.topic.partitions, config.topic.replication), (0, -1));

        let config =
            AppConfig::resolve(&resolver(&[(PARTITION_VAR, "4294967296")])).unwrap();
        assert_eq!(config.topic.partitions, 4_294_967_296);

        let result = AppConfig::resolve(&resolver(&[(BROKER_VAR, ";")]));
        assert!(matches!(result, Err(AppError::InvalidSetting { .. })));
    }

    #[test]
    fn test_negative_repeat_sends_nothing() {
        let config =
            AppConfig::resolve(&resolver(&[(MODE_VAR, "producer"), (REPEAT_VAR, "-1")])).unwrap();
        match config.mode {
            OperatingMode::Producer(burst) => assert_eq!(burst.count, 0),
            other => panic!("unexpected mode: {:?}", other),
        }
    }

    #[test]
    fn test_unused_mode_settings_are_not_read() {
        let config = AppConfig::resolve(&resolver(&[(REPEAT_VAR, "many")])).unwrap();
        assert!(matches!(config.mode, OperatingMode::Consumer { .. }));
    }

    #[test]
    fn test_zero_repeat() {
        let config =
            AppConfig::resolve(&resolver(&[(MODE_VAR, "producer"), (REPEAT_VAR, "0")])).unwrap();
        match config.mode {
            OperatingMode::Producer(burst) => assert_eq!(burst.count, 0),
            other => panic!("unexpected mode: {:?}", other),
        }
    }
}
