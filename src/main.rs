use std::io;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Arg, ArgAction, Command};
use log::*;

use rdkafka::util::get_rdkafka_version;

use kafka_demo::logging::setup_logger;
use kafka_demo::{run, AppConfig, Outcome, OutputFormat, RecordPrinter, Session};

const ENV_HELP: &str = "\
Environment:
  APP_KAFKA_BROKER             ;-separated broker list  [default: localhost:19092]
  APP_KAFKA_TOPIC              topic to provision/use   [default: topic]
  APP_KAFKA_TOPIC_PARTITION    partitions on creation   [default: 3]
  APP_KAFKA_TOPIC_REPLICATION  replicas on creation     [default: 2]
  APP_MODE                     consumer, anything else produces  [default: consumer]
  APP_CONSUMER_GROUP           consumer group id        [default: default]
  APP_MESSAGE_KEY              producer record key      [default: default]
  APP_MESSAGE_VALUE            producer value prefix    [default: message]
  APP_MESSAGE_REPEAT           records per burst        [default: 5]";

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for the interrupt signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Interrupt received, stopping");
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = Command::new("kafka-demo")
        .version(option_env!("CARGO_PKG_VERSION").unwrap_or(""))
        .about("Provision a topic, then consume from it or produce a burst of records to it")
        .after_help(ENV_HELP)
        .arg(
            Arg::new("log-conf")
                .long("log-conf")
                .help("Configure the logging format (example: 'rdkafka=trace')")
                .num_args(1),
        )
        .arg(
            Arg::new("log-thread")
                .long("log-thread")
                .help("Prefix log lines with the thread name")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_parser(clap::value_parser!(u64))
                .help("Metadata, admin and delivery timeout in milliseconds")
                .num_args(1)
                .default_value("30000"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .value_parser(["text", "json"])
                .help("Format of the record lines printed to stdout")
                .num_args(1)
                .default_value("text"),
        )
        .get_matches();

    setup_logger(
        matches.get_flag("log-thread"),
        matches.get_one::<String>("log-conf").map(String::as_str),
    );

    let (version_n, version_s) = get_rdkafka_version();
    info!("rd_kafka_version: 0x{:08x}, {}", version_n, version_s);

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    debug!("Configuration: {:?}", config);

    let timeout = matches.get_one::<u64>("timeout").copied().unwrap_or(30000);
    let format = matches
        .get_one::<String>("output")
        .and_then(|format| format.parse::<OutputFormat>().ok())
        .unwrap_or_default();

    let session = Session::new(config.brokers.clone(), Duration::from_millis(timeout));
    info!("Connecting to {}", session.endpoints());

    let mut printer = RecordPrinter::new(io::stdout(), format);
    match run(&session, &config, shutdown_signal(), &mut printer).await {
        Ok(report) => {
            match report.outcome {
                Outcome::Consumed(count) => info!("Consumed {} records", count),
                Outcome::Produced(summary) => info!(
                    "Produced {} records, {} failed",
                    summary.delivered, summary.failed
                ),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
