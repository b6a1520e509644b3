//! Logger setup for the binary.

use std::io::Write;
use std::thread;

use env_logger::Builder;
use log::LevelFilter;

/// Installs an `env_logger` writing `LEVEL - target - message` lines to stderr.
///
/// `rust_log` takes the usual `RUST_LOG` filter syntax (for example
/// `kafka_demo=debug,rdkafka=trace`) and is applied on top of the `info`
/// default. With `log_thread` set, each line is prefixed with the thread name.
pub fn setup_logger(log_thread: bool, rust_log: Option<&str>) {
    let mut builder = Builder::new();
    builder
        .format(move |buf, record| {
            let thread_name = if log_thread {
                format!("({}) ", thread::current().name().unwrap_or("unknown"))
            } else {
                String::new()
            };
            writeln!(
                buf,
                "{}{} - {} - {}",
                thread_name,
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Info);

    if let Some(conf) = rust_log {
        builder.parse_filters(conf);
    }

    builder.init();
}
