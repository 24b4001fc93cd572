
extern crate log;

use {
    log::{Log, Record, LevelFilter, Metadata},
};

/// Initialize the logging infrastructure.
///
/// The level comes from the `RUST_LOG` environment variable; a verbose
/// flag on the command line (`-v`) forces at least the `info` level.
pub fn init(verbose: bool) {
    let mut lvl = if verbose { Some(LevelFilter::Info) } else { None };
    if let Ok(s) = std::env::var("RUST_LOG") {
        match s.as_str() {
            "none" | "off" => (),
            "error" => lvl = Some(LevelFilter::Error),
            "warn" => lvl = Some(LevelFilter::Warn),
            "info" => lvl = Some(LevelFilter::Info),
            "debug" => lvl = Some(LevelFilter::Debug),
            "trace" => lvl = Some(LevelFilter::Trace),
            s => {
                eprintln!("unknown logging level {:?}", s);
            }
        }
    }
    let lvl = match lvl {
        None => return, // disabled
        Some(l) => l,
    };
    let logger = Logger(lvl);
    log::set_max_level(lvl);
    log::set_boxed_logger(Box::new(logger)).unwrap();
}

/// Logger implementation.
struct Logger(LevelFilter);

impl Log for Logger {
    #[inline(always)]
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.0
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let path = record.module_path().unwrap_or("<>");
            eprintln!("[{} {}] {}", record.level(), path, record.args());
        }
    }

    fn flush(&self) {}
}
