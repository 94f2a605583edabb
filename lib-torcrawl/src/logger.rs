use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;

/// Chatty dependencies that would otherwise drown the crawl log, and the
/// loudest level each one keeps even under `--verbose`.
const QUIET_MODULES: &[(&str, LevelFilter)] = &[
    ("rustls", LevelFilter::Error),
    ("html5ever", LevelFilter::Error),
    ("hickory_resolver", LevelFilter::Error),
    ("hyper_util", LevelFilter::Error),
];

/// Stderr logging for the whole process. Verbose mode lowers the root level
/// to debug; the per-module caps above apply either way.
pub fn init_logger(is_verbose: bool) -> log4rs::Handle {
    let root_level = if is_verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{d(%H:%M:%S%.3f)} {h({l:<5})} [{t}] {m}{n}",
        )))
        .build();

    let mut builder =
        Config::builder().appender(Appender::builder().build("console", Box::new(console)));
    for &(module, level) in QUIET_MODULES {
        builder = builder.logger(Logger::builder().build(module, level));
    }

    let config = builder
        .build(Root::builder().appender("console").build(root_level))
        .expect("could not config logger");

    log4rs::init_config(config).expect("could not start logger")
}
