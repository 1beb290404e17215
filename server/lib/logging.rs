use std::path::Path;
use anyhow::Result;
use log::LevelFilter;
use log4rs::{
    append::{
        console::{ ConsoleAppender, Target },
        file::FileAppender,
    },
    config::{ Appender, Config, Root },
    encode::pattern::PatternEncoder,
    Handle,
};

const ENCODE_STR: &str = "{d(%Y-%m-%d %H:%M:%S)} [{h({l:>5})}] {m}{n}";

fn gen_logger_config(level: LevelFilter, logfile: Option<&Path>) -> Result<Config> {
    let stderr = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(ENCODE_STR)))
        .target(Target::Stderr)
        .build();

    let logfile = logfile
        .map(|path| {
            FileAppender::builder()
                .encoder(Box::new(PatternEncoder::new(ENCODE_STR)))
                .build(path)
        })
        .transpose()?;

    let root = Root::builder().appender("stderr");
    let root = if logfile.is_some() { root.appender("logfile") } else { root };
    let root = root.build(level);

    let builder = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)));
    let builder = if let Some(logfile) = logfile {
        builder.appender(Appender::builder().build("logfile", Box::new(logfile)))
    } else {
        builder
    };
    Ok(builder.build(root)?)
}

/// Install the global logger: stderr, plus `logfile` if given.
pub fn logger_init(level: LevelFilter, logfile: Option<&Path>) -> Result<Handle> {
    let config = gen_logger_config(level, logfile)?;
    Ok(log4rs::init_config(config)?)
}
