use std::fs;
use std::io::{self, prelude::*};
use std::path;
use std::process;

use bytesize::ByteSize;
use clap::ArgEnum;
use env_logger;
use log;
use rand::prelude::*;

use ext_radix::{check, RadixSorterBuilder, Record};

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let input = arg_parser.value_of("input").expect("value is required");

    if arg_parser.is_present("generate") {
        let count: u64 = arg_parser.value_of_t_or_exit("generate");
        if let Err(err) = generate_records(path::Path::new(input), count) {
            log::error!("input file generation error: {}", err);
            process::exit(1);
        }
        log::info!("generated {} random records into {}", count, input);
    }

    let mut sorter_builder = RadixSorterBuilder::new();

    if let Some(read_mem) = arg_parser.value_of("read_mem") {
        let read_mem = read_mem.parse::<ByteSize>().expect("value is pre-validated");
        sorter_builder = sorter_builder.with_read_mem(read_mem.as_u64() as usize);
    }

    if let Some(write_mem) = arg_parser.value_of("write_mem") {
        let write_mem = write_mem.parse::<ByteSize>().expect("value is pre-validated");
        sorter_builder = sorter_builder.with_write_mem(write_mem.as_u64() as usize);
    }

    if let Some(tmp_dir) = arg_parser.value_of("tmp_dir") {
        sorter_builder = sorter_builder.with_tmp_dir(path::Path::new(tmp_dir));
    }

    if let Err(err) = sorter_builder.build().sort(input) {
        log::error!("sorting error: {}", err);
        process::exit(1);
    }

    if arg_parser.is_present("check") {
        match check::is_sorted(input) {
            Ok(true) => log::info!("check passed: {} is sorted", input),
            Ok(false) => {
                log::error!("check failed: {} is not sorted", input);
                process::exit(1);
            }
            Err(err) => {
                log::error!("check error: {}", err);
                process::exit(1);
            }
        }
    }
}

fn generate_records(path: &path::Path, count: u64) -> io::Result<()> {
    let mut writer = io::BufWriter::new(fs::File::create(path)?);
    let mut rng = rand::thread_rng();

    for _ in 0..count {
        let record = Record {
            key: rng.gen(),
            value: rng.gen(),
        };
        writer.write_all(&record.to_bytes())?;
    }

    writer.flush()
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, false)
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("ext-radix")
        .about("external radix sorter for fixed-size record files")
        .arg(
            clap::Arg::new("input")
                .short('i')
                .long("input")
                .help("record file to be sorted in place")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("generate")
                .short('g')
                .long("generate")
                .help("generate this many random records into the input file before sorting")
                .takes_value(true)
                .validator(|v| match v.parse::<u64>() {
                    Ok(_) => Ok(()),
                    Err(err) => Err(format!("record count incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("check")
                .short('c')
                .long("check")
                .help("verify the file is sorted after sorting")
                .takes_value(false),
        )
        .arg(
            clap::Arg::new("read_mem")
                .short('r')
                .long("read-mem")
                .help("read-memory budget (chunk buffer size)")
                .takes_value(true)
                .validator(validate_byte_size),
        )
        .arg(
            clap::Arg::new("write_mem")
                .short('w')
                .long("write-mem")
                .help("write-memory budget (sum of bucket buffers)")
                .takes_value(true)
                .validator(validate_byte_size),
        )
        .arg(
            clap::Arg::new("tmp_dir")
                .short('d')
                .long("tmp-dir")
                .help("directory to be used to store the scratch file")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
        .get_matches()
}

fn validate_byte_size(v: &str) -> Result<(), String> {
    match v.parse::<ByteSize>() {
        Ok(_) => Ok(()),
        Err(err) => Err(format!("memory budget format incorrect: {}", err)),
    }
}

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}
