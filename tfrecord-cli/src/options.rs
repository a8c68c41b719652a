use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use tfrecord::{CompressionType, RecordWriterOptions};

use crate::io::load_writer_options;
use crate::traits::TFRecordOption;

const BUFFER_SIZE: &str = "BUFFER_SIZE";
const COMPRESSION: &str = "COMPRESSION";
const CONFIG: &str = "CONFIG";
const LEVEL: &str = "LEVEL";

/// Compression of a TFRecord file.
///
/// The value is `None` when the option is absent.
pub struct CompressionOption;

impl TFRecordOption for CompressionOption {
    type Value = Option<CompressionType>;

    fn add_to_app(app: Command) -> Command {
        app.arg(
            Arg::new(COMPRESSION)
                .long("compression")
                .value_name("TYPE")
                .help("Compression type: GZIP, ZLIB, or \"\" for none"),
        )
    }

    fn parse(matches: &ArgMatches) -> Result<Self::Value> {
        matches
            .get_one::<String>(COMPRESSION)
            .map(|compression_type| {
                compression_type
                    .parse()
                    .context("Cannot parse compression type")
            })
            .transpose()
    }
}

/// Record writer options from a configuration file and the command line.
///
/// Command line options take precedence over the configuration file.
pub struct WriterOptionsOption;

impl TFRecordOption for WriterOptionsOption {
    type Value = RecordWriterOptions;

    fn add_to_app(app: Command) -> Command {
        CompressionOption::add_to_app(app)
            .arg(
                Arg::new(CONFIG)
                    .long("config")
                    .value_name("FILE")
                    .help("Writer configuration file (TOML)"),
            )
            .arg(
                Arg::new(LEVEL)
                    .long("level")
                    .value_name("LEVEL")
                    .value_parser(value_parser!(u32).range(0..=9))
                    .help("Compression level"),
            )
            .arg(
                Arg::new(BUFFER_SIZE)
                    .long("buffer-size")
                    .value_name("BYTES")
                    .value_parser(value_parser!(usize))
                    .help("Size of the output buffer"),
            )
    }

    fn parse(matches: &ArgMatches) -> Result<Self::Value> {
        let mut options = match matches.get_one::<String>(CONFIG) {
            Some(config_path) => load_writer_options(config_path)?,
            None => RecordWriterOptions::default(),
        };

        if let Some(compression_type) = CompressionOption::parse(matches)? {
            options.compression_type = compression_type;
        }

        if let Some(&level) = matches.get_one::<u32>(LEVEL) {
            options = options.with_compression_level(level);
        }

        if let Some(&buffer_size) = matches.get_one::<usize>(BUFFER_SIZE) {
            options = options.with_buffer_size(buffer_size);
        }

        Ok(options)
    }
}
