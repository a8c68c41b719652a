use std::io::Read;

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use stdinout::Input;
use tfrecord::{CompressionType, TFRecordReader};

use crate::options::CompressionOption;
use crate::traits::{TFRecordApp, TFRecordOption};

const INPUT: &str = "INPUT";

pub struct VerifyApp {
    compression_type: CompressionType,
    input: Option<String>,
}

impl VerifyApp {
    /// Count the records in a TFRecord stream, failing on the first
    /// invalid record.
    fn count_records<R>(reader: TFRecordReader<R>) -> Result<usize>
    where
        R: Read,
    {
        let mut n_records = 0;
        for record in reader {
            record.context(format!("Record {} is invalid", n_records))?;
            n_records += 1;
        }
        Ok(n_records)
    }
}

impl TFRecordApp for VerifyApp {
    fn app() -> Command {
        let app = Command::new("verify")
            .about("Verify the checksums of a TFRecord file")
            .arg(Arg::new(INPUT).help("TFRecord file").index(1));
        CompressionOption::add_to_app(app)
    }

    fn parse(matches: &ArgMatches) -> Result<Self> {
        let compression_type = CompressionOption::parse(matches)?.unwrap_or_default();
        let input = matches.get_one::<String>(INPUT).cloned();

        Ok(VerifyApp {
            compression_type,
            input,
        })
    }

    fn run(&self) -> Result<()> {
        let input = Input::from(self.input.as_ref());
        let reader = TFRecordReader::new(
            input
                .buf_read()
                .context("Cannot open TFRecord file for reading")?,
            self.compression_type,
        );

        let n_records = Self::count_records(reader)?;
        println!("{} valid records", n_records);

        Ok(())
    }
}
