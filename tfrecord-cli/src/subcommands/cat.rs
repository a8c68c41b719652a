use std::io::{BufWriter, Read, Write};

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use stdinout::{Input, Output};
use tfrecord::{CompressionType, TFRecordReader};

use crate::options::CompressionOption;
use crate::traits::{TFRecordApp, TFRecordOption};

const INPUT: &str = "INPUT";
const OUTPUT: &str = "OUTPUT";

pub struct CatApp {
    compression_type: CompressionType,
    input: Option<String>,
    output: Option<String>,
}

impl CatApp {
    /// Write the payload of every record, followed by a newline.
    fn cat_records<R>(reader: TFRecordReader<R>, write: &mut impl Write) -> Result<usize>
    where
        R: Read,
    {
        let mut n_records = 0;
        for record in reader {
            let record = record.context(format!("Cannot read record {}", n_records))?;
            write.write_all(&record).context("Cannot write record")?;
            write.write_all(b"\n").context("Cannot write record")?;
            n_records += 1;
        }

        Ok(n_records)
    }
}

impl TFRecordApp for CatApp {
    fn app() -> Command {
        let app = Command::new("cat")
            .about("Print the records of a TFRecord file, one per line")
            .arg(Arg::new(INPUT).help("TFRecord file").index(1))
            .arg(Arg::new(OUTPUT).help("Output file").index(2));
        CompressionOption::add_to_app(app)
    }

    fn parse(matches: &ArgMatches) -> Result<Self> {
        let compression_type = CompressionOption::parse(matches)?.unwrap_or_default();
        let input = matches.get_one::<String>(INPUT).cloned();
        let output = matches.get_one::<String>(OUTPUT).cloned();

        Ok(CatApp {
            compression_type,
            input,
            output,
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

        let output = Output::from(self.output.as_ref());
        let mut write = BufWriter::new(output.write().context("Cannot open output for writing")?);

        let n_records = Self::cat_records(reader, &mut write)?;
        write.flush().context("Cannot flush output")?;

        log::info!("Read {} records", n_records);

        Ok(())
    }
}
