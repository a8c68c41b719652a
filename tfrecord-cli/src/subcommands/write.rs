use std::io::BufRead;

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use stdinout::Input;
use tfrecord::{RecordWriterOptions, Sink, TFRecordWriter};

use crate::options::WriterOptionsOption;
use crate::progress::RecordSpeed;
use crate::traits::{TFRecordApp, TFRecordOption};

const INPUT: &str = "INPUT";
const OUTPUT: &str = "OUTPUT";

pub struct WriteApp {
    input: Option<String>,
    options: RecordWriterOptions,
    output: String,
}

impl WriteApp {
    /// Write every line of `read` as a record, without the line terminator.
    fn write_lines<S>(read: impl BufRead, writer: &mut TFRecordWriter<S>) -> Result<usize>
    where
        S: Sink,
    {
        let mut speed = RecordSpeed::new();

        for line in read.split(b'\n') {
            let line = line.context("Cannot read line")?;
            writer
                .write_record(&line)
                .context(format!("Cannot write record {}", speed.n_records()))?;
            speed.count_record(line.len());
        }

        Ok(speed.n_records())
    }
}

impl TFRecordApp for WriteApp {
    fn app() -> Command {
        let app = Command::new("write")
            .about("Write lines as records to a TFRecord file")
            .arg(
                Arg::new(OUTPUT)
                    .help("TFRecord file")
                    .index(1)
                    .required(true),
            )
            .arg(Arg::new(INPUT).help("Input lines").index(2));
        WriterOptionsOption::add_to_app(app)
    }

    fn parse(matches: &ArgMatches) -> Result<Self> {
        let output = matches
            .get_one::<String>(OUTPUT)
            .cloned()
            .context("No output file specified")?;
        let input = matches.get_one::<String>(INPUT).cloned();
        let options = WriterOptionsOption::parse(matches)?;

        Ok(WriteApp {
            input,
            options,
            output,
        })
    }

    fn run(&self) -> Result<()> {
        let input = Input::from(self.input.as_ref());
        let read = input.buf_read().context("Cannot open input for reading")?;

        let mut writer = TFRecordWriter::create(&self.output, &self.options)
            .context(format!("Cannot create TFRecord file: {}", self.output))?;

        let n_records = Self::write_lines(read, &mut writer)?;

        writer
            .close()
            .context(format!("Cannot close TFRecord file: {}", self.output))?;

        log::info!("Wrote {} records to {}", n_records, self.output);

        Ok(())
    }
}
