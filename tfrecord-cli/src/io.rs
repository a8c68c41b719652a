use std::fs::File;
use std::io::Read;

use anyhow::{Context, Result};
use tfrecord::RecordWriterOptions;

/// Read record writer options from a TOML file.
pub fn load_writer_options(config_path: &str) -> Result<RecordWriterOptions> {
    let mut config_file = File::open(config_path)
        .context(format!("Cannot open configuration file '{}'", config_path))?;
    let mut config = String::new();
    config_file
        .read_to_string(&mut config)
        .context(format!("Cannot read configuration file: {}", config_path))?;

    toml::from_str(&config).context(format!("Cannot parse configuration file: {}", config_path))
}
