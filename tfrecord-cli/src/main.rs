use std::io::stdout;

use anyhow::Result;
use clap::{crate_version, value_parser, Arg, Command};
use clap_complete::{generate, Shell};

pub mod io;

pub mod options;

pub mod progress;

mod subcommands;

pub mod traits;
use traits::TFRecordApp;

fn main() -> Result<()> {
    // Known subapplications.
    let apps = vec![
        subcommands::CatApp::app(),
        subcommands::VerifyApp::app(),
        subcommands::WriteApp::app(),
    ];

    env_logger::init();

    let mut cli = Command::new("tfrecord")
        .about("Write and read TFRecord files")
        .version(crate_version!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommands(apps)
        .subcommand(
            Command::new("completions")
                .about("Generate completion scripts for your shell")
                .arg_required_else_help(true)
                .arg(
                    Arg::new("shell")
                        .value_parser(value_parser!(Shell))
                        .required(true),
                ),
        );
    let matches = cli.clone().get_matches();

    match matches.subcommand() {
        Some(("cat", matches)) => subcommands::CatApp::parse(matches)?.run(),
        Some(("completions", matches)) => {
            if let Some(&shell) = matches.get_one::<Shell>("shell") {
                generate(shell, &mut cli, "tfrecord", &mut stdout());
            }
            Ok(())
        }
        Some(("verify", matches)) => subcommands::VerifyApp::parse(matches)?.run(),
        Some(("write", matches)) => subcommands::WriteApp::parse(matches)?.run(),
        _unknown => unreachable!(),
    }
}
