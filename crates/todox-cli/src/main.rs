//! `todox` command-line tool.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use todox_cli::logging::{LogConfig, LogFormat, init_logging};
use todox_cli::settings::load_settings;
use todox_cli::summary::print_import;
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{
    run_bundle, run_config, run_export, run_import, run_inspect, run_queue, run_unbundle,
};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let settings = load_settings(cli.config.as_deref());

    let result = match &cli.command {
        Command::Export(args) => run_export(args, &settings).map(|path| {
            println!("Exported {}", path.display());
            0
        }),
        Command::Import(args) => run_import(args, &settings).map(|batch| {
            print_import(&batch.documents, &batch.reports);
            i32::from(!batch.is_clean())
        }),
        Command::Inspect { file } => run_inspect(file).map(|verified| i32::from(!verified)),
        Command::Bundle(args) => run_bundle(args, &settings).map(|path| {
            println!("Wrote {}", path.display());
            0
        }),
        Command::Unbundle { bundle, enqueue } => {
            run_unbundle(bundle, *enqueue, &settings).map(|batch| {
                print_import(&batch.documents, &batch.reports);
                i32::from(!batch.is_clean())
            })
        }
        Command::Queue(command) => run_queue(command, &settings).map(|()| 0),
        Command::Config(command) => {
            run_config(command, cli.config.as_deref(), &settings).map(|()| 0)
        }
    };
    let exit_code = match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
