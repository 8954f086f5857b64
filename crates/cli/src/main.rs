// FILE: crates/cli/src/main.rs

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use loanload_config::SettingsManager;
use std::path::PathBuf;

mod commands;

fn build_cli() -> Command {
    Command::new("loanload")
        .version("0.1.0")
        .author("DrTomLLC")
        .about("Keeps the audiobook download tool in step with your library loans")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("More output; repeat for trace logging")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("settings-dir")
                .long("settings-dir")
                .value_name("DIR")
                .help("Directory holding settings.toml")
                .global(true),
        )
        .subcommand(
            Command::new("configure")
                .about("Merge your signed-in libraries into the download tool configuration")
                .arg(export_arg())
                .arg(
                    Arg::new("dry-run")
                        .short('n')
                        .long("dry-run")
                        .help("Show the merged configuration without writing it")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("download")
                .about("Download every loan that is not in the library yet")
                .arg(export_arg())
                .arg(dest_arg()),
        )
        .subcommand(
            Command::new("plan")
                .about("Show where a loan would be staged and stored")
                .arg(Arg::new("loan_id").required(true).value_name("LOAN_ID").help("Loan ID"))
                .arg(dest_arg()),
        )
        .subcommand(
            Command::new("loans")
                .about("List current loans and their local state")
                .arg(export_arg()),
        )
        .subcommand(
            Command::new("settings")
                .about("Show or reset loanload's own settings")
                .subcommand(Command::new("show").about("Print the effective settings"))
                .subcommand(Command::new("init").about("Write a default settings file if none exists"))
                .subcommand(Command::new("reset").about("Overwrite the settings file with defaults")),
        )
        .subcommand(
            Command::new("backups")
                .about("Manage backups of the download tool configuration")
                .subcommand(Command::new("list").about("List backups, newest first"))
                .subcommand(
                    Command::new("restore")
                        .about("Replace the configuration with a backup")
                        .arg(Arg::new("file").required(true).value_name("FILE").help("Backup file name or path")),
                ),
        )
}

fn export_arg() -> Arg {
    Arg::new("export")
        .short('e')
        .long("export")
        .value_name("FILE")
        .help("Read an existing session export instead of running the session tool")
}

fn dest_arg() -> Arg {
    Arg::new("dest")
        .short('d')
        .long("dest")
        .value_name("DIR")
        .help("Download root, overrides the settings and AUDIOBOOK_FOLDER")
}

fn settings_manager(matches: &ArgMatches) -> Result<SettingsManager> {
    match matches.get_one::<String>("settings-dir") {
        Some(dir) => Ok(SettingsManager::with_directory(PathBuf::from(dir))),
        None => Ok(SettingsManager::new()?),
    }
}

/// `-v`/`-vv` win over the settings file; `RUST_LOG` wins over both
fn init_logging(verbosity: u8, configured: log::LevelFilter) {
    let level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_env(env_logger::Env::default())
        .init();
}

fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let manager = settings_manager(&matches)?;

    // Settings subcommands must work even when the file does not parse
    let loaded = manager.load_with_env_overrides();
    let configured = loaded
        .as_ref()
        .map(|s| s.log_level.as_filter())
        .unwrap_or(log::LevelFilter::Info);
    init_logging(matches.get_count("verbose"), configured);

    if let Some(("settings", sub_matches)) = matches.subcommand() {
        return commands::settings(&manager, sub_matches);
    }

    let settings = loaded.map_err(commands::app_error)?;

    match matches.subcommand() {
        Some(("configure", sub_matches)) => commands::configure(&settings, sub_matches),
        Some(("download", sub_matches)) => commands::download(&settings, sub_matches),
        Some(("plan", sub_matches)) => commands::plan(&settings, sub_matches),
        Some(("loans", sub_matches)) => commands::loans(&settings, sub_matches),
        Some(("backups", sub_matches)) => commands::backups(&settings, sub_matches),
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
