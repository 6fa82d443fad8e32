// SPDX-License-Identifier: Apache-2.0

mod client;
mod config;
mod daemon;
mod error;
mod persist;
mod transport;

use std::io::Read;

use env_logger::Builder;
use log::LevelFilter;

use crate::client::Client;
use crate::config::{BackendKind, Config};
use crate::error::{CliError, DEFAULT_ERROR_CODE};

const APP_NAME: &str = "netdctl";

const SUB_CMD_DAEMON: &str = "daemon";
const SUB_CMD_EXEC: &str = "exec";
const SUB_CMD_SHELL: &str = "shell";
const SUB_CMD_RPC: &str = "rpc";
const SUB_CMD_COMPLETE: &str = "complete";
const SUB_CMD_VERSION: &str = "version";

fn new_app() -> clap::Command<'static> {
    clap::Command::new(APP_NAME)
        .version(clap::crate_version!())
        .about("Daemon and command line client of netd")
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .multiple_occurrences(true)
                .help("Set verbose level")
                .global(true),
        )
        .arg(
            clap::Arg::new("quiet")
                .short('q')
                .help("Disable logging")
                .global(true),
        )
        .arg(
            clap::Arg::new("CONFIG")
                .short('c')
                .long("config")
                .takes_value(true)
                .default_value(Config::DEFAULT_CONFIG_PATH)
                .help("Configuration file")
                .global(true),
        )
        .arg(
            clap::Arg::new("SOCKET")
                .short('s')
                .long("socket")
                .takes_value(true)
                .help("Socket path, overriding the configuration file")
                .global(true),
        )
        .subcommand(
            clap::Command::new(SUB_CMD_DAEMON)
                .about("Run the netd daemon in foreground")
                .arg(
                    clap::Arg::new("BACKEND")
                        .long("backend")
                        .takes_value(true)
                        .possible_values(["kernel", "memory"])
                        .help("Network backend, overriding the configuration"),
                ),
        )
        .subcommand(
            clap::Command::new(SUB_CMD_EXEC)
                .about("Run one command, e.g. `exec show route fib 1`")
                .arg(
                    clap::Arg::new("COMMAND")
                        .required(true)
                        .multiple_values(true)
                        .allow_hyphen_values(true)
                        .index(1)
                        .help("Command words"),
                )
                .arg(
                    clap::Arg::new("RPC")
                        .long("rpc")
                        .takes_value(false)
                        .help("Send the command as an RPC envelope"),
                ),
        )
        .subcommand(
            clap::Command::new(SUB_CMD_SHELL)
                .about("Interactive shell (default)")
                .arg(
                    clap::Arg::new("RPC")
                        .long("rpc")
                        .takes_value(false)
                        .help("Send commands as RPC envelopes"),
                ),
        )
        .subcommand(
            clap::Command::new(SUB_CMD_RPC)
                .about("Send a raw RPC envelope and print the reply")
                .arg(
                    clap::Arg::new("FILE")
                        .index(1)
                        .help("File holding the envelope, stdin by default"),
                ),
        )
        .subcommand(
            clap::Command::new(SUB_CMD_COMPLETE)
                .about("List completions of a partial command line")
                .arg(
                    clap::Arg::new("LINE")
                        .index(1)
                        .default_value("")
                        .help("Partial command line"),
                ),
        )
        .subcommand(
            clap::Command::new(SUB_CMD_VERSION).about("Show version"),
        )
}

fn main() {
    let matches = new_app().get_matches();

    let (log_module_filters, log_level) =
        match matches.occurrences_of("verbose") {
            0 => (vec!["netd", APP_NAME], LevelFilter::Info),
            1 => (vec!["netd", APP_NAME], LevelFilter::Debug),
            _ => (vec![""], LevelFilter::Debug),
        };

    if !matches.is_present("quiet") {
        let mut log_builder = Builder::new();
        for log_module_filter in log_module_filters {
            if !log_module_filter.is_empty() {
                log_builder.filter(Some(log_module_filter), log_level);
            } else {
                log_builder.filter(None, log_level);
            }
        }
        log_builder.init();
    }

    // Global arguments are propagated into the subcommand matches
    let leaf_matches = match matches.subcommand() {
        Some((_, sub_matches)) => sub_matches,
        None => &matches,
    };

    match matches.subcommand_name() {
        Some(SUB_CMD_DAEMON) => print_result_and_exit(daemon(leaf_matches)),
        Some(SUB_CMD_EXEC) => print_result_and_exit(exec(leaf_matches)),
        Some(SUB_CMD_RPC) => print_result_and_exit(raw_rpc(leaf_matches)),
        Some(SUB_CMD_COMPLETE) => print_result_and_exit(complete(leaf_matches)),
        Some(SUB_CMD_VERSION) => print_string_and_exit(format!(
            "{} {}",
            APP_NAME,
            clap::crate_version!()
        )),
        Some(SUB_CMD_SHELL) => {
            let rpc = leaf_matches.is_present("RPC");
            print_result_and_exit(shell(leaf_matches, rpc))
        }
        _ => print_result_and_exit(shell(leaf_matches, false)),
    }
}

fn print_result_and_exit(result: Result<String, CliError>) {
    match result {
        Ok(s) => print_string_and_exit(s),
        Err(e) => print_error_and_exit(e),
    }
}

fn print_error_and_exit(e: CliError) {
    eprintln!("{e}");
    std::process::exit(if e.code == 0 { DEFAULT_ERROR_CODE } else { e.code });
}

fn print_string_and_exit(s: String) {
    if !s.is_empty() {
        println!("{s}");
    }
    std::process::exit(0);
}

fn load_config(matches: &clap::ArgMatches) -> Result<Config, CliError> {
    Config::load(matches.value_of("CONFIG").unwrap_or_default())
}

fn client_socket(config: &Config, matches: &clap::ArgMatches) -> String {
    matches
        .value_of("SOCKET")
        .unwrap_or(config.client.socket_path.as_str())
        .to_string()
}

fn daemon(matches: &clap::ArgMatches) -> Result<String, CliError> {
    let mut config = load_config(matches)?;
    if let Some(socket_path) = matches.value_of("SOCKET") {
        config.daemon.socket_path = socket_path.to_string();
    }
    if let Some(backend) = matches.value_of("BACKEND") {
        config.daemon.backend = backend.parse::<BackendKind>()?;
    }
    daemon::run_daemon(&config.daemon)
}

fn exec(matches: &clap::ArgMatches) -> Result<String, CliError> {
    let config = load_config(matches)?;
    let words: Vec<&str> = matches
        .values_of("COMMAND")
        .map(|v| v.collect())
        .unwrap_or_default();
    let use_rpc = config.client.use_rpc || matches.is_present("RPC");
    Client::new(&client_socket(&config, matches), use_rpc)
        .execute(&words.join(" "))
}

fn shell(matches: &clap::ArgMatches, rpc: bool) -> Result<String, CliError> {
    let config = load_config(matches)?;
    let use_rpc = config.client.use_rpc || rpc;
    Client::new(&client_socket(&config, matches), use_rpc).shell()
}

fn raw_rpc(matches: &clap::ArgMatches) -> Result<String, CliError> {
    let mut envelope = String::new();
    match matches.value_of("FILE") {
        Some(path) => {
            std::fs::File::open(path)?.read_to_string(&mut envelope)?;
        }
        None => {
            std::io::stdin().read_to_string(&mut envelope)?;
        }
    }
    if !netd::is_rpc(&envelope) {
        return Err(CliError::data_error(
            "Input is not an XML RPC envelope".to_string(),
        ));
    }
    let config = load_config(matches)?;
    Client::new(&client_socket(&config, matches), true)
        .request(envelope.trim())
}

fn complete(matches: &clap::ArgMatches) -> Result<String, CliError> {
    let partial = matches.value_of("LINE").unwrap_or_default();
    Ok(Client::new("", false).complete(partial).join("\n"))
}
