// SPDX-License-Identifier: Apache-2.0

use netd::NetdError;

// Exit codes follow sysexits.h where one fits.
pub(crate) const DEFAULT_ERROR_CODE: i32 = 1;
pub(crate) const EX_USAGE: i32 = 64;
pub(crate) const EX_DATAERR: i32 = 65;

/// Failure of a netdctl subcommand, printed to stderr before exiting with
/// `code`.
#[derive(Debug)]
pub(crate) struct CliError {
    pub(crate) code: i32,
    pub(crate) error_msg: String,
}

impl CliError {
    pub(crate) fn new(code: i32, error_msg: String) -> Self {
        Self { code, error_msg }
    }

    /// Invalid input: configuration, frame or command.
    pub(crate) fn data_error(error_msg: String) -> Self {
        Self::new(EX_DATAERR, error_msg)
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.error_msg)
    }
}

impl From<&str> for CliError {
    fn from(msg: &str) -> Self {
        Self::new(DEFAULT_ERROR_CODE, msg.to_string())
    }
}

impl From<String> for CliError {
    fn from(msg: String) -> Self {
        Self::new(DEFAULT_ERROR_CODE, msg)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(DEFAULT_ERROR_CODE, format!("I/O error: {e}"))
    }
}

impl From<NetdError> for CliError {
    fn from(e: NetdError) -> Self {
        Self::data_error(e.to_string())
    }
}

impl From<toml::de::Error> for CliError {
    fn from(e: toml::de::Error) -> Self {
        Self::data_error(format!("Invalid configuration: {e}"))
    }
}

impl From<ctrlc::Error> for CliError {
    fn from(e: ctrlc::Error) -> Self {
        Self::new(
            DEFAULT_ERROR_CODE,
            format!("Failed to set Ctrl-C handler: {e}"),
        )
    }
}
