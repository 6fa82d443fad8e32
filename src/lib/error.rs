// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Input holds a character no token can start with.
    LexError,
    /// Token not accepted in current parser state or incomplete command.
    SyntaxError,
    /// Well formed command holding invalid value.
    SemanticError,
    /// Verb and target combination has no meaning.
    UnknownTarget,
    /// Staging buffer capacity exceeded.
    StagingFull,
    /// Configurator failed while applying a staged entry.
    ApplyError,
    /// RPC envelope holds no known operation.
    UnknownOperation,
    /// Configurator failed outside of commit.
    PluginFailure,
    NotSupportedError,
    Bug,
}

impl Default for ErrorKind {
    fn default() -> Self {
        Self::Bug
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::fmt::Display for NetdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.line.is_empty() {
            write!(
                f,
                "{}: {}\n| {}\n| {:.<4$}^",
                self.kind, self.msg, self.line, "", self.position
            )
        } else {
            write!(f, "{}: {}", self.kind, self.msg)
        }
    }
}

impl Error for NetdError {}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct NetdError {
    kind: ErrorKind,
    msg: String,
    line: String,
    position: usize,
}

impl NetdError {
    pub fn new(kind: ErrorKind, msg: String) -> Self {
        Self {
            kind,
            msg,
            ..Default::default()
        }
    }

    pub fn new_input_error(
        kind: ErrorKind,
        msg: String,
        line: &str,
        position: usize,
    ) -> Self {
        Self {
            kind,
            line: line.to_string(),
            msg,
            position,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn msg(&self) -> &str {
        self.msg.as_str()
    }

    pub fn line(&self) -> &str {
        self.line.as_str()
    }

    /// The position of character in line which cause the error, the first
    /// character is position 0. Only meaningful when [NetdError::line] is not
    /// empty.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl From<std::net::AddrParseError> for NetdError {
    fn from(e: std::net::AddrParseError) -> Self {
        NetdError::new(
            ErrorKind::SemanticError,
            format!("Invalid IP address: {e}"),
        )
    }
}

impl From<quick_xml::Error> for NetdError {
    fn from(e: quick_xml::Error) -> Self {
        NetdError::new(
            ErrorKind::UnknownOperation,
            format!("Malformed RPC envelope: {e}"),
        )
    }
}

impl From<quick_xml::events::attributes::AttrError> for NetdError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        NetdError::new(
            ErrorKind::UnknownOperation,
            format!("Malformed attribute in RPC envelope: {e}"),
        )
    }
}
