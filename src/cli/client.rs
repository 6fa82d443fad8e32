// SPDX-License-Identifier: Apache-2.0

use std::io::{BufRead, Write};
use std::os::unix::net::UnixStream;

use netd::{cli_to_rpc, parse_rpc_reply, Grammar, RpcReply};

use crate::{
    error::{CliError, DEFAULT_ERROR_CODE},
    transport::{read_frame, write_frame, MAX_RESPONSE_SIZE},
};

const PROMPT: &str = "net> ";
const ERROR_PREFIX: &str = "Error: ";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellAction {
    Skip,
    Quit,
    Complete(String),
    Send(String),
}

fn shell_action(line: &str) -> ShellAction {
    let trimmed = line.trim();
    match trimmed {
        "" => ShellAction::Skip,
        "quit" | "exit" => ShellAction::Quit,
        "help" => ShellAction::Send("show".to_string()),
        _ => match line.trim_start().strip_suffix('?') {
            Some(partial) => ShellAction::Complete(partial.to_string()),
            None => ShellAction::Send(trimmed.to_string()),
        },
    }
}

/// Connection to the daemon, opened on first use and reopened after a
/// transport failure.
#[derive(Debug)]
pub(crate) struct Client {
    socket_path: String,
    use_rpc: bool,
    grammar: Grammar,
    stream: Option<UnixStream>,
}

impl Client {
    pub(crate) fn new(socket_path: &str, use_rpc: bool) -> Self {
        Self {
            socket_path: socket_path.to_string(),
            use_rpc,
            grammar: Grammar::new(),
            stream: None,
        }
    }

    fn connect(&mut self) -> Result<&mut UnixStream, CliError> {
        if self.stream.is_none() {
            log::debug!("Connecting to {}", self.socket_path);
            let stream = UnixStream::connect(&self.socket_path).map_err(|e| {
                CliError::from(format!(
                    "Failed to connect to netd at {}: {e}",
                    self.socket_path
                ))
            })?;
            self.stream = Some(stream);
        }
        self.stream
            .as_mut()
            .ok_or_else(|| CliError::from("Not connected to netd"))
    }

    /// Send one raw request and wait for the reply.
    pub(crate) fn request(
        &mut self,
        payload: &str,
    ) -> Result<String, CliError> {
        let stream = self.connect()?;
        let result = write_frame(stream, payload)
            .and_then(|_| read_frame(stream, MAX_RESPONSE_SIZE));
        match result {
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => {
                self.stream = None;
                Err(CliError::from("Connection closed by netd"))
            }
            Err(e) => {
                self.stream = None;
                Err(e)
            }
        }
    }

    /// Run one CLI command, as text or translated into an RPC envelope.
    pub(crate) fn execute(&mut self, line: &str) -> Result<String, CliError> {
        if self.use_rpc {
            self.execute_rpc(line)
        } else {
            let reply = self.request(line)?;
            if reply.starts_with(ERROR_PREFIX) {
                Err(CliError::new(DEFAULT_ERROR_CODE, reply))
            } else {
                Ok(reply)
            }
        }
    }

    fn execute_rpc(&mut self, line: &str) -> Result<String, CliError> {
        let cmd = self.grammar.parse(line)?;
        let message_id = uuid::Uuid::new_v4().to_string();
        let xml = cli_to_rpc(&cmd, &message_id)?;
        log::debug!("Sending RPC {xml}");
        let reply = self.request(&xml)?;
        format_rpc_reply(&reply)
    }

    pub(crate) fn complete(&self, partial: &str) -> Vec<String> {
        self.grammar.complete(partial).into_iter().collect()
    }

    pub(crate) fn shell(&mut self) -> Result<String, CliError> {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        loop {
            print!("{PROMPT}");
            std::io::stdout().flush()?;
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                println!();
                break;
            }
            match shell_action(&line) {
                ShellAction::Skip => continue,
                ShellAction::Quit => break,
                ShellAction::Complete(partial) => {
                    let candidates = self.complete(&partial);
                    if candidates.is_empty() {
                        println!("% No completion for {:?}", partial.trim());
                    } else {
                        println!("{}", candidates.join("  "));
                    }
                }
                ShellAction::Send(cmd) => match self.execute(&cmd) {
                    Ok(reply) => println!("{reply}"),
                    Err(e) => eprintln!("{e}"),
                },
            }
        }
        Ok(String::new())
    }
}

fn format_rpc_reply(reply: &str) -> Result<String, CliError> {
    match parse_rpc_reply(reply)? {
        RpcReply::Ok => Ok("OK".to_string()),
        RpcReply::Data(outline) => Ok(outline.trim_end().to_string()),
        RpcReply::Error { tag, message } => Err(CliError::new(
            DEFAULT_ERROR_CODE,
            format!("{ERROR_PREFIX}{message} ({tag})"),
        )),
    }
}
