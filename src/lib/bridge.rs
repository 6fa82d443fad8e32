// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;

use crate::{
    netconf::{
        envelope_message_id, envelope_to_command, is_rpc, parse_xml,
        rpc_error_reply, rpc_reply,
    },
    Command, Dispatcher, Grammar, NetdError, Response,
};

/// Entry point of the daemon for one request: CLI text or an XML RPC
/// envelope goes in, the reply in the same form comes out. Failures are
/// turned into replies, never into panics.
#[derive(Debug)]
pub struct ProtocolBridge {
    grammar: Grammar,
    dispatcher: Dispatcher,
}

impl ProtocolBridge {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            grammar: Grammar::new(),
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn handle(&self, request: &str) -> String {
        if is_rpc(request) {
            self.handle_rpc(request)
        } else {
            self.handle_cli(request)
        }
    }

    pub fn execute_cli(&self, line: &str) -> Result<Response, NetdError> {
        let cmd = self.grammar.parse(line)?;
        self.dispatcher.dispatch(&cmd)
    }

    /// Reply `Error: <message>` on failure.
    pub fn handle_cli(&self, line: &str) -> String {
        match self.execute_cli(line) {
            Ok(response) => response.to_string(),
            Err(e) => {
                log::info!("Request {:?} failed: {}", line.trim(), e.msg());
                format!("Error: {e}")
            }
        }
    }

    pub fn handle_rpc(&self, xml: &str) -> String {
        let envelope = match parse_xml(xml) {
            Ok(e) => e,
            Err(e) => {
                log::info!("Got malformed RPC: {e}");
                return rpc_error_reply(None, &e);
            }
        };
        let message_id = envelope_message_id(&envelope);
        match envelope_to_command(&envelope)
            .and_then(|cmd| self.dispatch_rpc(&cmd))
        {
            Ok(response) => rpc_reply(message_id.as_deref(), &response),
            Err(e) => {
                log::info!("RPC {message_id:?} failed: {e}");
                rpc_error_reply(message_id.as_deref(), &e)
            }
        }
    }

    fn dispatch_rpc(&self, cmd: &Command) -> Result<Response, NetdError> {
        log::debug!("RPC maps to command '{cmd}'");
        self.dispatcher.dispatch(cmd)
    }

    pub fn complete(&self, partial: &str) -> BTreeSet<String> {
        self.grammar.complete(partial)
    }
}
