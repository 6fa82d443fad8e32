// SPDX-License-Identifier: Apache-2.0

mod bridge;
mod command;
mod dispatch;
mod error;
mod grammar;
mod iface;
mod ip;
mod memory;
mod netconf;
#[cfg(feature = "query_apply")]
mod nispor;
mod plugin;
mod response;
mod route;
mod staging;
mod token;


pub use crate::bridge::ProtocolBridge;
pub use crate::command::{
    Command, ConfigEntry, InterfaceConfig, RouteConfig, RouteDeletion,
    RouteFilter, RouteProtocol, ShowTarget,
};
pub use crate::dispatch::Dispatcher;
pub use crate::error::{ErrorKind, NetdError};
pub use crate::grammar::Grammar;
pub use crate::iface::{InterfaceFilter, InterfaceInfo, InterfaceType};
pub use crate::ip::{AddressFamily, IpPrefix};
pub use crate::memory::MemoryBackend;
pub use crate::netconf::{
    cli_to_rpc, is_rpc, parse_rpc_reply, rpc_error_reply, rpc_message_id,
    rpc_reply, rpc_to_command, RpcReply, NETCONF_BASE_NS, NETD_NS,
};
#[cfg(feature = "query_apply")]
pub use crate::nispor::KernelBackend;
pub use crate::plugin::{
    ConfigPersistence, ConfigSnapshot, InterfaceConfigurator,
    RouteConfigurator,
};
pub use crate::response::Response;
pub use crate::route::{RouteInfo, RouteQuery};
pub use crate::staging::{
    ApplyFailure, CommitPolicy, StagingBuffer, DEFAULT_STAGING_CAPACITY,
};
pub use crate::token::{tokenize, Lexeme, TokenKind};
