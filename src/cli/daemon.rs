// SPDX-License-Identifier: Apache-2.0

use std::io::{Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::UnixListener;
use std::path::Path;
use std::sync::Arc;

use netd::{
    is_rpc, rpc_error_reply, rpc_message_id, Dispatcher, ErrorKind,
    InterfaceConfigurator, MemoryBackend, NetdError, ProtocolBridge,
    RouteConfigurator,
};

use crate::{
    config::{BackendKind, DaemonConfig},
    error::{CliError, EX_DATAERR},
    persist::FileStore,
    transport::{read_frame, write_frame, MAX_REQUEST_SIZE, MAX_RESPONSE_SIZE},
};

const SOCKET_MODE: u32 = 0o666;

type Backend = (Arc<dyn InterfaceConfigurator>, Arc<dyn RouteConfigurator>);

fn new_backend(conf: &DaemonConfig) -> Result<Backend, CliError> {
    match conf.backend {
        BackendKind::Memory => {
            log::info!(
                "Using in-memory backend with {} FIB(s)",
                conf.memory_fibs
            );
            let backend = Arc::new(MemoryBackend::new(conf.memory_fibs));
            Ok((backend.clone(), backend))
        }
        #[cfg(feature = "query_apply")]
        BackendKind::Kernel => {
            log::info!("Using kernel backend");
            let backend = Arc::new(netd::KernelBackend::new());
            Ok((backend.clone(), backend))
        }
        #[cfg(not(feature = "query_apply"))]
        BackendKind::Kernel => Err(CliError::from(
            "netdctl is built without kernel backend support, use \
            backend = \"memory\"",
        )),
    }
}

pub(crate) fn new_bridge(
    conf: &DaemonConfig,
) -> Result<ProtocolBridge, CliError> {
    let (interfaces, routes) = new_backend(conf)?;
    let dispatcher = Dispatcher::new(interfaces, routes)
        .with_staging_capacity(conf.staging_capacity)
        .with_commit_policy(conf.commit_policy)
        .with_persistence(Arc::new(FileStore::new(&conf.save_path)));
    Ok(ProtocolBridge::new(dispatcher))
}

fn bind(socket_path: &str) -> Result<UnixListener, CliError> {
    let path = Path::new(socket_path);
    if path.exists() {
        log::info!("Removing stale socket {socket_path}");
        std::fs::remove_file(path)?;
    }
    let listener = UnixListener::bind(path).map_err(|e| {
        CliError::from(format!("Failed to listen on {socket_path}: {e}"))
    })?;
    std::fs::set_permissions(
        path,
        std::fs::Permissions::from_mode(SOCKET_MODE),
    )?;
    Ok(listener)
}

fn set_ctrl_c_action(socket_path: &str) -> Result<(), CliError> {
    let socket_path = socket_path.to_string();
    ctrlc::set_handler(move || {
        log::info!("Shutting down");
        if let Err(e) = std::fs::remove_file(&socket_path) {
            log::error!("Failed to remove socket {socket_path}: {e}");
        }
        std::process::exit(0);
    })?;
    Ok(())
}

pub(crate) fn run_daemon(conf: &DaemonConfig) -> Result<String, CliError> {
    let bridge = Arc::new(new_bridge(conf)?);
    let listener = bind(&conf.socket_path)?;
    set_ctrl_c_action(&conf.socket_path)?;
    log::info!("Listening on {}", conf.socket_path);

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let bridge = bridge.clone();
                std::thread::spawn(move || {
                    serve_connection(bridge.as_ref(), stream);
                });
            }
            Err(e) => log::error!("Failed to accept connection: {e}"),
        }
    }
    Ok(String::new())
}

// Answer requests until the peer hangs up.
pub(crate) fn serve_connection<S>(bridge: &ProtocolBridge, mut stream: S)
where
    S: Read + Write,
{
    loop {
        let reply = match read_frame(&mut stream, MAX_REQUEST_SIZE) {
            Ok(Some(request)) => handle_request(bridge, &request),
            Ok(None) => {
                log::debug!("Client disconnected");
                return;
            }
            Err(e) if e.code == EX_DATAERR => {
                log::warn!("Rejected request: {e}");
                format!("Error: {e}")
            }
            Err(e) => {
                log::error!("Failed to read request: {e}");
                return;
            }
        };
        if let Err(e) = write_frame(&mut stream, &reply) {
            log::error!("Failed to send reply: {e}");
            return;
        }
    }
}

fn handle_request(bridge: &ProtocolBridge, request: &str) -> String {
    log::debug!("Got request {request:?}");
    let reply = bridge.handle(request);
    if reply.len() <= MAX_RESPONSE_SIZE {
        return reply;
    }
    let e = NetdError::new(
        ErrorKind::NotSupportedError,
        format!(
            "Reply of {} bytes exceeds the limit of {MAX_RESPONSE_SIZE} \
            bytes, narrow the query with a filter",
            reply.len()
        ),
    );
    log::warn!("{e}");
    if is_rpc(request) {
        rpc_error_reply(rpc_message_id(request).as_deref(), &e)
    } else {
        format!("Error: {e}")
    }
}
