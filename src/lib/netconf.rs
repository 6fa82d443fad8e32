// SPDX-License-Identifier: Apache-2.0

use std::str::FromStr;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::{
    ip::parse_addr, AddressFamily, Command, ConfigEntry, ErrorKind,
    InterfaceConfig, InterfaceInfo, IpPrefix, NetdError, Response,
    RouteConfig, RouteDeletion, RouteFilter, RouteInfo, RouteProtocol,
    ShowTarget,
};

pub const NETCONF_BASE_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";
pub const NETD_NS: &str = "urn:netd:params:xml:ns:yang:netd-simple";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const OPERATION_DELETE: [&str; 2] = ["delete", "remove"];

/// Whether a request holds XML instead of a CLI line. No CLI token can
/// start with `<`.
pub fn is_rpc(request: &str) -> bool {
    request.trim_start().starts_with('<')
}

// Minimal element tree, namespaces are ignored and only local names kept.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct XmlNode {
    pub(crate) name: String,
    attrs: Vec<(String, String)>,
    text: String,
    pub(crate) children: Vec<XmlNode>,
}

impl XmlNode {
    fn from_start(e: &BytesStart) -> Result<Self, NetdError> {
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            attrs.push((
                String::from_utf8_lossy(attr.key.local_name().as_ref())
                    .to_string(),
                attr.unescape_value()?.to_string(),
            ));
        }
        Ok(Self {
            name: String::from_utf8_lossy(e.local_name().as_ref()).to_string(),
            attrs,
            ..Default::default()
        })
    }

    pub(crate) fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Depth first search for `name`, including `self`.
    pub(crate) fn find(&self, name: &str) -> Option<&XmlNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    pub(crate) fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
    }
}

pub(crate) fn parse_xml(xml: &str) -> Result<XmlNode, NetdError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        let node = match reader.read_event()? {
            Event::Start(e) => {
                stack.push(XmlNode::from_start(&e)?);
                continue;
            }
            Event::Empty(e) => XmlNode::from_start(&e)?,
            Event::End(_) => match stack.pop() {
                Some(n) => n,
                None => return Err(malformed("unbalanced closing tag")),
            },
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape()?);
                }
                continue;
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text
                        .push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => {
                if root.is_some() {
                    return Err(malformed("more than one root element"));
                }
                root = Some(node);
            }
        }
    }
    if !stack.is_empty() {
        return Err(malformed("unclosed element"));
    }
    root.ok_or_else(|| malformed("no root element"))
}

fn malformed(reason: &str) -> NetdError {
    NetdError::new(
        ErrorKind::UnknownOperation,
        format!("Malformed RPC envelope: {reason}"),
    )
}

/// `message-id` of the `<rpc>` envelope, if any.
pub(crate) fn envelope_message_id(envelope: &XmlNode) -> Option<String> {
    envelope.attr("message-id").map(|s| s.to_string())
}

/// `message-id` of an RPC request, `None` when it is malformed or has no
/// id.
pub fn rpc_message_id(xml: &str) -> Option<String> {
    parse_xml(xml)
        .ok()
        .and_then(|envelope| envelope_message_id(&envelope))
}

/// Parse an XML RPC envelope into the command it carries.
pub fn rpc_to_command(xml: &str) -> Result<Command, NetdError> {
    envelope_to_command(&parse_xml(xml)?)
}

pub(crate) fn envelope_to_command(
    envelope: &XmlNode,
) -> Result<Command, NetdError> {
    // A bare operation element is accepted without the <rpc> wrapper
    let op = if envelope.name == "rpc" {
        envelope.children.first().ok_or_else(|| {
            NetdError::new(
                ErrorKind::UnknownOperation,
                "RPC envelope holds no operation".to_string(),
            )
        })?
    } else {
        envelope
    };
    log::debug!("Got RPC operation {}", op.name);
    match op.name.as_str() {
        "get-config" => get_config_to_command(op),
        "edit-config" => edit_config_to_command(op),
        "commit" => Ok(Command::Commit),
        "discard-changes" => Ok(Command::Discard),
        "copy-config" => {
            if op.child("target").and_then(|t| t.find("startup")).is_some() {
                Ok(Command::Save)
            } else {
                Err(NetdError::new(
                    ErrorKind::UnknownTarget,
                    "copy-config is only supported with startup target"
                        .to_string(),
                ))
            }
        }
        name => Err(NetdError::new(
            ErrorKind::UnknownOperation,
            format!("Unsupported RPC operation {name}"),
        )),
    }
}

fn get_config_to_command(op: &XmlNode) -> Result<Command, NetdError> {
    let filter = match op.child("filter") {
        Some(f) if !f.children.is_empty() => f,
        // No filter selects every interface
        _ => return Ok(Command::Show(ShowTarget::Interface(None))),
    };
    match container(filter) {
        Some(iface) if iface.name == "interface" => {
            Ok(Command::Show(ShowTarget::Interface(
                iface.child_text("type").map(|s| s.to_string()),
            )))
        }
        Some(route) if route.name == "route" => {
            Ok(Command::Show(ShowTarget::Route(RouteFilter {
                fib: opt_number(route, "fib")?,
                protocol: opt_parse::<RouteProtocol>(route, "protocol")?,
                family: opt_parse::<AddressFamily>(route, "family")?,
            })))
        }
        Some(node) => Err(unknown_container(node)),
        None => Err(unknown_container(filter)),
    }
}

fn edit_config_to_command(op: &XmlNode) -> Result<Command, NetdError> {
    let config = op.child("config").ok_or_else(|| {
        NetdError::new(
            ErrorKind::UnknownOperation,
            "edit-config holds no <config>".to_string(),
        )
    })?;
    match container(config) {
        Some(iface) if iface.name == "interface" => {
            if is_delete(iface) {
                Err(NetdError::new(
                    ErrorKind::UnknownTarget,
                    "Interface addresses cannot be deleted, only routes"
                        .to_string(),
                ))
            } else {
                Ok(Command::Set(ConfigEntry::Interface(xml_to_iface_conf(
                    iface,
                )?)))
            }
        }
        Some(route) if route.name == "route" => {
            if is_delete(route) {
                Ok(Command::Delete(xml_to_route_del(route)?))
            } else {
                Ok(Command::Set(ConfigEntry::Route(xml_to_route_conf(
                    route,
                )?)))
            }
        }
        Some(node) => Err(unknown_container(node)),
        None => Err(unknown_container(config)),
    }
}

// First element below <filter> or <config>, looking through the
// <netd-config> wrapper.
fn container(node: &XmlNode) -> Option<&XmlNode> {
    let first = node.children.first()?;
    if first.name == "netd-config" {
        first.children.first()
    } else {
        Some(first)
    }
}

fn is_delete(node: &XmlNode) -> bool {
    node.attr("operation")
        .map(|o| OPERATION_DELETE.contains(&o))
        .unwrap_or_default()
}

fn unknown_container(node: &XmlNode) -> NetdError {
    NetdError::new(
        ErrorKind::UnknownTarget,
        format!(
            "<{}> names no interface or route container",
            node.name
        ),
    )
}

fn required<'a>(node: &'a XmlNode, name: &str) -> Result<&'a str, NetdError> {
    node.child_text(name).ok_or_else(|| {
        NetdError::new(
            ErrorKind::SemanticError,
            format!("<{}> is missing <{name}>", node.name),
        )
    })
}

fn opt_number(node: &XmlNode, name: &str) -> Result<Option<u32>, NetdError> {
    node.child_text(name)
        .map(|v| {
            v.parse::<u32>().map_err(|e| {
                NetdError::new(
                    ErrorKind::SemanticError,
                    format!("Invalid <{name}> value {v}: {e}"),
                )
            })
        })
        .transpose()
}

fn opt_parse<T>(node: &XmlNode, name: &str) -> Result<Option<T>, NetdError>
where
    T: FromStr<Err = NetdError>,
{
    node.child_text(name).map(T::from_str).transpose()
}

fn static_protocol(node: &XmlNode) -> Result<RouteProtocol, NetdError> {
    match opt_parse::<RouteProtocol>(node, "protocol")? {
        None | Some(RouteProtocol::Static) => Ok(RouteProtocol::Static),
        Some(p) => Err(NetdError::new(
            ErrorKind::SemanticError,
            format!("Only static routes can be configured, got {p}"),
        )),
    }
}

fn xml_to_iface_conf(node: &XmlNode) -> Result<InterfaceConfig, NetdError> {
    let name = required(node, "name")?;
    let address = node.child("address").ok_or_else(|| {
        NetdError::new(
            ErrorKind::SemanticError,
            format!("<interface> {name} is missing <address>"),
        )
    })?;
    let family = AddressFamily::from_str(required(address, "family")?)?;
    let mut conf = InterfaceConfig::new(
        name,
        IpPrefix::parse(required(address, "ip")?, family)?,
    );
    conf.fib = opt_number(node, "fib")?.unwrap_or_default();
    conf.tunnel_fib = opt_number(node, "tunnel-fib")?;
    Ok(conf)
}

fn xml_to_route_conf(node: &XmlNode) -> Result<RouteConfig, NetdError> {
    let family = AddressFamily::from_str(required(node, "family")?)?;
    let mut conf = RouteConfig::new(
        IpPrefix::parse_network(required(node, "destination")?, family)?,
        parse_addr(required(node, "gateway")?, family)?,
    );
    conf.protocol = static_protocol(node)?;
    conf.fib = opt_number(node, "fib")?;
    Ok(conf)
}

fn xml_to_route_del(node: &XmlNode) -> Result<RouteDeletion, NetdError> {
    let mut del = RouteDeletion {
        protocol: static_protocol(node)?,
        fib: opt_number(node, "fib")?,
        family: opt_parse::<AddressFamily>(node, "family")?,
        ..Default::default()
    };
    if let Some(dst) = node.child_text("destination") {
        let family = del.family.ok_or_else(|| {
            NetdError::new(
                ErrorKind::SemanticError,
                "Route <destination> requires <family>".to_string(),
            )
        })?;
        del.destination = Some(IpPrefix::parse_network(dst, family)?);
        if let Some(gw) = node.child_text("gateway") {
            del.gateway = Some(parse_addr(gw, family)?);
        }
    } else if node.child_text("gateway").is_some() {
        return Err(NetdError::new(
            ErrorKind::SemanticError,
            "Route <gateway> requires <destination>".to_string(),
        ));
    }
    Ok(del)
}

// NETCONF names the address families ipv4/ipv6.
fn yang_family(family: AddressFamily) -> &'static str {
    match family {
        AddressFamily::Inet4 => "ipv4",
        AddressFamily::Inet6 => "ipv6",
    }
}

fn leaf(name: &str, value: impl std::fmt::Display) -> String {
    format!("<{name}>{}</{name}>", escape(value.to_string().as_str()))
}

fn netd_config(body: &str) -> String {
    format!("<netd-config xmlns=\"{NETD_NS}\">{body}</netd-config>")
}

fn envelope(message_id: &str, operation: &str) -> String {
    format!(
        "{XML_DECL}\n<rpc message-id=\"{}\" xmlns=\"{NETCONF_BASE_NS}\">\
        {operation}</rpc>",
        escape(message_id)
    )
}

fn edit_config(body: &str) -> String {
    format!(
        "<edit-config><target><running/></target><config>{}</config>\
        </edit-config>",
        netd_config(body)
    )
}

/// Build the RPC envelope equivalent to a CLI command.
pub fn cli_to_rpc(
    cmd: &Command,
    message_id: &str,
) -> Result<String, NetdError> {
    let operation = match cmd {
        Command::Show(ShowTarget::Help) => {
            return Err(NetdError::new(
                ErrorKind::UnknownTarget,
                "show without target has no RPC equivalent".to_string(),
            ))
        }
        Command::Show(ShowTarget::Interface(filter)) => {
            let mut body = String::new();
            if let Some(f) = filter {
                body.push_str(&leaf("type", f));
            }
            get_config(&format!("<interface>{body}</interface>"))
        }
        Command::Show(ShowTarget::Route(filter)) => {
            let mut body = String::new();
            if let Some(fib) = filter.fib {
                body.push_str(&leaf("fib", fib));
            }
            if let Some(protocol) = filter.protocol {
                body.push_str(&leaf("protocol", protocol));
            }
            if let Some(family) = filter.family {
                body.push_str(&leaf("family", yang_family(family)));
            }
            get_config(&format!("<route>{body}</route>"))
        }
        Command::Set(ConfigEntry::Interface(conf)) => {
            let mut body = leaf("name", &conf.name);
            if conf.fib != 0 {
                body.push_str(&leaf("fib", conf.fib));
            }
            if let Some(tunnel_fib) = conf.tunnel_fib {
                body.push_str(&leaf("tunnel-fib", tunnel_fib));
            }
            body.push_str(&format!(
                "<address>{}{}</address>",
                leaf("ip", conf.address),
                leaf("family", yang_family(conf.family))
            ));
            edit_config(&format!("<interface>{body}</interface>"))
        }
        Command::Set(ConfigEntry::Route(conf)) => {
            let mut body = leaf("protocol", conf.protocol);
            if let Some(fib) = conf.fib {
                body.push_str(&leaf("fib", fib));
            }
            body.push_str(&leaf("family", yang_family(conf.family)));
            body.push_str(&leaf("destination", conf.destination));
            body.push_str(&leaf("gateway", conf.gateway));
            edit_config(&format!("<route>{body}</route>"))
        }
        Command::Delete(del) => {
            let mut body = leaf("protocol", del.protocol);
            if let Some(fib) = del.fib {
                body.push_str(&leaf("fib", fib));
            }
            if let Some(family) = del.family {
                body.push_str(&leaf("family", yang_family(family)));
            }
            if let Some(dst) = del.destination {
                body.push_str(&leaf("destination", dst));
            }
            if let Some(gw) = del.gateway {
                body.push_str(&leaf("gateway", gw));
            }
            edit_config(&format!(
                "<route operation=\"delete\">{body}</route>"
            ))
        }
        Command::Commit => "<commit/>".to_string(),
        Command::Discard => "<discard-changes/>".to_string(),
        Command::Save => "<copy-config><target><startup/></target>\
            <source><running/></source></copy-config>"
            .to_string(),
    };
    Ok(envelope(message_id, &operation))
}

fn get_config(filter_body: &str) -> String {
    format!(
        "<get-config><source><running/></source>\
        <filter type=\"subtree\">{}</filter></get-config>",
        netd_config(filter_body)
    )
}

fn reply(message_id: Option<&str>, body: &str) -> String {
    let id_attr = message_id
        .map(|id| format!(" message-id=\"{}\"", escape(id)))
        .unwrap_or_default();
    format!(
        "{XML_DECL}\n<rpc-reply xmlns=\"{NETCONF_BASE_NS}\"{id_attr}>\
        {body}</rpc-reply>"
    )
}

fn iface_to_xml(iface: &InterfaceInfo) -> String {
    let mut body = leaf("name", &iface.name);
    body.push_str(&leaf("type", &iface.iface_type));
    body.push_str(&leaf("fib", iface.fib));
    if let Some(tunnel_fib) = iface.tunnel_fib {
        body.push_str(&leaf("tunnel-fib", tunnel_fib));
    }
    if let Some(mtu) = iface.mtu {
        body.push_str(&leaf("mtu", mtu));
    }
    for addr in iface.ipv4.iter().chain(iface.ipv6.iter()) {
        body.push_str(&format!(
            "<address>{}{}</address>",
            leaf("ip", addr),
            leaf("family", yang_family(addr.family()))
        ));
    }
    format!("<interface>{body}</interface>")
}

fn route_to_xml(route: &RouteInfo) -> String {
    let mut body = leaf("destination", route.destination);
    if let Some(gw) = route.gateway {
        body.push_str(&leaf("gateway", gw));
    }
    if let Some(iface) = route.interface.as_ref() {
        body.push_str(&leaf("interface", iface));
    }
    body.push_str(&leaf("fib", route.fib));
    body.push_str(&leaf("protocol", route.protocol));
    body.push_str(&leaf("flags", route.flags()));
    format!("<route>{body}</route>")
}

/// `<rpc-reply>` carrying `<data>` for queries and `<ok/>` otherwise.
pub fn rpc_reply(message_id: Option<&str>, response: &Response) -> String {
    let body = match response {
        Response::Interfaces(ifaces) => format!(
            "<data>{}</data>",
            netd_config(
                &ifaces.iter().map(iface_to_xml).collect::<String>()
            )
        ),
        Response::Routes { routes, .. } => format!(
            "<data>{}</data>",
            netd_config(
                &routes.iter().map(route_to_xml).collect::<String>()
            )
        ),
        Response::Help => {
            format!("<data>{}</data>", leaf("help", response))
        }
        _ => "<ok/>".to_string(),
    };
    reply(message_id, &body)
}

fn error_type_and_tag(kind: ErrorKind) -> (&'static str, &'static str) {
    match kind {
        ErrorKind::LexError
        | ErrorKind::SyntaxError
        | ErrorKind::SemanticError => ("application", "invalid-value"),
        ErrorKind::UnknownTarget => ("application", "unknown-element"),
        ErrorKind::UnknownOperation => ("rpc", "operation-not-supported"),
        ErrorKind::NotSupportedError => {
            ("application", "operation-not-supported")
        }
        ErrorKind::StagingFull => ("application", "resource-denied"),
        ErrorKind::ApplyError | ErrorKind::PluginFailure | ErrorKind::Bug => {
            ("application", "operation-failed")
        }
    }
}

/// `<rpc-reply>` carrying one `<rpc-error>`.
pub fn rpc_error_reply(message_id: Option<&str>, error: &NetdError) -> String {
    let (error_type, error_tag) = error_type_and_tag(error.kind());
    reply(
        message_id,
        &format!(
            "<rpc-error>{}{}{}{}</rpc-error>",
            leaf("error-type", error_type),
            leaf("error-tag", error_tag),
            leaf("error-severity", "error"),
            leaf("error-message", format!("{}: {}", error.kind(), error.msg()))
        ),
    )
}

/// Outcome of an RPC reply as seen by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcReply {
    Ok,
    /// Serialized content of `<data>`.
    Data(String),
    Error { tag: String, message: String },
}

/// Parse an `<rpc-reply>` for display on the client side.
pub fn parse_rpc_reply(xml: &str) -> Result<RpcReply, NetdError> {
    let root = parse_xml(xml)?;
    if root.name != "rpc-reply" {
        return Err(malformed("expecting <rpc-reply>"));
    }
    if let Some(err) = root.child("rpc-error") {
        return Ok(RpcReply::Error {
            tag: err.child_text("error-tag").unwrap_or_default().to_string(),
            message: err
                .child_text("error-message")
                .unwrap_or_default()
                .to_string(),
        });
    }
    if root.child("ok").is_some() {
        return Ok(RpcReply::Ok);
    }
    match root.child("data") {
        Some(data) => Ok(RpcReply::Data(render_node(data, 0))),
        None => Err(malformed("reply holds neither <ok/>, <data> nor error")),
    }
}

// Indented `name: value` outline of the element tree.
fn render_node(node: &XmlNode, depth: usize) -> String {
    let mut ret = String::new();
    for child in &node.children {
        let indent = "  ".repeat(depth);
        if child.children.is_empty() {
            ret.push_str(&format!("{indent}{}: {}\n", child.name, child.text));
        } else {
            ret.push_str(&format!("{indent}{}:\n", child.name));
            ret.push_str(&render_node(child, depth + 1));
        }
    }
    ret
}
