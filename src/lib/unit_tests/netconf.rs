use crate::{
    cli_to_rpc, is_rpc, parse_rpc_reply, rpc_message_id, rpc_to_command,
    unit_tests::testlib::{find_iface, new_bridge, prefix, show_routes},
    AddressFamily, Command, ConfigEntry, ErrorKind, Grammar, RouteDeletion,
    RouteFilter, RouteProtocol, RpcReply, ShowTarget,
};

#[test]
fn test_is_rpc() {
    assert!(is_rpc("<rpc message-id=\"1\"><commit/></rpc>"));
    assert!(is_rpc("  \n<?xml version=\"1.0\"?><rpc/>"));
    assert!(!is_rpc("show route"));
    assert!(!is_rpc(""));
}

#[test]
fn test_rpc_message_id() {
    assert_eq!(
        rpc_message_id("<rpc message-id=\"17\"><commit/></rpc>"),
        Some("17".to_string())
    );
    assert_eq!(rpc_message_id("<rpc><commit/></rpc>"), None);
    assert_eq!(rpc_message_id("<rpc message-id=\"17\"><commit>"), None);
}

#[test]
fn test_get_config_route_is_show_route() {
    let cmd =
        rpc_to_command("<get-config><filter><route/></filter></get-config>")
            .unwrap();
    assert_eq!(cmd, Grammar::new().parse("show route").unwrap());
}

#[test]
fn test_get_config_with_filter_leaves() {
    let cmd = rpc_to_command(
        r#"<rpc message-id="7" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
          <get-config>
            <source><running/></source>
            <filter type="subtree">
              <netd-config xmlns="urn:netd:params:xml:ns:yang:netd-simple">
                <route>
                  <fib>2</fib>
                  <protocol>dynamic</protocol>
                  <family>ipv6</family>
                </route>
              </netd-config>
            </filter>
          </get-config>
        </rpc>"#,
    )
    .unwrap();
    assert_eq!(
        cmd,
        Command::Show(ShowTarget::Route(RouteFilter {
            fib: Some(2),
            protocol: Some(RouteProtocol::Dynamic),
            family: Some(AddressFamily::Inet6),
        }))
    );
}

#[test]
fn test_get_config_without_filter_shows_interfaces() {
    let expected = Command::Show(ShowTarget::Interface(None));
    assert_eq!(rpc_to_command("<get-config/>").unwrap(), expected);
    assert_eq!(
        rpc_to_command("<get-config><filter/></get-config>").unwrap(),
        expected
    );
}

#[test]
fn test_get_config_unknown_container() {
    let e = rpc_to_command(
        "<get-config><filter><firewall/></filter></get-config>",
    )
    .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::UnknownTarget);
}

#[test]
fn test_edit_config_route_delete() {
    let cmd = rpc_to_command(
        "<edit-config><config><route operation=\"delete\">\
        <protocol>static</protocol><fib>1</fib></route></config>\
        </edit-config>",
    )
    .unwrap();
    assert_eq!(
        cmd,
        Command::Delete(RouteDeletion {
            fib: Some(1),
            ..Default::default()
        })
    );
}

#[test]
fn test_get_config_route_filter_with_interface_leaf() {
    let cmd = rpc_to_command(
        "<get-config><filter><route><interface>em0</interface>\
        <fib>1</fib></route></filter></get-config>",
    )
    .unwrap();
    assert_eq!(
        cmd,
        Command::Show(ShowTarget::Route(RouteFilter {
            fib: Some(1),
            ..Default::default()
        }))
    );
}

#[test]
fn test_edit_config_interface_delete_rejected() {
    for operation in ["delete", "remove"] {
        let e = rpc_to_command(&format!(
            "<edit-config><config><netd-config>\
            <interface operation=\"{operation}\"><name>em0</name>\
            <address><ip>192.168.1.1/24</ip><family>ipv4</family>\
            </address></interface></netd-config></config></edit-config>"
        ))
        .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::UnknownTarget);
    }
}

#[test]
fn test_edit_config_unknown_container() {
    let e = rpc_to_command(
        "<edit-config><config><netd-config><vlan><route/></vlan>\
        </netd-config></config></edit-config>",
    )
    .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::UnknownTarget);
}

#[test]
fn test_edit_config_missing_leaf() {
    let e = rpc_to_command(
        "<edit-config><config><interface><name>em0</name></interface>\
        </config></edit-config>",
    )
    .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::SemanticError);
}

#[test]
fn test_copy_config_needs_startup_target() {
    assert_eq!(
        rpc_to_command(
            "<copy-config><target><startup/></target></copy-config>"
        )
        .unwrap(),
        Command::Save
    );
    assert_eq!(
        rpc_to_command(
            "<copy-config><target><candidate/></target></copy-config>"
        )
        .unwrap_err()
        .kind(),
        ErrorKind::UnknownTarget
    );
}

#[test]
fn test_unknown_operation_and_malformed_xml() {
    assert_eq!(
        rpc_to_command("<rpc><kill-session/></rpc>")
            .unwrap_err()
            .kind(),
        ErrorKind::UnknownOperation
    );
    assert_eq!(
        rpc_to_command("<rpc><commit></rpc>").unwrap_err().kind(),
        ErrorKind::UnknownOperation
    );
    assert_eq!(
        rpc_to_command("<rpc/>").unwrap_err().kind(),
        ErrorKind::UnknownOperation
    );
}

#[test]
fn test_cli_to_rpc_round_trip() {
    let grammar = Grammar::new();
    for line in [
        "show interface",
        "show interface bridge",
        "show route fib 1 protocol static inet6",
        "set interface em0 inet addr 192.168.1.1/24 fib 1 tunnelfib 2",
        "set interface em0 inet6 addr 2001:db8::1/64",
        "set route protocol static fib 2 inet 10.0.0.0/8 192.168.1.254",
        "delete route protocol static fib 1",
        "delete route protocol static inet6 2001:db8::/32 fe80::1",
        "commit",
        "discard",
        "save",
    ] {
        let cmd = grammar.parse(line).unwrap();
        let xml = cli_to_rpc(&cmd, "42").unwrap();
        assert!(is_rpc(&xml));
        assert_eq!(rpc_to_command(&xml).unwrap(), cmd, "{line}");
    }
}

#[test]
fn test_cli_to_rpc_help_has_no_equivalent() {
    let e = cli_to_rpc(&Command::Show(ShowTarget::Help), "1").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::UnknownTarget);
}

#[test]
fn test_handle_rpc_data_reply() {
    let (_, bridge) = new_bridge();
    let reply = bridge.handle(
        "<rpc message-id=\"101\"><get-config><filter><interface>\
        <type>lo</type></interface></filter></get-config></rpc>",
    );
    assert!(reply.contains("message-id=\"101\""));
    match parse_rpc_reply(&reply).unwrap() {
        RpcReply::Data(outline) => {
            assert!(outline.contains("name: lo0"));
            assert!(outline.contains("ip: 127.0.0.1/8"));
            assert!(!outline.contains("em0"));
        }
        r => panic!("Unexpected reply {r:?}"),
    }
}

#[test]
fn test_handle_rpc_edit_then_commit() {
    let (backend, bridge) = new_bridge();
    let reply = bridge.handle(
        "<rpc message-id=\"a\"><edit-config><config><interface>\
        <name>em1</name><fib>3</fib><address><ip>10.7.0.1/16</ip>\
        <family>ipv4</family></address></interface></config>\
        </edit-config></rpc>",
    );
    assert_eq!(parse_rpc_reply(&reply).unwrap(), RpcReply::Ok);
    assert!(find_iface(&backend, "em1").ipv4.is_empty());

    let reply = bridge.handle("<rpc message-id=\"b\"><commit/></rpc>");
    assert!(reply.contains("message-id=\"b\""));
    assert_eq!(parse_rpc_reply(&reply).unwrap(), RpcReply::Ok);
    let em1 = find_iface(&backend, "em1");
    assert_eq!(em1.ipv4, vec![prefix("10.7.0.1/16")]);
    assert_eq!(em1.fib, 3);
}

#[test]
fn test_handle_rpc_delete_runs_immediately() {
    let (backend, bridge) = new_bridge();
    let reply = bridge.handle(
        "<rpc message-id=\"9\"><edit-config><config>\
        <route operation=\"delete\"><fib>1</fib></route>\
        </config></edit-config></rpc>",
    );
    assert_eq!(parse_rpc_reply(&reply).unwrap(), RpcReply::Ok);
    assert_eq!(show_routes(&backend, 1).len(), 1);
}

#[test]
fn test_handle_rpc_error_reply() {
    let (_, bridge) = new_bridge();
    let reply = bridge.handle(
        "<rpc message-id=\"5\"><get-config><filter><route><fib>12</fib>\
        </route></filter></get-config></rpc>",
    );
    assert!(reply.contains("message-id=\"5\""));
    match parse_rpc_reply(&reply).unwrap() {
        RpcReply::Error { tag, message } => {
            assert_eq!(tag, "invalid-value");
            assert!(message.contains("FIB 12 does not exist"));
        }
        r => panic!("Unexpected reply {r:?}"),
    }

    let reply = bridge.handle("<rpc message-id=\"6\"><lock/></rpc>");
    match parse_rpc_reply(&reply).unwrap() {
        RpcReply::Error { tag, .. } => {
            assert_eq!(tag, "operation-not-supported")
        }
        r => panic!("Unexpected reply {r:?}"),
    }
}

#[test]
fn test_handle_malformed_rpc() {
    let (_, bridge) = new_bridge();
    let reply = bridge.handle("<rpc message-id=\"3\"><commit>");
    assert!(!reply.contains("message-id"));
    assert!(matches!(
        parse_rpc_reply(&reply).unwrap(),
        RpcReply::Error { .. }
    ));
}

#[test]
fn test_handle_cli() {
    let (_, bridge) = new_bridge();
    assert!(bridge
        .handle("show route fib 1")
        .starts_with("FIB 1:\nDestination"));
    let reply = bridge.handle("show route fib 8");
    assert!(reply.starts_with("Error: SemanticError"));
    let reply = bridge.handle("set interface");
    assert!(reply.starts_with("Error: SyntaxError"));
    assert!(reply.contains("| set interface\n"));

    let reply =
        bridge.handle("set route protocol static inet 10.4.0.0/16 10.0.0.1");
    assert!(reply.starts_with("Staged"));
    assert_eq!(bridge.dispatcher().pending().unwrap().len(), 1);
    assert!(matches!(
        bridge.dispatcher().pending().unwrap()[0],
        ConfigEntry::Route(_)
    ));
}

#[test]
fn test_bridge_complete() {
    let (_, bridge) = new_bridge();
    assert!(bridge.complete("show in").contains("interface"));
}
