use crate::{
    unit_tests::testlib::prefix, AddressFamily, Command, ConfigEntry,
    ErrorKind, Grammar, InterfaceConfig, RouteConfig, RouteDeletion,
    RouteFilter, RouteProtocol, ShowTarget,
};

fn parse(line: &str) -> Command {
    Grammar::new().parse(line).unwrap()
}

fn parse_err(line: &str) -> (ErrorKind, String, usize) {
    let e = Grammar::new().parse(line).unwrap_err();
    (e.kind(), e.msg().to_string(), e.position())
}

#[test]
fn test_parse_show_interface() {
    assert_eq!(
        parse("show interface"),
        Command::Show(ShowTarget::Interface(None))
    );
    assert_eq!(
        parse("show interface ethernet"),
        Command::Show(ShowTarget::Interface(Some("ethernet".to_string())))
    );
}

#[test]
fn test_parse_show_without_target_is_help() {
    assert_eq!(parse("show"), Command::Show(ShowTarget::Help));
}

#[test]
fn test_parse_set_interface_with_fib() {
    let mut expected = InterfaceConfig::new("em0", prefix("192.168.1.1/24"));
    expected.fib = 1;
    let cmd = parse("set interface em0 inet addr 192.168.1.1/24 fib 1");
    assert_eq!(cmd, Command::Set(ConfigEntry::Interface(expected.clone())));

    // fib clause before addr and the address synonym
    assert_eq!(
        parse("set interface em0 inet fib 1 address 192.168.1.1/24"),
        Command::Set(ConfigEntry::Interface(expected))
    );
}

#[test]
fn test_parse_set_interface_default_prefix_from_family() {
    let cmd = parse("set interface em0 inet addr 192.168.1.1");
    if let Command::Set(ConfigEntry::Interface(conf)) = cmd {
        assert_eq!(conf.address.prefix_len, 32);
        assert_eq!(conf.fib, 0);
        assert_eq!(conf.tunnel_fib, None);
    } else {
        panic!("Unexpected command {cmd:?}");
    }
    let cmd = parse("set interface em0 inet6 addr 2001:db8::1 tunnelfib 2");
    if let Command::Set(ConfigEntry::Interface(conf)) = cmd {
        assert_eq!(conf.family, AddressFamily::Inet6);
        assert_eq!(conf.address.prefix_len, 128);
        assert_eq!(conf.tunnel_fib, Some(2));
    } else {
        panic!("Unexpected command {cmd:?}");
    }
}

#[test]
fn test_parse_set_route_fib_positions() {
    let mut expected = RouteConfig::new(
        prefix("10.0.0.0/8"),
        "192.168.1.254".parse().unwrap(),
    );
    expected.fib = Some(2);
    let expected = Command::Set(ConfigEntry::Route(expected));
    assert_eq!(
        parse("set route protocol static fib 2 inet 10.0.0.0/8 192.168.1.254"),
        expected
    );
    assert_eq!(
        parse("set route protocol static inet 10.0.0.0/8 192.168.1.254 fib 2"),
        expected
    );
}

#[test]
fn test_parse_set_route_without_fib() {
    let cmd = parse("set route protocol static inet6 2001:db8::/32 fe80::1");
    if let Command::Set(ConfigEntry::Route(conf)) = cmd {
        assert_eq!(conf.fib, None);
        assert_eq!(conf.family, AddressFamily::Inet6);
        assert_eq!(conf.destination.prefix_len, 32);
        assert_eq!(conf.protocol, RouteProtocol::Static);
    } else {
        panic!("Unexpected command {cmd:?}");
    }
}

#[test]
fn test_parse_delete_route_bulk() {
    assert_eq!(
        parse("delete route protocol static fib 1"),
        Command::Delete(RouteDeletion {
            fib: Some(1),
            ..Default::default()
        })
    );
    let cmd = parse("delete route protocol static inet");
    if let Command::Delete(del) = cmd {
        assert!(del.is_bulk());
        assert_eq!(del.family, Some(AddressFamily::Inet4));
    } else {
        panic!("Unexpected command {cmd:?}");
    }
}

#[test]
fn test_parse_delete_route_specific() {
    let cmd = parse(
        "delete route protocol static inet 0.0.0.0/0 192.168.1.254 fib 3",
    );
    assert_eq!(
        cmd,
        Command::Delete(RouteDeletion {
            protocol: RouteProtocol::Static,
            fib: Some(3),
            family: Some(AddressFamily::Inet4),
            destination: Some(prefix("0.0.0.0/0")),
            gateway: Some("192.168.1.254".parse().unwrap()),
        })
    );
    // The zero network is a real destination, not a bulk delete
    if let Command::Delete(del) = cmd {
        assert!(!del.is_bulk());
    }
}

#[test]
fn test_parse_show_route_filters() {
    assert_eq!(
        parse("show route"),
        Command::Show(ShowTarget::Route(RouteFilter::default()))
    );
    let a = parse("show route fib 2 protocol static inet");
    let b = parse("show route inet protocol static fib 2");
    assert_eq!(a, b);
    assert_eq!(
        a,
        Command::Show(ShowTarget::Route(RouteFilter {
            fib: Some(2),
            protocol: Some(RouteProtocol::Static),
            family: Some(AddressFamily::Inet4),
        }))
    );
}

#[test]
fn test_parse_verbs_without_target() {
    assert_eq!(parse("commit"), Command::Commit);
    assert_eq!(parse("  save "), Command::Save);
    assert_eq!(parse("discard"), Command::Discard);
}

#[test]
fn test_parse_set_interface_incomplete() {
    let (kind, msg, pos) = parse_err("set interface");
    assert_eq!(kind, ErrorKind::SyntaxError);
    assert!(msg.starts_with("Incomplete command"));
    assert_eq!(pos, "set interface".len());
}

#[test]
fn test_parse_set_and_delete_require_target() {
    assert_eq!(parse_err("set").0, ErrorKind::SyntaxError);
    assert_eq!(parse_err("delete").0, ErrorKind::SyntaxError);
    assert_eq!(parse_err("").0, ErrorKind::SyntaxError);
}

#[test]
fn test_parse_unexpected_token() {
    let (kind, msg, pos) = parse_err("show route protocol bogus");
    assert_eq!(kind, ErrorKind::SyntaxError);
    assert!(msg.contains("'static'"));
    assert!(msg.contains("'dynamic'"));
    assert_eq!(pos, "show route protocol ".len());

    // Only static routes can be set or deleted
    assert_eq!(
        parse_err("delete route protocol dynamic").0,
        ErrorKind::SyntaxError
    );
}

#[test]
fn test_parse_split_cidr_is_syntax_error() {
    let (kind, _, pos) =
        parse_err("set interface em0 inet addr 192.168.1.1 / 24");
    assert_eq!(kind, ErrorKind::SyntaxError);
    assert_eq!(pos, "set interface em0 inet addr 192.168.1.1 ".len());
}

#[test]
fn test_parse_invalid_char() {
    let e = Grammar::new().parse("show interface em0;").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::LexError);
    assert_eq!(e.position(), 18);
    assert_eq!(
        e.to_string(),
        "LexError: Invalid character ';'\n\
        | show interface em0;\n\
        | ..................^"
    );
}

#[test]
fn test_parse_address_family_mismatch() {
    let (kind, _, pos) =
        parse_err("set interface em0 inet addr 2001:db8::1/64");
    assert_eq!(kind, ErrorKind::SemanticError);
    assert_eq!(pos, "set interface em0 inet addr ".len());

    assert_eq!(
        parse_err("set interface em0 inet addr 192.168.1.1/33").0,
        ErrorKind::SemanticError
    );
    assert_eq!(
        parse_err("set route protocol static inet 10.0.0.0/8 fe80::1").0,
        ErrorKind::SemanticError
    );
    assert_eq!(
        parse_err("set interface em0 inet addr em1").0,
        ErrorKind::SemanticError
    );
}

#[test]
fn test_parse_duplicate_clause() {
    assert_eq!(
        parse_err("set interface em0 inet fib 1 addr 10.0.0.1/8 fib 2").0,
        ErrorKind::SemanticError
    );
    assert_eq!(
        parse_err("show route inet inet6").0,
        ErrorKind::SemanticError
    );
    assert_eq!(
        parse_err("show route protocol static protocol dynamic").0,
        ErrorKind::SemanticError
    );
}

#[test]
fn test_parse_fib_overflow() {
    assert_eq!(
        parse_err("show route fib 99999999999").0,
        ErrorKind::SemanticError
    );
}

#[test]
fn test_render_then_parse_gives_same_command() {
    let grammar = Grammar::new();
    for line in [
        "show",
        "show interface",
        "show interface lo",
        "show route fib 3 protocol dynamic inet6",
        "set interface em0 inet6 fib 2 addr 2001:db8::1 tunnelfib 1",
        "set interface em0 inet address 10.0.0.1/8 fib 0",
        "set route protocol static inet 10.0.0.0/8 192.168.1.254 fib 2",
        "delete route protocol static",
        "delete route protocol static inet fib 1 10.0.0.0/8",
        "delete route protocol static inet6 ::/0 fe80::1 fib 1",
        "commit",
        "save",
        "discard",
    ] {
        let cmd = grammar.parse(line).unwrap();
        let rendered = cmd.to_string();
        assert_eq!(grammar.parse(&rendered).unwrap(), cmd, "{line}");
    }
}
