use std::sync::Arc;

use crate::{
    unit_tests::testlib::{
        find_iface, new_bridge, new_dispatcher, new_memory_backend, prefix,
        show_routes, MemoryStore, RecordingBackend,
    },
    AddressFamily, Command, CommitPolicy, ConfigEntry, Dispatcher, ErrorKind,
    Grammar, InterfaceType, MemoryBackend, Response, RouteInfo,
    RouteProtocol,
};

fn run(dispatcher: &Dispatcher, line: &str) -> Response {
    dispatcher
        .dispatch(&Grammar::new().parse(line).unwrap())
        .unwrap()
}

fn run_err(dispatcher: &Dispatcher, line: &str) -> ErrorKind {
    dispatcher
        .dispatch(&Grammar::new().parse(line).unwrap())
        .unwrap_err()
        .kind()
}

fn routes_of(response: Response) -> Vec<RouteInfo> {
    match response {
        Response::Routes { routes, .. } => routes,
        r => panic!("Unexpected response {r:?}"),
    }
}

#[test]
fn test_show_all_interfaces() {
    let dispatcher = new_dispatcher(new_memory_backend());
    match run(&dispatcher, "show interface") {
        Response::Interfaces(ifaces) => {
            let names: Vec<&str> =
                ifaces.iter().map(|i| i.name.as_str()).collect();
            assert_eq!(names, vec!["em0", "em1", "lo0", "bridge0"]);
        }
        r => panic!("Unexpected response {r:?}"),
    }
}

#[test]
fn test_show_interface_by_type_or_name() {
    let dispatcher = new_dispatcher(new_memory_backend());
    match run(&dispatcher, "show interface ethernet") {
        Response::Interfaces(ifaces) => {
            assert_eq!(ifaces.len(), 2);
            assert!(ifaces
                .iter()
                .all(|i| i.iface_type == InterfaceType::Ethernet));
        }
        r => panic!("Unexpected response {r:?}"),
    }
    match run(&dispatcher, "show interface lo") {
        Response::Interfaces(ifaces) => {
            assert_eq!(ifaces.len(), 1);
            assert_eq!(ifaces[0].name, "lo0");
        }
        r => panic!("Unexpected response {r:?}"),
    }
    match run(&dispatcher, "show interface em1") {
        Response::Interfaces(ifaces) => {
            assert_eq!(ifaces.len(), 1);
            assert_eq!(ifaces[0].name, "em1");
        }
        r => panic!("Unexpected response {r:?}"),
    }
}

#[test]
fn test_set_interface_is_staged_then_committed_once() {
    let backend = Arc::new(RecordingBackend::new(&[]));
    let dispatcher = Dispatcher::new(backend.clone(), backend.clone());

    let response =
        run(&dispatcher, "set interface em0 inet addr 192.168.1.1/24 fib 1");
    assert!(matches!(response, Response::Staged { pending: 1, .. }));
    assert!(backend.applied().is_empty());
    assert_eq!(dispatcher.pending().unwrap().len(), 1);

    assert_eq!(run(&dispatcher, "commit"), Response::Committed(1));
    let applied = backend.applied();
    assert_eq!(applied.len(), 1);
    if let ConfigEntry::Interface(conf) = &applied[0] {
        assert_eq!(conf.name, "em0");
        assert_eq!(conf.address, prefix("192.168.1.1/24"));
        assert_eq!(conf.fib, 1);
    } else {
        panic!("Unexpected entry {:?}", applied[0]);
    }
    assert!(dispatcher.pending().unwrap().is_empty());

    // Nothing left to apply
    assert_eq!(run(&dispatcher, "commit"), Response::Committed(0));
    assert_eq!(backend.applied().len(), 1);
}

#[test]
fn test_commit_updates_memory_backend() {
    let backend = new_memory_backend();
    let dispatcher = new_dispatcher(backend.clone());
    run(&dispatcher, "set interface em1 inet addr 172.16.0.1/16 fib 2");
    run(
        &dispatcher,
        "set route protocol static inet 10.9.0.0/16 172.16.0.254 fib 2",
    );
    assert_eq!(find_iface(&backend, "em1").ipv4, Vec::new());

    assert_eq!(run(&dispatcher, "commit"), Response::Committed(2));

    let em1 = find_iface(&backend, "em1");
    assert_eq!(em1.ipv4, vec![prefix("172.16.0.1/16")]);
    assert_eq!(em1.fib, 2);
    assert!(show_routes(&backend, 2)
        .iter()
        .any(|r| r.destination == prefix("10.9.0.0/16")));
}

#[test]
fn test_commit_partial_failure_reports_and_drains() {
    let backend = new_memory_backend();
    let dispatcher = new_dispatcher(backend.clone());
    run(&dispatcher, "set interface em9 inet addr 10.9.9.1/24");
    run(&dispatcher, "set interface em1 inet addr 10.8.8.1/24");

    let e = dispatcher.dispatch(&Command::Commit).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::ApplyError);
    assert!(e.msg().contains("1 of 2"));
    assert!(e.msg().contains("em9"));
    assert_eq!(find_iface(&backend, "em1").ipv4, vec![prefix("10.8.8.1/24")]);
    assert!(dispatcher.pending().unwrap().is_empty());
}

#[test]
fn test_commit_stop_on_error_policy() {
    let backend = new_memory_backend();
    let dispatcher = new_dispatcher(backend.clone())
        .with_commit_policy(CommitPolicy::StopOnError);
    run(&dispatcher, "set interface em9 inet addr 10.9.9.1/24");
    run(&dispatcher, "set interface em1 inet addr 10.8.8.1/24");

    assert_eq!(run_err(&dispatcher, "commit"), ErrorKind::ApplyError);
    assert!(find_iface(&backend, "em1").ipv4.is_empty());
    assert!(dispatcher.pending().unwrap().is_empty());
}

#[test]
fn test_staging_capacity() {
    let dispatcher =
        new_dispatcher(new_memory_backend()).with_staging_capacity(1);
    run(&dispatcher, "set interface em0 inet addr 10.0.0.1/24");
    assert_eq!(
        run_err(&dispatcher, "set interface em1 inet addr 10.0.1.1/24"),
        ErrorKind::StagingFull
    );
    assert_eq!(run(&dispatcher, "discard"), Response::Discarded(1));
    assert_eq!(run(&dispatcher, "discard"), Response::Discarded(0));
}

#[test]
fn test_bulk_delete_only_touches_selected_fib() {
    let backend = new_memory_backend();
    let dispatcher = new_dispatcher(backend.clone());

    assert_eq!(
        run(&dispatcher, "delete route protocol static fib 1"),
        Response::Deleted(2)
    );

    let fib1 = show_routes(&backend, 1);
    assert_eq!(fib1.len(), 1);
    assert_eq!(fib1[0].protocol, RouteProtocol::Dynamic);
    assert_eq!(show_routes(&backend, 0).len(), 1);
    assert_eq!(show_routes(&backend, 2).len(), 1);
}

#[test]
fn test_bulk_delete_with_family() {
    let backend = new_memory_backend();
    let dispatcher = new_dispatcher(backend.clone());
    assert_eq!(
        run(&dispatcher, "delete route protocol static fib 1 inet6"),
        Response::Deleted(1)
    );
    assert!(show_routes(&backend, 1)
        .iter()
        .all(|r| r.family() == AddressFamily::Inet4));
}

#[test]
fn test_delete_specific_route() {
    let backend = new_memory_backend();
    let dispatcher = new_dispatcher(backend.clone());
    assert_eq!(
        run(
            &dispatcher,
            "delete route protocol static inet 10.0.0.0/8 192.168.1.254"
        ),
        Response::Deleted(1)
    );
    assert!(show_routes(&backend, 0).is_empty());
    assert_eq!(
        run_err(&dispatcher, "delete route protocol static inet 10.0.0.0/8"),
        ErrorKind::PluginFailure
    );
}

#[test]
fn test_route_destination_host_bits_cleared() {
    let backend = new_memory_backend();
    let dispatcher = new_dispatcher(backend.clone());
    assert_eq!(
        run(
            &dispatcher,
            "delete route protocol static inet 10.0.0.1/8 192.168.1.254"
        ),
        Response::Deleted(1)
    );
    assert!(show_routes(&backend, 0).is_empty());

    run(
        &dispatcher,
        "set route protocol static inet6 2001:db8:1::1/48 fe80::1",
    );
    run(&dispatcher, "commit");
    let routes = show_routes(&backend, 0);
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].destination, prefix("2001:db8:1::/48"));
}

#[test]
fn test_show_route_defaults_to_default_fib() {
    let backend = Arc::new(
        MemoryBackend::new(4)
            .with_default_fib(2)
            .with_route(crate::unit_tests::testlib::new_route(
                "10.3.0.0/16",
                "192.168.1.252",
                2,
                RouteProtocol::Static,
            )),
    );
    let dispatcher = Dispatcher::new(backend.clone(), backend);
    match run(&dispatcher, "show route") {
        Response::Routes { fib, routes } => {
            assert_eq!(fib, 2);
            assert_eq!(routes.len(), 1);
        }
        r => panic!("Unexpected response {r:?}"),
    }
}

#[test]
fn test_show_route_filter_independence() {
    let dispatcher = new_dispatcher(new_memory_backend());
    let a =
        routes_of(run(&dispatcher, "show route fib 1 protocol static inet"));
    let b =
        routes_of(run(&dispatcher, "show route inet protocol static fib 1"));
    assert_eq!(a, b);
    assert_eq!(a.len(), 1);
    assert_eq!(a[0].destination, prefix("10.1.0.0/16"));

    assert_eq!(routes_of(run(&dispatcher, "show route fib 1")).len(), 3);
    assert_eq!(
        routes_of(run(&dispatcher, "show route fib 1 protocol dynamic")).len(),
        1
    );
    assert_eq!(routes_of(run(&dispatcher, "show route")).len(), 1);
}

#[test]
fn test_fib_out_of_range() {
    let dispatcher = new_dispatcher(new_memory_backend());
    let e = dispatcher
        .dispatch(&Grammar::new().parse("show route fib 9").unwrap())
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::SemanticError);
    assert_eq!(e.msg(), "FIB 9 does not exist (only 4 FIBs available)");

    assert_eq!(
        run_err(&dispatcher, "set interface em0 inet addr 10.0.0.1 fib 4"),
        ErrorKind::SemanticError
    );
    assert_eq!(
        run_err(&dispatcher, "delete route protocol static fib 7"),
        ErrorKind::SemanticError
    );
    assert!(dispatcher.pending().unwrap().is_empty());
}

#[test]
fn test_set_route_resolves_default_fib_at_stage() {
    let dispatcher = new_dispatcher(new_memory_backend());
    let response = run(
        &dispatcher,
        "set route protocol static inet 10.5.0.0/16 192.168.1.1",
    );
    if let Response::Staged {
        entry: ConfigEntry::Route(conf),
        ..
    } = response
    {
        assert_eq!(conf.fib, Some(0));
    } else {
        panic!("Unexpected response {response:?}");
    }
}

#[test]
fn test_save() {
    let backend = new_memory_backend();
    let dispatcher = new_dispatcher(backend.clone());
    assert_eq!(run_err(&dispatcher, "save"), ErrorKind::NotSupportedError);

    let store = Arc::new(MemoryStore::default());
    let dispatcher = new_dispatcher(backend).with_persistence(store.clone());
    assert_eq!(
        run(&dispatcher, "save"),
        Response::Saved("memory".to_string())
    );
    let saved = store.saved.lock().unwrap().clone().unwrap();
    assert_eq!(saved.interfaces.len(), 4);
    // Dynamic routes are not configuration
    assert_eq!(saved.routes.len(), 4);
    assert!(saved
        .routes
        .iter()
        .all(|r| r.protocol == RouteProtocol::Static));
}

#[test]
fn test_show_help() {
    let dispatcher = new_dispatcher(new_memory_backend());
    let response = run(&dispatcher, "show");
    assert_eq!(response, Response::Help);
    assert!(response.to_string().contains("ethernet, bridge, gif"));
}

#[test]
fn test_render_route_table() {
    let dispatcher = new_dispatcher(new_memory_backend());
    assert_eq!(
        run(&dispatcher, "show route fib 1 inet").to_string(),
        "FIB 1:\n\
        Destination Gateway       Flags Netif\n\
        10.1.0.0/16 192.168.1.253 UGS   -\n\
        10.2.0.0/16 192.168.1.253 UG    -"
    );
}

#[test]
fn test_render_interface_table() {
    let dispatcher = new_dispatcher(new_memory_backend());
    assert_eq!(
        run(&dispatcher, "show interface em").to_string(),
        "Interface IPv4 Address   IPv6 Address VRF TunnelVRF MTU\n\
        em0       192.168.1.1/24 -            0   -         1500\n\
        em1       -              -            0   -         1500"
    );
}

#[test]
fn test_concurrent_stage_and_commit() {
    const THREADS: usize = 4;
    const ROUTES_PER_THREAD: usize = 20;

    let (backend, bridge) = new_bridge();
    let bridge = Arc::new(bridge);
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let bridge = bridge.clone();
            std::thread::spawn(move || {
                let mut committed = 0;
                for i in 0..ROUTES_PER_THREAD {
                    let line = format!(
                        "set route protocol static fib 3 inet \
                        10.{}.{i}.0/24 192.168.1.1",
                        100 + t
                    );
                    assert!(matches!(
                        bridge.execute_cli(&line).unwrap(),
                        Response::Staged { .. }
                    ));
                    if i % 5 == 4 {
                        match bridge.execute_cli("commit").unwrap() {
                            Response::Committed(n) => committed += n,
                            r => panic!("Unexpected response {r:?}"),
                        }
                    }
                }
                committed
            })
        })
        .collect();
    let committed: usize =
        handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(committed, THREADS * ROUTES_PER_THREAD);
    assert!(bridge.dispatcher().pending().unwrap().is_empty());
    let routes = show_routes(&backend, 3);
    assert_eq!(routes.len(), THREADS * ROUTES_PER_THREAD);
    let destinations: std::collections::BTreeSet<_> =
        routes.iter().map(|r| r.destination).collect();
    assert_eq!(destinations.len(), THREADS * ROUTES_PER_THREAD);
}
