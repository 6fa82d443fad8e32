// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use log::debug;

use crate::{
    nispor::{
        ip::{np_ipv4_to_netd, np_ipv6_to_netd},
        np_error_to_netd, table_to_fib,
    },
    InterfaceInfo, InterfaceType, NetdError,
};

pub(crate) fn retrieve() -> Result<nispor::NetState, NetdError> {
    nispor::NetState::retrieve().map_err(np_error_to_netd)
}

fn np_iface_type_to_netd(np_iface: &nispor::Iface) -> InterfaceType {
    match np_iface.iface_type {
        nispor::IfaceType::Ethernet | nispor::IfaceType::Veth => {
            InterfaceType::Ethernet
        }
        nispor::IfaceType::Bridge => InterfaceType::Bridge,
        nispor::IfaceType::Loopback => InterfaceType::Loopback,
        nispor::IfaceType::Vlan => InterfaceType::Vlan,
        nispor::IfaceType::Tun => InterfaceType::Tun,
        // Kernel reports gre/sit/ipip tunnels and tap devices without a
        // dedicated type, fall back to the driver naming convention.
        _ => InterfaceType::from_name(&np_iface.name),
    }
}

pub(crate) fn np_iface_to_netd(
    np_iface: &nispor::Iface,
    np_ifaces: &HashMap<String, nispor::Iface>,
) -> InterfaceInfo {
    let mut iface = InterfaceInfo::new(&np_iface.name);
    iface.iface_type = np_iface_type_to_netd(np_iface);
    iface.ipv4 = np_ipv4_to_netd(np_iface);
    iface.ipv6 = np_ipv6_to_netd(np_iface);
    iface.mtu = u32::try_from(np_iface.mtu).ok();
    iface.fib = np_iface
        .controller
        .as_ref()
        .and_then(|ctrl| np_ifaces.get(ctrl))
        .and_then(|ctrl| ctrl.vrf.as_ref())
        .and_then(|vrf| table_to_fib(vrf.table_id))
        .unwrap_or_default();
    debug!("Got interface {:?}", iface);
    iface
}
